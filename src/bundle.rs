// bundle-sync is a tool for comparing and synchronizing settings trees
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

//! Bundle exports and the categorized tree they are compared as.
//!
//! An export is what a server dump of one bundle looks like on disk: the
//! bundle record itself plus the studio settings, and optionally project
//! settings and anatomy. Comparing two exports directly would bury addon
//! version changes inside unrelated bundle fields, so each export is first
//! reshaped into one tree with a fixed set of top-level categories.

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::files::read_json;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

pub const METADATA: &str = "metadata";
pub const ADDONS: &str = "addons";
pub const DEPENDENCIES: &str = "dependencies";
pub const SETTINGS: &str = "settings";
pub const PROJECT_SETTINGS: &str = "project_settings";
pub const ANATOMY: &str = "anatomy";

/// Categories whose direct children are keyed by addon name.
pub const ADDON_SCOPED_CATEGORIES: [&str; 3] = [ADDONS, SETTINGS, PROJECT_SETTINGS];

/// Bundle record fields copied into the `metadata` category, in order.
const METADATA_FIELDS: [&str; 7] = [
    "name",
    "installerVersion",
    "isProduction",
    "isStaging",
    "isDev",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    pub name: String,
    #[serde(default)]
    pub installer_version: Option<Value>,
    #[serde(default)]
    pub is_production: Option<bool>,
    #[serde(default)]
    pub is_staging: Option<bool>,
    #[serde(default)]
    pub is_dev: Option<bool>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub addons: Option<Map<String, Value>>,
    #[serde(default)]
    pub dependency_packages: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleExport {
    pub bundle: BundleInfo,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub project_settings: Option<Value>,
    #[serde(default)]
    pub anatomy: Option<Value>,
}

impl BundleExport {
    pub fn from_value(value: &Value) -> Result<BundleExport, Diagnostic> {
        let bundle = match value.get("bundle") {
            Some(Value::Object(bundle)) => bundle,
            _ => {
                return Err(missing_field("bundle", "the top level").with_advice(
                    "A bundle export is an object with a 'bundle' record next to \
                     'settings', 'project_settings' and 'anatomy'.\n\
                     Leave out --bundle to compare plain settings files."
                        .to_string(),
                ))
            }
        };

        if !bundle.get("name").map_or(false, Value::is_string) {
            return Err(missing_field("name", "the bundle record"));
        }

        serde_json::from_value(value.clone()).map_err(|e| {
            Diagnostic::fatal(
                DiagnosticCode::MissingBundleField,
                format!("I couldn't read the bundle export: {}", e),
            )
        })
    }

    pub fn name(&self) -> &str {
        &self.bundle.name
    }

    /// Only development bundles accept addon version changes.
    pub fn is_dev(&self) -> bool {
        self.bundle.is_dev.unwrap_or(false)
    }

    pub fn has_addon(&self, name: &str) -> bool {
        self.bundle
            .addons
            .as_ref()
            .map_or(false, |addons| addons.contains_key(name))
    }

    /// Reshapes the export into the categorized tree used for comparison.
    pub fn to_settings_tree(&self) -> Value {
        let info = &self.bundle;
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(info.name.clone()));
        metadata.insert(
            "installerVersion".to_string(),
            info.installer_version.clone().unwrap_or(Value::Null),
        );
        metadata.insert(
            "isProduction".to_string(),
            Value::Bool(info.is_production.unwrap_or(false)),
        );
        metadata.insert(
            "isStaging".to_string(),
            Value::Bool(info.is_staging.unwrap_or(false)),
        );
        metadata.insert("isDev".to_string(), Value::Bool(self.is_dev()));
        metadata.insert(
            "createdAt".to_string(),
            info.created_at.clone().unwrap_or(Value::Null),
        );
        metadata.insert(
            "updatedAt".to_string(),
            info.updated_at.clone().unwrap_or(Value::Null),
        );

        let mut tree = Map::new();
        tree.insert(METADATA.to_string(), Value::Object(metadata));
        tree.insert(
            ADDONS.to_string(),
            Value::Object(info.addons.clone().unwrap_or_default()),
        );
        tree.insert(
            DEPENDENCIES.to_string(),
            Value::Object(info.dependency_packages.clone().unwrap_or_default()),
        );
        tree.insert(
            SETTINGS.to_string(),
            self.settings
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        if let Some(project_settings) = &self.project_settings {
            tree.insert(PROJECT_SETTINGS.to_string(), project_settings.clone());
        }
        if let Some(anatomy) = &self.anatomy {
            tree.insert(ANATOMY.to_string(), anatomy.clone());
        }

        Value::Object(tree)
    }

    /// The categorized tree with the export's project settings standing in
    /// for its studio settings.
    pub fn to_project_bundle_tree(&self) -> Result<Value, Diagnostic> {
        let Some(project_settings) = &self.project_settings else {
            return Err(missing_field(PROJECT_SETTINGS, "the source export").with_advice(
                "The project-bundle operation copies project settings into a bundle.\n\
                 Export the source together with the project's settings."
                    .to_string(),
            ));
        };

        let mut tree = self.to_settings_tree();
        if let Some(categories) = tree.as_object_mut() {
            categories.insert(SETTINGS.to_string(), project_settings.clone());
            categories.remove(PROJECT_SETTINGS);
        }
        Ok(tree)
    }
}

/// Depth limit on the categorized tree that gives each export section
/// `max_depth` levels of its own. The category key adds one level.
pub fn category_depth(max_depth: usize) -> usize {
    if max_depth == 0 {
        0
    } else {
        max_depth + 1
    }
}

/// A settings file as read from disk, plus the tree it is compared as.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    /// Bundle name, or the file stem for plain settings files.
    pub name: String,
    pub raw: Value,
    pub bundle: Option<BundleExport>,
    pub tree: Value,
}

impl SettingsFile {
    pub fn load(path: &Path, as_bundle: bool) -> Result<SettingsFile, Vec<Diagnostic>> {
        let raw = read_json(path)?;

        if !as_bundle {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            return Ok(SettingsFile {
                name,
                tree: raw.clone(),
                raw,
                bundle: None,
            });
        }

        let bundle = BundleExport::from_value(&raw)
            .map_err(|d| vec![d.with_file(path.display().to_string())])?;
        Ok(SettingsFile {
            name: bundle.name().to_string(),
            tree: bundle.to_settings_tree(),
            raw,
            bundle: Some(bundle),
        })
    }
}

/// Writes a categorized tree back into the shape of the export it came from.
///
/// Fields of `export` that the tree has no category for are kept as they are.
/// A metadata field that is `null` in the tree and missing from the export
/// stays missing.
pub fn merge_settings_tree(export: &Value, tree: &Value) -> Value {
    let mut result = export.as_object().cloned().unwrap_or_default();
    let Some(categories) = tree.as_object() else {
        return Value::Object(result);
    };

    let mut bundle = result
        .get("bundle")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if let Some(Value::Object(metadata)) = categories.get(METADATA) {
        for field in METADATA_FIELDS {
            match metadata.get(field) {
                Some(Value::Null) if !bundle.contains_key(field) => {}
                Some(value) => {
                    bundle.insert(field.to_string(), value.clone());
                }
                None => {
                    bundle.remove(field);
                }
            }
        }
    }

    for (category, field) in [(ADDONS, "addons"), (DEPENDENCIES, "dependencyPackages")] {
        match categories.get(category) {
            Some(value) => {
                bundle.insert(field.to_string(), value.clone());
            }
            None => {
                bundle.remove(field);
            }
        }
    }
    result.insert("bundle".to_string(), Value::Object(bundle));

    for category in [SETTINGS, PROJECT_SETTINGS, ANATOMY] {
        match categories.get(category) {
            Some(value) => {
                result.insert(category.to_string(), value.clone());
            }
            None => {
                result.remove(category);
            }
        }
    }

    Value::Object(result)
}

fn missing_field(field: &str, location: &str) -> Diagnostic {
    Diagnostic::fatal(
        DiagnosticCode::MissingBundleField,
        format!("I couldn't find the required field '{}' in {}.", field, location),
    )
}
