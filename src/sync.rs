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


//! Synchronizing one settings file into another on disk.
//!
//! [`sync_files`] runs the whole sequence: load both sides, plan, check the
//! dev-bundle guard, back up the target, apply, then write atomically. Every
//! step that can fail stops the sync before the target is touched.

use crate::apply::apply;
use crate::backup::{default_backup_dir, write_backup, Backup};
use crate::bundle::{
    merge_settings_tree, SettingsFile, ADDONS, ADDON_SCOPED_CATEGORIES, ANATOMY, SETTINGS,
};
use crate::classify::Status;
use crate::compression::Compression;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector, DiagnosticLevel};
use crate::diff::preview;
use crate::files::write_json_atomic;
use crate::plan::{SyncFilter, SyncMode, SyncPlan};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What is being synced into the target bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Operation {
    /// Bundle to bundle, category by category.
    #[default]
    Bundle,
    /// The source's project settings replace the target's studio settings.
    ProjectBundle,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Bundle => "bundle",
            Operation::ProjectBundle => "project-bundle",
        }
    }
}

impl FromStr for Operation {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bundle" => Ok(Operation::Bundle),
            "project-bundle" | "project_bundle" => Ok(Operation::ProjectBundle),
            other => Err(Diagnostic::fatal(
                DiagnosticCode::InvalidOperation,
                format!("I don't know the sync operation '{}'.", other),
            )
            .with_advice("Use --operation bundle or --operation project-bundle.".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub operation: Operation,
    /// Top-level categories to sync. Empty means the default scope.
    pub categories: Vec<String>,
    pub addons: Vec<String>,
    /// Read both files as bundle exports.
    pub bundle: bool,
    pub project: Option<String>,
    pub dry_run: bool,
    /// Where to write the synced file. Defaults to the target itself.
    pub output: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub compression: Compression,
}

impl SyncOptions {
    fn reads_bundles(&self) -> bool {
        self.bundle || self.operation == Operation::ProjectBundle
    }
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub backup: Option<PathBuf>,
    pub written: Option<PathBuf>,
    pub applied: usize,
}

impl SyncOutcome {
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_fatal())
    }
}

pub fn sync_files(source: &Path, target: &Path, options: &SyncOptions) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();
    let mut diagnostics = DiagnosticCollector::new();
    run_sync(source, target, options, &mut outcome, &mut diagnostics);
    outcome.diagnostics = diagnostics.into_diagnostics();
    outcome
}

fn run_sync(
    source_path: &Path,
    target_path: &Path,
    options: &SyncOptions,
    outcome: &mut SyncOutcome,
    diagnostics: &mut DiagnosticCollector,
) {
    let mut source = match SettingsFile::load(source_path, options.reads_bundles()) {
        Ok(loaded) => loaded,
        Err(errors) => return diagnostics.extend(errors),
    };
    let target = match SettingsFile::load(target_path, options.reads_bundles()) {
        Ok(loaded) => loaded,
        Err(errors) => return diagnostics.extend(errors),
    };

    if options.operation == Operation::ProjectBundle {
        if let Some(bundle) = &source.bundle {
            match bundle.to_project_bundle_tree() {
                Ok(tree) => source.tree = tree,
                Err(diagnostic) => {
                    return diagnostics.add(diagnostic.with_file(source_path.display().to_string()))
                }
            }
        }
    }

    let filter = build_filter(options);
    diagnostics.extend(missing_addon_warnings(&options.addons, &filter, &source));

    let plan = SyncPlan::build(&source.tree, &target.tree, options.mode, &filter);

    println!(
        "Syncing {} -> {} ({}, mode: {})",
        source.name,
        target.name,
        options.operation.as_str(),
        options.mode
    );
    print_plan(&plan);

    if !plan.has_changes() {
        return diagnostics.add(Diagnostic::new(
            DiagnosticLevel::Info,
            DiagnosticCode::NothingToSync,
            format!("{} already matches {} in the selected scope.", target.name, source.name),
        ));
    }

    if let Some(bundle) = &target.bundle {
        if plan.touches(ADDONS) && !bundle.is_dev() {
            let level = if options.dry_run {
                DiagnosticLevel::Warning
            } else {
                DiagnosticLevel::Fatal
            };
            diagnostics.add(
                Diagnostic::new(
                    level,
                    DiagnosticCode::TargetNotDevBundle,
                    format!(
                        "The plan changes addon versions, but '{}' is not a dev bundle.",
                        bundle.name()
                    ),
                )
                .with_advice(
                    "Only dev bundles accept addon version changes. Sync into a dev bundle,\n\
                     or leave addons out with --category settings --category project_settings."
                        .to_string(),
                ),
            );
        }
    }
    if diagnostics.has_fatal() {
        return;
    }

    if options.dry_run {
        println!("Dry run: would apply {} change(s)", plan.change_count());
        return;
    }

    let Some(backup_dir) = options.backup_dir.clone().or_else(default_backup_dir) else {
        return diagnostics.add(
            Diagnostic::fatal(
                DiagnosticCode::BackupFailed,
                "I couldn't work out where to put the backup because HOME is not set.".to_string(),
            )
            .with_advice("Pass a directory with --backup-dir.".to_string()),
        );
    };

    let kind = backup_kind(options, &target);
    let mut backup = Backup::new(kind, &source.name, &target.name, target.raw.clone());
    if let Some(project) = &options.project {
        backup = backup.with_project(project);
    }
    match write_backup(&backup_dir, &backup, options.compression) {
        Ok(path) => {
            println!("Backup written to {}", path.display());
            outcome.backup = Some(path);
        }
        Err(errors) => return diagnostics.extend(errors),
    }

    let (synced, count) = apply(&source.tree, &target.tree, options.mode, &filter);
    let output: Value = match &target.bundle {
        Some(_) => merge_settings_tree(&target.raw, &synced),
        None => synced,
    };

    let output_path = options.output.as_deref().unwrap_or(target_path);
    if let Err(errors) = write_json_atomic(output_path, &output) {
        return diagnostics.extend(errors);
    }

    println!("Applied {} change(s) to {}", count, output_path.display());
    outcome.applied = count;
    outcome.written = Some(output_path.to_path_buf());
}

/// Scope of a sync.
///
/// Bundle syncs default to the addon-keyed categories. `metadata`,
/// `dependencies` and `anatomy` are only synced when named. The
/// project-bundle operation always syncs `settings` alone.
fn build_filter(options: &SyncOptions) -> SyncFilter {
    let mut filter = SyncFilter::new();

    if options.operation == Operation::ProjectBundle {
        filter = filter.with_categories([SETTINGS]);
    } else if !options.categories.is_empty() {
        filter = filter.with_categories(options.categories.iter().cloned());
    } else if options.bundle {
        filter = filter.with_categories(ADDON_SCOPED_CATEGORIES);
    }

    if !options.addons.is_empty() {
        filter = filter.with_addon_names(options.addons.iter().cloned());
    }
    if options.reads_bundles() {
        filter = filter.with_addon_scoped_categories(ADDON_SCOPED_CATEGORIES);
    }

    filter
}

/// `kind` recorded in the backup and its file name.
fn backup_kind(options: &SyncOptions, target: &SettingsFile) -> &'static str {
    let anatomy_only =
        !options.categories.is_empty() && options.categories.iter().all(|c| c == ANATOMY);

    if options.operation == Operation::ProjectBundle {
        "bundle_from_project"
    } else if anatomy_only {
        "anatomy"
    } else if options.project.is_some() {
        "project"
    } else if target.bundle.is_some() {
        "bundle"
    } else {
        "settings"
    }
}

fn missing_addon_warnings(
    addons: &[String],
    filter: &SyncFilter,
    source: &SettingsFile,
) -> Vec<Diagnostic> {
    let in_source = |name: &str| match &source.bundle {
        Some(bundle) => bundle.has_addon(name),
        None => source.tree.as_object().map_or(false, |categories| {
            categories.iter().any(|(category, value)| {
                filter.is_addon_scoped(category) && value.get(name).is_some()
            })
        }),
    };

    addons
        .iter()
        .filter(|name| !in_source(name.as_str()))
        .map(|name| {
            Diagnostic::new(
                DiagnosticLevel::Warning,
                DiagnosticCode::AddonNotInSource,
                format!(
                    "{} has no addon named '{}', so nothing is synced for it.",
                    source.name, name
                ),
            )
        })
        .collect()
}

fn print_plan(plan: &SyncPlan<'_>) {
    for (category, entries) in plan.by_category() {
        let changes = entries.iter().filter(|e| e.status.is_difference()).count();
        let label = if category.is_empty() { "(root)" } else { category };
        println!("{}: {} change(s)", label, changes);

        for entry in entries {
            let detail = match entry.status {
                Status::Added => preview(entry.incoming),
                Status::Removed | Status::Unchanged => preview(entry.current),
                Status::Changed => {
                    format!("{} -> {}", preview(entry.current), preview(entry.incoming))
                }
            };
            let path = if entry.path.is_root() {
                "(root)".to_string()
            } else {
                entry.path.to_string()
            };
            println!("  {} {}: {}", entry.status.marker(), path, detail);
        }
    }
}
