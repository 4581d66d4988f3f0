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

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::classify::Status;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::diff::{diff, ChangeRecord, ChangeSummary};
use crate::pointer::JsonPointer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Copy only positions where source and target differ.
    #[default]
    DiffOnly,
    /// Copy every eligible position.
    All,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::DiffOnly => "diff-only",
            SyncMode::All => "all",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diff-only" | "diff_only" => Ok(SyncMode::DiffOnly),
            "all" => Ok(SyncMode::All),
            other => Err(Diagnostic::fatal(
                DiagnosticCode::InvalidSyncMode,
                format!("I don't know the sync mode '{}'.", other),
            )
            .with_advice(
                "Use --mode diff-only to copy only differing values, or --mode all \
                 to mirror every value in scope."
                    .to_string(),
            )),
        }
    }
}

/// Restricts which positions a sync may touch.
///
/// `categories` limits the top-level keys. `addon_names` limits the entries
/// directly below the addon-scoped categories, which are `addons` unless
/// configured otherwise, and leaves every other category untouched. `None`
/// means no restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFilter {
    categories: Option<BTreeSet<String>>,
    addon_names: Option<BTreeSet<String>>,
    addon_scoped: BTreeSet<String>,
}

impl Default for SyncFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncFilter {
    pub fn new() -> Self {
        Self {
            categories: None,
            addon_names: None,
            addon_scoped: BTreeSet::from(["addons".to_string()]),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_addon_names<I, S>(mut self, addon_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addon_names = Some(addon_names.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the set of categories whose direct children are addon names.
    pub fn with_addon_scoped_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addon_scoped = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_addon_scoped(&self, category: &str) -> bool {
        self.addon_scoped.contains(category)
    }

    /// Whether anything at or below `path` may be touched.
    pub fn covers(&self, path: &JsonPointer) -> bool {
        let tokens = path.tokens();

        if let (Some(categories), Some(category)) = (&self.categories, tokens.first()) {
            if !categories.contains(category) {
                return false;
            }
        }

        if let (Some(names), Some(category)) = (&self.addon_names, tokens.first()) {
            if !self.is_addon_scoped(category) {
                return false;
            }
            if let Some(name) = tokens.get(1) {
                if !names.contains(name) {
                    return false;
                }
            }
        }

        true
    }

    /// Whether the value at `path` may be replaced as a whole.
    ///
    /// Stricter than `covers`: a position above the filtered scope, such as the
    /// root when categories are given, may be walked but never overwritten.
    pub fn allows_leaf(&self, path: &JsonPointer) -> bool {
        if !self.covers(path) {
            return false;
        }

        let tokens = path.tokens();
        if (self.categories.is_some() || self.addon_names.is_some()) && tokens.is_empty() {
            return false;
        }
        if self.addon_names.is_some() && tokens.len() == 1 && self.is_addon_scoped(&tokens[0]) {
            return false;
        }

        true
    }
}

/// One position a sync would write, seen from the target.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry<'a> {
    pub path: JsonPointer,
    /// `added` means the source introduces the key, `removed` means the
    /// source lacks a key the target has.
    pub status: Status,
    pub current: Option<&'a Value>,
    pub incoming: Option<&'a Value>,
}

/// Entries serialize as compact arrays:
///
/// - `["added", path, incoming]`
/// - `["removed", path, current]`
/// - `["changed", path, current, incoming]`
/// - `["unchanged", path, current]`
impl Serialize for PlanEntry<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match (self.status, self.current, self.incoming) {
            (Status::Changed, Some(current), Some(incoming)) => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(self.status.as_str())?;
                seq.serialize_element(&self.path)?;
                seq.serialize_element(current)?;
                seq.serialize_element(incoming)?;
                seq.end()
            }
            (Status::Added, _, Some(value))
            | (Status::Removed | Status::Unchanged, Some(value), _) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(self.status.as_str())?;
                seq.serialize_element(&self.path)?;
                seq.serialize_element(value)?;
                seq.end()
            }
            _ => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.status.as_str())?;
                seq.serialize_element(&self.path)?;
                seq.end()
            }
        }
    }
}

/// The positions a sync from source to target would write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPlan<'a> {
    pub mode: SyncMode,
    pub entries: Vec<PlanEntry<'a>>,
}

impl<'a> SyncPlan<'a> {
    /// Plans a sync of `source` into `target`.
    pub fn build(
        source: &'a Value,
        target: &'a Value,
        mode: SyncMode,
        filter: &SyncFilter,
    ) -> SyncPlan<'a> {
        let record = diff(target, source, 0);
        Self::from_record(&record, mode, filter)
    }

    /// Filters an existing target-versus-source change record.
    fn from_record(record: &ChangeRecord<'a>, mode: SyncMode, filter: &SyncFilter) -> Self {
        let entries = record
            .leaves()
            .into_iter()
            .filter(|leaf| filter.allows_leaf(&leaf.path))
            .filter(|leaf| mode == SyncMode::All || leaf.status.is_difference())
            .map(|leaf| PlanEntry {
                path: leaf.path.clone(),
                status: leaf.status,
                current: leaf.value_a,
                incoming: leaf.value_b,
            })
            .collect();

        SyncPlan { mode, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries that actually modify the target.
    pub fn change_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status.is_difference())
            .count()
    }

    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.status.is_difference())
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for entry in &self.entries {
            match entry.status {
                Status::Added => summary.added += 1,
                Status::Removed => summary.removed += 1,
                Status::Changed => summary.changed += 1,
                Status::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Entries grouped by top-level category, in first-seen order.
    pub fn by_category(&self) -> Vec<(&str, Vec<&PlanEntry<'a>>)> {
        let mut groups: Vec<(&str, Vec<&PlanEntry<'a>>)> = Vec::new();
        for entry in &self.entries {
            let category = entry.path.category().unwrap_or("");
            match groups.iter_mut().find(|(name, _)| *name == category) {
                Some((_, group)) => group.push(entry),
                None => groups.push((category, vec![entry])),
            }
        }
        groups
    }

    /// Whether any entry touches the given category.
    pub fn touches(&self, category: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.status.is_difference() && e.path.category() == Some(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario() -> (Value, Value) {
        (
            json!({"fps": 24, "maya": {"renderer": "arnold"}}),
            json!({"fps": 25, "maya": {"renderer": "arnold"}, "nuke": "2.0"}),
        )
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("diff-only".parse::<SyncMode>().unwrap(), SyncMode::DiffOnly);
        assert_eq!("all".parse::<SyncMode>().unwrap(), SyncMode::All);
        let err = "sometimes".parse::<SyncMode>().unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidSyncMode);
        assert_eq!(SyncMode::default().to_string(), "diff-only");
    }

    #[test]
    fn test_diff_only_plan_excludes_unchanged() {
        let (target, source) = scenario();
        let plan = SyncPlan::build(&source, &target, SyncMode::DiffOnly, &SyncFilter::new());

        let paths: Vec<String> = plan.entries.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["/fps", "/nuke"]);
        assert_eq!(plan.entries[1].status, Status::Added);
        assert_eq!(plan.change_count(), 2);
    }

    #[test]
    fn test_all_plan_includes_every_leaf() {
        let (target, source) = scenario();
        let plan = SyncPlan::build(&source, &target, SyncMode::All, &SyncFilter::new());

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.change_count(), 2);
        assert_eq!(plan.summary().unchanged, 1);
    }

    #[test]
    fn test_category_filter() {
        let (target, source) = scenario();
        let filter = SyncFilter::new().with_categories(["maya"]);
        let plan = SyncPlan::build(&source, &target, SyncMode::DiffOnly, &filter);
        assert!(plan.is_empty());
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_addon_filter_scopes_addons_only() {
        let target = json!({
            "addons": {"maya": "1.0.0", "nuke": "1.0.0"},
            "settings": {"maya": {"fps": 24}}
        });
        let source = json!({
            "addons": {"maya": "1.1.0", "nuke": "1.2.0", "houdini": "0.9.0"},
            "settings": {"maya": {"fps": 25}}
        });
        let filter = SyncFilter::new().with_addon_names(["maya"]);
        let plan = SyncPlan::build(&source, &target, SyncMode::DiffOnly, &filter);

        let paths: Vec<String> = plan.entries.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["/addons/maya"]);

        let scoped = filter.with_addon_scoped_categories(["addons", "settings"]);
        let plan = SyncPlan::build(&source, &target, SyncMode::DiffOnly, &scoped);
        let paths: Vec<String> = plan.entries.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["/addons/maya", "/settings/maya/fps"]);
        assert!(!scoped.covers(&JsonPointer::new("/settings/nuke").unwrap()));
    }

    #[test]
    fn test_filter_scope_rules() {
        let filter = SyncFilter::new()
            .with_categories(["addons", "settings"])
            .with_addon_names(["maya"]);

        assert!(filter.covers(&JsonPointer::root()));
        assert!(!filter.allows_leaf(&JsonPointer::root()));
        assert!(filter.covers(&JsonPointer::new("/addons").unwrap()));
        assert!(!filter.allows_leaf(&JsonPointer::new("/addons").unwrap()));
        assert!(filter.allows_leaf(&JsonPointer::new("/addons/maya").unwrap()));
        assert!(!filter.covers(&JsonPointer::new("/addons/nuke").unwrap()));
        assert!(!filter.covers(&JsonPointer::new("/anatomy/roots").unwrap()));
        // An addon filter keeps non-addon categories out of reach.
        assert!(!filter.covers(&JsonPointer::new("/settings").unwrap()));

        let addons_only = SyncFilter::new().with_addon_names(["maya"]);
        assert!(!addons_only.allows_leaf(&JsonPointer::root()));
        assert!(!addons_only.covers(&JsonPointer::new("/anatomy").unwrap()));
        assert!(addons_only.covers(&JsonPointer::new("/addons").unwrap()));
    }

    #[test]
    fn test_by_category_keeps_first_seen_order() {
        let target = json!({"settings": {"a": 1, "b": 1}, "addons": {"maya": "1"}});
        let source = json!({"settings": {"a": 2, "b": 2}, "addons": {"maya": "2"}});
        let plan = SyncPlan::build(&source, &target, SyncMode::DiffOnly, &SyncFilter::new());

        let groups = plan.by_category();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "settings");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "addons");
        assert!(plan.touches("addons"));
        assert!(!plan.touches("anatomy"));
    }

    #[test]
    fn test_entries_serialize_as_arrays() -> Result<(), Box<dyn std::error::Error>> {
        let target = json!({"fps": 24, "old": true, "same": 1});
        let source = json!({"fps": 25, "new": "x", "same": 1});
        let plan = SyncPlan::build(&source, &target, SyncMode::All, &SyncFilter::new());

        let serialized = serde_json::to_value(&plan)?;
        assert_eq!(
            serialized,
            json!({
                "mode": "all",
                "entries": [
                    ["changed", "/fps", 24, 25],
                    ["removed", "/old", true],
                    ["unchanged", "/same", 1],
                    ["added", "/new", "x"]
                ]
            })
        );
        Ok(())
    }
}
