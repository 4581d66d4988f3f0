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

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::classify::{classify, Status};
use crate::pointer::JsonPointer;

/// One node of a diff between tree A and tree B.
///
/// Values are borrowed from the compared trees, so a record never outlives
/// the comparison inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord<'a> {
    pub path: JsonPointer,
    pub status: Status,
    pub value_a: Option<&'a Value>,
    pub value_b: Option<&'a Value>,
    pub children: Vec<ChangeRecord<'a>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl ChangeSummary {
    pub fn differences(&self) -> usize {
        self.added + self.removed + self.changed
    }

    fn count(&mut self, status: Status) {
        match status {
            Status::Added => self.added += 1,
            Status::Removed => self.removed += 1,
            Status::Changed => self.changed += 1,
            Status::Unchanged => self.unchanged += 1,
        }
    }
}

impl<'a> ChangeRecord<'a> {
    pub fn key(&self) -> Option<&str> {
        self.path.last()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaf records in depth-first order.
    pub fn leaves(&self) -> Vec<&ChangeRecord<'a>> {
        let mut result = Vec::new();
        collect_leaves(self, &mut result);
        result
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for leaf in self.leaves() {
            summary.count(leaf.status);
        }
        summary
    }

    pub fn find(&self, path: &JsonPointer) -> Option<&ChangeRecord<'a>> {
        let mut current = self;
        for token in path.tokens() {
            current = current
                .children
                .iter()
                .find(|child| child.key() == Some(token.as_str()))?;
        }
        Some(current)
    }

    /// Copy of this record with every `unchanged` branch pruned.
    ///
    /// Returns `None` when nothing differs.
    pub fn only_differences(&self) -> Option<ChangeRecord<'a>> {
        if !self.status.is_difference() {
            return None;
        }

        Some(ChangeRecord {
            path: self.path.clone(),
            status: self.status,
            value_a: self.value_a,
            value_b: self.value_b,
            children: self
                .children
                .iter()
                .filter_map(ChangeRecord::only_differences)
                .collect(),
        })
    }
}

fn collect_leaves<'r, 'a>(record: &'r ChangeRecord<'a>, result: &mut Vec<&'r ChangeRecord<'a>>) {
    if record.is_leaf() {
        result.push(record);
        return;
    }
    for child in &record.children {
        collect_leaves(child, result);
    }
}

// Values are only written on leaves. A mapping node's values are exactly the
// union of its children, and repeating them at every level makes reports for
// large bundles grow with the square of their depth.
impl Serialize for ChangeRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let leaf = self.is_leaf();
        let mut len = 2;
        if leaf && self.value_a.is_some() {
            len += 1;
        }
        if leaf && self.value_b.is_some() {
            len += 1;
        }
        if !leaf {
            len += 1;
        }

        let mut state = serializer.serialize_struct("ChangeRecord", len)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("status", &self.status)?;
        if leaf {
            if let Some(value_a) = self.value_a {
                state.serialize_field("value_a", value_a)?;
            }
            if let Some(value_b) = self.value_b {
                state.serialize_field("value_b", value_b)?;
            }
        } else {
            state.serialize_field("children", &self.children)?;
        }
        state.end()
    }
}

/// Computes the change record tree for `tree_a` versus `tree_b`.
///
/// Top-level keys sit at depth 0. With `max_depth = N`, nodes at depth `N`
/// are not expanded and any difference below them collapses into a single
/// leaf. `max_depth = 0` means unlimited.
pub fn diff<'a>(tree_a: &'a Value, tree_b: &'a Value, max_depth: usize) -> ChangeRecord<'a> {
    diff_node(JsonPointer::root(), Some(tree_a), Some(tree_b), None, max_depth)
}

fn diff_node<'a>(
    path: JsonPointer,
    value_a: Option<&'a Value>,
    value_b: Option<&'a Value>,
    depth: Option<usize>,
    max_depth: usize,
) -> ChangeRecord<'a> {
    let within_budget = match depth {
        None => true,
        Some(d) => max_depth == 0 || d < max_depth,
    };

    if !within_budget || !is_mapping_position(value_a, value_b) {
        return ChangeRecord {
            path,
            status: classify(value_a, value_b),
            value_a,
            value_b,
            children: Vec::new(),
        };
    }

    let map_a = value_a.and_then(Value::as_object);
    let map_b = value_b.and_then(Value::as_object);
    let child_depth = depth.map_or(0, |d| d + 1);

    let children: Vec<ChangeRecord<'a>> = union_keys(map_a, map_b)
        .into_iter()
        .map(|key| {
            diff_node(
                path.child(key),
                map_a.and_then(|m| m.get(key)),
                map_b.and_then(|m| m.get(key)),
                Some(child_depth),
                max_depth,
            )
        })
        .collect();

    let status = match (value_a, value_b) {
        (None, _) => Status::Added,
        (_, None) => Status::Removed,
        _ if children.iter().all(|c| c.status == Status::Unchanged) => Status::Unchanged,
        _ => Status::Changed,
    };

    ChangeRecord {
        path,
        status,
        value_a,
        value_b,
        children,
    }
}

/// A position is walked as a mapping when one side is a mapping and the other
/// is a mapping too or absent. Absent stands in for `{}` so that a subtree
/// present on one side only still gets per-field records.
pub(crate) fn is_mapping_position(value_a: Option<&Value>, value_b: Option<&Value>) -> bool {
    matches!(
        (value_a, value_b),
        (Some(Value::Object(_)), Some(Value::Object(_)))
            | (Some(Value::Object(_)), None)
            | (None, Some(Value::Object(_)))
    )
}

/// Keys of `a` in order, then keys only found in `b` in their order.
pub(crate) fn union_keys<'a>(
    a: Option<&'a Map<String, Value>>,
    b: Option<&'a Map<String, Value>>,
) -> Vec<&'a str> {
    let mut keys: Vec<&'a str> = a
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();

    if let Some(b) = b {
        for key in b.keys() {
            if !a.is_some_and(|m| m.contains_key(key)) {
                keys.push(key);
            }
        }
    }

    keys
}

/// Compact single-line rendering of a value for listings.
pub fn preview(value: Option<&Value>) -> String {
    const LIMIT: usize = 60;
    let Some(value) = value else {
        return "(missing)".to_string();
    };
    let text = value.to_string();
    if text.chars().count() > LIMIT {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child_keys<'r>(record: &'r ChangeRecord<'_>) -> Vec<&'r str> {
        record.children.iter().filter_map(|c| c.key()).collect()
    }

    #[test]
    fn test_fps_changed_maya_unchanged_nuke_added() {
        let a = json!({"fps": 24, "maya": {"renderer": "arnold"}});
        let b = json!({"fps": 25, "maya": {"renderer": "arnold"}, "nuke": "2.0"});
        let result = diff(&a, &b, 0);

        assert_eq!(result.status, Status::Changed);
        assert_eq!(child_keys(&result), vec!["fps", "maya", "nuke"]);

        let fps = &result.children[0];
        assert_eq!(fps.status, Status::Changed);
        assert_eq!(fps.value_a, Some(&json!(24)));
        assert_eq!(fps.value_b, Some(&json!(25)));

        let maya = &result.children[1];
        assert_eq!(maya.status, Status::Unchanged);
        assert_eq!(maya.children.len(), 1);
        assert_eq!(maya.children[0].key(), Some("renderer"));
        assert_eq!(maya.children[0].status, Status::Unchanged);

        let nuke = &result.children[2];
        assert_eq!(nuke.status, Status::Added);
        assert_eq!(nuke.value_a, None);
        assert_eq!(nuke.value_b, Some(&json!("2.0")));
    }

    #[test]
    fn test_mapping_versus_scalar_is_changed_leaf() {
        let a = json!({"x": {"a": 1}});
        let b = json!({"x": 5});
        let result = diff(&a, &b, 0);

        let x = &result.children[0];
        assert_eq!(x.status, Status::Changed);
        assert!(x.children.is_empty());
        assert_eq!(x.value_a, Some(&json!({"a": 1})));
        assert_eq!(x.value_b, Some(&json!(5)));
    }

    #[test]
    fn test_union_order_prefers_first_tree() {
        let a = json!({"zeta": 1, "alpha": 2});
        let b = json!({"beta": 3, "alpha": 2, "gamma": 4, "zeta": 1});
        let result = diff(&a, &b, 0);

        assert_eq!(child_keys(&result), vec!["zeta", "alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_union_is_complete_without_duplicates() {
        let a = json!({"a": 1, "b": {"c": 2}, "d": null});
        let b = json!({"b": {"c": 3}, "e": [1], "a": 1});
        let result = diff(&a, &b, 0);

        let mut keys = child_keys(&result);
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn test_added_subtree_expands_per_field() {
        let a = json!({});
        let b = json!({"houdini": {"version": "20.0", "plugins": {"redshift": true}}});
        let result = diff(&a, &b, 0);

        let houdini = &result.children[0];
        assert_eq!(houdini.status, Status::Added);
        assert_eq!(child_keys(houdini), vec!["version", "plugins"]);
        assert!(houdini.children.iter().all(|c| c.status == Status::Added));

        let redshift = result
            .find(&JsonPointer::new("/houdini/plugins/redshift").unwrap())
            .unwrap();
        assert_eq!(redshift.status, Status::Added);
        assert_eq!(redshift.value_b, Some(&json!(true)));
    }

    #[test]
    fn test_removed_subtree_expands_per_field() {
        let a = json!({"legacy": {"enabled": false}});
        let b = json!({});
        let result = diff(&a, &b, 0);

        let legacy = &result.children[0];
        assert_eq!(legacy.status, Status::Removed);
        assert_eq!(legacy.children[0].status, Status::Removed);
        assert_eq!(legacy.children[0].value_a, Some(&json!(false)));
    }

    #[test]
    fn test_explicit_null_versus_missing() {
        let a = json!({"proxy": null});
        let b = json!({});
        let result = diff(&a, &b, 0);
        assert_eq!(result.children[0].status, Status::Removed);
        assert_eq!(result.children[0].value_a, Some(&Value::Null));
    }

    #[test]
    fn test_sequences_are_atomic_leaves() {
        let a = json!({"paths": ["/mnt/a", "/mnt/b"]});
        let b = json!({"paths": ["/mnt/b", "/mnt/a"]});
        let result = diff(&a, &b, 0);

        let paths = &result.children[0];
        assert_eq!(paths.status, Status::Changed);
        assert!(paths.children.is_empty());
    }

    #[test]
    fn test_max_depth_collapses_below_limit() {
        let a = json!({"maya": {"render": {"engine": "arnold", "aov": 1}, "fps": 24}});
        let b = json!({"maya": {"render": {"engine": "arnold", "aov": 2}, "fps": 24}});

        let unlimited = diff(&a, &b, 0);
        let limited = diff(&a, &b, 1);

        let render_path = JsonPointer::new("/maya/render").unwrap();
        let full_render = unlimited.find(&render_path).unwrap();
        assert_eq!(full_render.children.len(), 2);

        let cut_render = limited.find(&render_path).unwrap();
        assert_eq!(cut_render.status, Status::Changed);
        assert!(cut_render.children.is_empty());

        // Levels above the cut are identical.
        let maya_full = &unlimited.children[0];
        let maya_cut = &limited.children[0];
        assert_eq!(maya_full.status, maya_cut.status);
        assert_eq!(child_keys(maya_full), child_keys(maya_cut));
        assert_eq!(maya_full.children[1], maya_cut.children[1]);
    }

    #[test]
    fn test_max_depth_unchanged_leaf_at_cut() {
        let a = json!({"maya": {"render": {"engine": "arnold"}}});
        let limited = diff(&a, &a, 1);
        let render = limited.find(&JsonPointer::new("/maya/render").unwrap()).unwrap();
        assert_eq!(render.status, Status::Unchanged);
        assert!(render.children.is_empty());
    }

    #[test]
    fn test_max_depth_added_subtree_collapses() {
        let a = json!({"addons": {}});
        let b = json!({"addons": {"maya": {"version": "1.2.0"}}});
        let limited = diff(&a, &b, 1);
        let maya = limited.find(&JsonPointer::new("/addons/maya").unwrap()).unwrap();
        assert_eq!(maya.status, Status::Added);
        assert!(maya.children.is_empty());
    }

    #[test]
    fn test_empty_mappings() {
        let a = json!({"a": {}});
        let b = json!({"a": {}});
        let result = diff(&a, &b, 0);
        assert_eq!(result.status, Status::Unchanged);
        assert!(result.children[0].is_leaf());

        let empty = json!({});
        let result = diff(&empty, &b, 0);
        assert_eq!(result.children[0].status, Status::Added);
        assert_eq!(result.summary().added, 1);
    }

    #[test]
    fn test_scalar_roots() {
        let a = json!(1);
        let b = json!(2);
        let result = diff(&a, &b, 0);
        assert_eq!(result.status, Status::Changed);
        assert!(result.path.is_root());
        assert!(result.children.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let a = json!({"b": {"x": 1, "y": 2}, "a": [1, 2]});
        let b = json!({"c": true, "b": {"y": 3, "x": 1}});
        assert_eq!(diff(&a, &b, 0), diff(&a, &b, 0));
    }

    #[test]
    fn test_summary_and_only_differences() {
        let a = json!({"fps": 24, "maya": {"renderer": "arnold"}, "old": 1});
        let b = json!({"fps": 25, "maya": {"renderer": "arnold"}, "nuke": "2.0"});
        let result = diff(&a, &b, 0);

        let summary = result.summary();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.differences(), 3);

        let pruned = result.only_differences().unwrap();
        assert_eq!(child_keys(&pruned), vec!["fps", "old", "nuke"]);
        assert!(diff(&a, &a, 0).only_differences().is_none());
    }

    #[test]
    fn test_serialization_is_plain() -> Result<(), Box<dyn std::error::Error>> {
        let a = json!({"fps": 24, "maya": {"renderer": "arnold"}});
        let b = json!({"fps": 25, "maya": {"renderer": "arnold"}, "nuke": "2.0"});
        let result = diff(&a, &b, 0);

        let serialized = serde_json::to_value(&result)?;
        assert_eq!(
            serialized,
            json!({
                "path": "",
                "status": "changed",
                "children": [
                    {"path": "/fps", "status": "changed", "value_a": 24, "value_b": 25},
                    {"path": "/maya", "status": "unchanged", "children": [
                        {"path": "/maya/renderer", "status": "unchanged",
                         "value_a": "arnold", "value_b": "arnold"}
                    ]},
                    {"path": "/nuke", "status": "added", "value_b": "2.0"}
                ]
            })
        );
        Ok(())
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview(None), "(missing)");
        assert_eq!(preview(Some(&json!(null))), "null");
        assert_eq!(preview(Some(&json!({"fps": 24}))), r#"{"fps":24}"#);

        let long = json!("x".repeat(100));
        let shown = preview(Some(&long));
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 63);
    }
}
