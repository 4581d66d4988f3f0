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

use serde_json::{Map, Value};

use crate::classify::{classify, Status};
use crate::diff::{is_mapping_position, union_keys};
use crate::plan::{SyncFilter, SyncMode};
use crate::pointer::JsonPointer;

/// Builds a new target tree that takes values from `source` wherever `mode`
/// and `filter` allow it.
///
/// Neither input is modified. The count is the number of positions whose
/// value actually changed, added and removed keys included. It always equals
/// `SyncPlan::change_count` for the same inputs.
pub fn apply(
    source: &Value,
    target: &Value,
    mode: SyncMode,
    filter: &SyncFilter,
) -> (Value, usize) {
    let merger = Merger { mode, filter };
    let (tree, count) = merger.merge(&JsonPointer::root(), Some(target), Some(source));
    (tree.unwrap_or_else(|| target.clone()), count)
}

struct Merger<'f> {
    mode: SyncMode,
    filter: &'f SyncFilter,
}

impl Merger<'_> {
    /// Returns the value the position should hold afterwards (`None` removes
    /// it) and the number of modifications made at or below it.
    fn merge(
        &self,
        path: &JsonPointer,
        target: Option<&Value>,
        source: Option<&Value>,
    ) -> (Option<Value>, usize) {
        if !self.filter.covers(path) {
            return (target.cloned(), 0);
        }

        if is_mapping_position(target, source) {
            return self.merge_mapping(path, target, source);
        }

        if !self.filter.allows_leaf(path) {
            return (target.cloned(), 0);
        }

        match classify(target, source) {
            Status::Unchanged => match self.mode {
                SyncMode::All => (source.cloned(), 0),
                SyncMode::DiffOnly => (target.cloned(), 0),
            },
            _ => (source.cloned(), 1),
        }
    }

    fn merge_mapping(
        &self,
        path: &JsonPointer,
        target: Option<&Value>,
        source: Option<&Value>,
    ) -> (Option<Value>, usize) {
        let target_map = target.and_then(Value::as_object);
        let source_map = source.and_then(Value::as_object);

        let mut merged = Map::new();
        let mut count = 0;

        for key in union_keys(target_map, source_map) {
            let (value, applied) = self.merge(
                &path.child(key),
                target_map.and_then(|m| m.get(key)),
                source_map.and_then(|m| m.get(key)),
            );
            if let Some(value) = value {
                merged.insert(key.to_string(), value);
            }
            count += applied;
        }

        match (target_map, source_map) {
            // Source introduces the mapping.
            (None, Some(source_map)) => {
                if !merged.is_empty() {
                    (Some(Value::Object(merged)), count)
                } else if source_map.is_empty() && self.filter.allows_leaf(path) {
                    (Some(Value::Object(Map::new())), 1)
                } else {
                    (None, 0)
                }
            }
            // Source lacks the mapping. It goes away once nothing out of scope
            // remains inside it.
            (Some(target_map), None) => {
                if merged.is_empty() && self.filter.allows_leaf(path) {
                    let removed = if target_map.is_empty() { 1 } else { count };
                    (None, removed)
                } else {
                    (Some(Value::Object(merged)), count)
                }
            }
            _ => (Some(Value::Object(merged)), count),
        }
    }
}
