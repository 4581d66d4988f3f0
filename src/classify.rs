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

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Relationship between the two values found at one tree position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Only present in the second tree.
    Added,
    /// Only present in the first tree.
    Removed,
    Changed,
    Unchanged,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "added",
            Status::Removed => "removed",
            Status::Changed => "changed",
            Status::Unchanged => "unchanged",
        }
    }

    pub fn marker(&self) -> char {
        match self {
            Status::Added => '+',
            Status::Removed => '-',
            Status::Changed => '~',
            Status::Unchanged => ' ',
        }
    }

    pub fn is_difference(&self) -> bool {
        *self != Status::Unchanged
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies one position given the values of both trees.
///
/// Equality is type-sensitive: `1` and `"1"` differ, so do `true` and `1`.
/// Sequences are compared element by element in order. Mappings compare by
/// key/value membership and ignore key order.
///
/// # Panics
///
/// Panics when both values are absent. Traversals only visit keys present in
/// at least one tree, so this is an invariant violation in the caller.
pub fn classify(value_a: Option<&Value>, value_b: Option<&Value>) -> Status {
    match (value_a, value_b) {
        (None, Some(_)) => Status::Added,
        (Some(_), None) => Status::Removed,
        (Some(a), Some(b)) => {
            if values_equal(a, b) {
                Status::Unchanged
            } else {
                Status::Changed
            }
        }
        (None, None) => panic!("classify called for a position absent from both trees"),
    }
}

/// Deep equality used by the classifier.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(l, r)| classify(Some(l), Some(r)) == Status::Unchanged)
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, l)| match right.get(key) {
                    Some(r) => values_equal(l, r),
                    None => false,
                })
        }
        _ => a == b,
    }
}
