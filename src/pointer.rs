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

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use serde::{Serialize, Serializer};
use std::fmt;

/// Address of a position inside a settings tree.
///
/// Tokens are stored unescaped. The string form follows RFC 6901, so a key
/// containing `/` or `~` round-trips through `~1` and `~0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    pub fn new(path: &str) -> Result<Self, Diagnostic> {
        if path.is_empty() {
            return Ok(JsonPointer { tokens: vec![] });
        }

        if !path.starts_with('/') {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidPointerSyntax,
                format!(
                    "I couldn't parse the path '{}': Path must start with '/'",
                    path
                ),
            )
            .with_advice(
                "Paths use JSON Pointer syntax, for example /settings/maya/renderer.\n\
                 Special characters: use ~0 for ~ and ~1 for /"
                    .to_string(),
            ));
        }

        let tokens = path[1..]
            .split('/')
            .map(|token| token.replace("~1", "/").replace("~0", "~"))
            .collect();

        Ok(JsonPointer { tokens })
    }

    pub fn root() -> Self {
        JsonPointer { tokens: vec![] }
    }

    /// Returns a new pointer one level below this one.
    pub fn child(&self, token: &str) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend(self.tokens.iter().cloned());
        tokens.push(token.to_string());
        JsonPointer { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Top-level key this pointer lives under.
    pub fn category(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl Serialize for JsonPointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_pointer() {
        let pointer = JsonPointer::new("").unwrap();
        assert!(pointer.is_root());
        assert_eq!(pointer, JsonPointer::root());
        assert_eq!(pointer.to_string(), "");
    }

    #[test]
    fn test_nested_path() {
        let pointer = JsonPointer::new("/settings/maya").unwrap();
        assert_eq!(pointer.tokens(), ["settings", "maya"]);
        assert_eq!(pointer.category(), Some("settings"));
        assert_eq!(pointer.last(), Some("maya"));
    }

    #[test]
    fn test_must_start_with_slash() {
        let err = JsonPointer::new("settings").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidPointerSyntax);
    }

    #[test]
    fn test_escape_sequences_round_trip() {
        let pointer = JsonPointer::root().child("foo/bar").child("a~b");
        assert_eq!(pointer.to_string(), "/foo~1bar/a~0b");
        assert_eq!(JsonPointer::new("/foo~1bar/a~0b").unwrap(), pointer);
        assert_eq!(pointer.last(), Some("a~b"));
    }

    #[test]
    fn test_serializes_as_string() {
        let pointer = JsonPointer::root().child("settings").child("fps");
        assert_eq!(serde_json::to_value(&pointer).unwrap(), json!("/settings/fps"));
    }
}
