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
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and parses a JSON document, reporting problems as diagnostics
/// attached to the file name.
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Value, Vec<Diagnostic>> {
    let path = path.as_ref();
    let filename = path.display().to_string();

    if !path.exists() {
        return Err(vec![Diagnostic::fatal(
            DiagnosticCode::PathNotFound,
            format!("I couldn't find the file: {}", filename),
        )
        .with_advice(
            "Make sure the file path is correct and the file exists. \
             Check for typos in the filename."
                .to_string(),
        )]);
    }

    let bytes = fs::read(path).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::PathNotFound,
            format!("I couldn't read the file: {}", e),
        )
        .with_file(filename.clone())]
    })?;

    let text = String::from_utf8(bytes).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::InvalidUtf8,
            format!(
                "I found bytes that aren't valid UTF-8 at offset {}.",
                e.utf8_error().valid_up_to()
            ),
        )
        .with_file(filename.clone())]
    })?;

    serde_json::from_str(&text).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::InvalidJson,
            format!(
                "I couldn't parse this file as JSON (line {}, column {}): {}",
                e.line(),
                e.column(),
                e
            ),
        )
        .with_file(filename)]
    })
}

/// Writes `value` as pretty-printed JSON.
///
/// The data goes to a sibling temporary file first and is renamed over
/// `path`, so readers never see a half-written file.
pub fn write_json_atomic<P: AsRef<Path>, T: Serialize + ?Sized>(
    path: P,
    value: &T,
) -> Result<(), Vec<Diagnostic>> {
    let path = path.as_ref();
    let filename = path.display().to_string();

    let mut json = serde_json::to_string_pretty(value).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::WriteFailed,
            format!("I couldn't serialize the output: {}", e),
        )
        .with_file(filename.clone())]
    })?;
    json.push('\n');

    let temp_path = temp_sibling(path);
    let written = fs::write(&temp_path, json).and_then(|_| fs::rename(&temp_path, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(vec![Diagnostic::fatal(
            DiagnosticCode::WriteFailed,
            format!("I couldn't write the output file: {}", e),
        )
        .with_file(filename)
        .with_advice(
            "Make sure you have write permission in this directory and that the path is valid."
                .to_string(),
        )]);
    }

    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_read_valid_json() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::with_suffix(".json")?;
        writeln!(file, r#"{{"fps": 24, "renderer": "arnold"}}"#)?;
        file.flush()?;

        let value = read_json(file.path()).map_err(|d| format!("{:?}", d))?;
        assert_eq!(value, json!({"fps": 24, "renderer": "arnold"}));
        Ok(())
    }

    #[test]
    fn test_read_reports_problems() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let err = read_json(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::PathNotFound);

        let mut broken = NamedTempFile::with_suffix(".json")?;
        writeln!(broken, r#"{{"fps": }}"#)?;
        broken.flush()?;
        let err = read_json(broken.path()).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::InvalidJson);

        let mut binary = NamedTempFile::with_suffix(".json")?;
        binary.write_all(&[b'{', 0xff, 0xfe, b'}'])?;
        binary.flush()?;
        let err = read_json(binary.path()).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::InvalidUtf8);
        Ok(())
    }

    #[test]
    fn test_write_replaces_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("target.json");
        fs::write(&path, "{}")?;

        write_json_atomic(&path, &json!({"fps": 25})).map_err(|d| format!("{:?}", d))?;

        assert_eq!(read_json(&path).map_err(|d| format!("{:?}", d))?, json!({"fps": 25}));
        assert!(!temp_sibling(&path).exists());
        Ok(())
    }

    #[test]
    fn test_write_into_missing_directory_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let err = write_json_atomic(dir.path().join("no/such/dir.json"), &json!({})).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::WriteFailed);
        Ok(())
    }
}
