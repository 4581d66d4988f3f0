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

use crate::compression::Compression;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const BACKUP_TYPE: &str = "@peoplesgrocers/bundle-sync-backup";
pub const BACKUP_VERSION: u32 = 1;

/// Snapshot of a target taken right before a sync writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// Kept as the first key so a backup renamed to an unexpected extension
    /// can still be recognized from its first line.
    #[serde(rename = "type")]
    pub file_type: String,
    pub version: u32,
    pub created: DateTime<Utc>,
    pub id: Uuid,
    /// What was backed up, e.g. `bundle`, `project` or `anatomy`.
    pub kind: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub settings: Value,
}

impl Backup {
    pub fn new(kind: &str, source: &str, target: &str, settings: Value) -> Self {
        Self {
            file_type: BACKUP_TYPE.to_string(),
            version: BACKUP_VERSION,
            created: Utc::now(),
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            project: None,
            settings,
        }
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.project = Some(project.to_string());
        self
    }

    /// `{target}_{kind}_{stamp}.json`, or `{target}_{project}_{kind}_{stamp}.json`
    /// when a project is set.
    pub fn filename(&self, compression: Compression) -> String {
        let prefix = match &self.project {
            Some(project) => format!("{}_{}", sanitize(&self.target), sanitize(project)),
            None => sanitize(&self.target),
        };
        format!(
            "{}_{}_{}.json{}",
            prefix,
            sanitize(&self.kind),
            self.created.format("%Y%m%d_%H%M%S"),
            compression.extension()
        )
    }
}

/// `$HOME/.ayon/sync_backups`, or `None` when no home directory is set.
pub fn default_backup_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".ayon").join("sync_backups"))
}

/// Writes `backup` into `dir`, creating the directory when needed, and
/// returns the path of the new file.
pub fn write_backup<P: AsRef<Path>>(
    dir: P,
    backup: &Backup,
    compression: Compression,
) -> Result<PathBuf, Vec<Diagnostic>> {
    let dir = dir.as_ref();
    if let Err(e) = fs::create_dir_all(dir) {
        return Err(vec![backup_failed(
            format!("I couldn't create the backup directory: {}", e),
            dir,
        )]);
    }

    let path = dir.join(backup.filename(compression));

    let json = serde_json::to_vec(backup).map_err(|e| {
        vec![backup_failed(
            format!("I couldn't serialize the backup: {}", e),
            &path,
        )]
    })?;
    let bytes = compression
        .compress(&json)
        .map_err(|d| vec![d.with_file(path.display().to_string())])?;

    if let Err(e) = fs::write(&path, bytes) {
        return Err(vec![backup_failed(
            format!("I couldn't write the backup file: {}", e),
            &path,
        )]);
    }

    Ok(path)
}

/// Reads a backup, decompressing by file extension.
pub fn read_backup<P: AsRef<Path>>(path: P) -> Result<Backup, Vec<Diagnostic>> {
    let path = path.as_ref();
    let filename = path.display().to_string();

    let bytes = fs::read(path).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::PathNotFound,
            format!("I couldn't read the backup file: {}", e),
        )
        .with_file(filename.clone())]
    })?;
    let bytes = Compression::from_path(path)
        .decompress(&bytes)
        .map_err(|d| vec![d.with_file(filename.clone())])?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::InvalidJson,
            format!("I couldn't parse the backup file as JSON: {}", e),
        )
        .with_file(filename.clone())]
    })?;

    if value.get("type").and_then(Value::as_str) != Some(BACKUP_TYPE) {
        return Err(vec![Diagnostic::fatal(
            DiagnosticCode::InvalidBackup,
            format!(
                "This file doesn't have a \"type\": \"{}\" field, so I don't think it is a backup.",
                BACKUP_TYPE
            ),
        )
        .with_file(filename)
        .with_advice(
            "Backups are written by `bundle-sync sync` before it changes a target.".to_string(),
        )]);
    }

    match value.get("version").and_then(Value::as_u64) {
        Some(version) if version == u64::from(BACKUP_VERSION) => {}
        other => {
            let found = other.map_or_else(|| "none".to_string(), |v| v.to_string());
            return Err(vec![Diagnostic::fatal(
                DiagnosticCode::UnsupportedBackupVersion,
                format!(
                    "I only understand backup version {}, but this file has version {}.",
                    BACKUP_VERSION, found
                ),
            )
            .with_file(filename)]);
        }
    }

    serde_json::from_value(value).map_err(|e| {
        vec![Diagnostic::fatal(
            DiagnosticCode::InvalidBackup,
            format!("I couldn't read the backup header: {}", e),
        )
        .with_file(filename)]
    })
}

/// Detects backup files by name or by content.
///
/// A name of the form `{target}_{kind}_{YYYYmmdd}_{HHMMSS}.json` (optionally
/// followed by a compression extension) is enough. The target part may carry
/// a project name of its own. Otherwise the first line
/// must be an object whose first key is `type` with the backup type value.
pub fn is_backup_file<P: AsRef<Path>>(path: P) -> Result<bool, std::io::Error> {
    let path = path.as_ref();

    if let Some(filename) = path.file_name().and_then(|name| name.to_str()) {
        if has_backup_name(filename) {
            return Ok(true);
        }
    }

    let bytes = fs::read(path)?;
    let Ok(bytes) = Compression::from_path(path).decompress(&bytes) else {
        return Ok(false);
    };
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();

    if let Ok(Value::Object(obj)) = serde_json::from_slice::<Value>(first_line) {
        if let Some((first_key, first_value)) = obj.iter().next() {
            return Ok(first_key == "type" && first_value.as_str() == Some(BACKUP_TYPE));
        }
    }

    Ok(false)
}

fn has_backup_name(filename: &str) -> bool {
    let stem = [".gz", ".zst", ".br"]
        .iter()
        .find_map(|ext| filename.strip_suffix(ext))
        .unwrap_or(filename);
    let Some(stem) = stem.strip_suffix(".json") else {
        return false;
    };

    let parts: Vec<&str> = stem.rsplitn(4, '_').collect();
    let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());

    parts.len() == 4
        && all_digits(parts[0], 6)
        && all_digits(parts[1], 8)
        && !parts[2].is_empty()
        && !parts[3].is_empty()
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn backup_failed(description: String, path: &Path) -> Diagnostic {
    Diagnostic::fatal(DiagnosticCode::BackupFailed, description)
        .with_file(path.display().to_string())
        .with_advice(
            "Nothing was synced. Check that the backup directory is writable,\n\
             or choose another one with --backup-dir."
                .to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn sample() -> Backup {
        Backup::new(
            "bundle",
            "studio-prod",
            "studio-dev",
            json!({"settings": {"maya": {"renderer": "arnold"}}}),
        )
    }

    #[test]
    fn test_filename_shape() {
        let backup = sample();
        let name = backup.filename(Compression::None);
        assert!(name.starts_with("studio-dev_bundle_"));
        assert!(name.ends_with(".json"));
        assert!(has_backup_name(&name));
        assert!(backup.filename(Compression::Gzip).ends_with(".json.gz"));
    }

    #[test]
    fn test_filename_sanitizes_paths() {
        let backup = Backup::new("settings", "a.json", "dir/target file", json!({}));
        assert!(backup
            .filename(Compression::None)
            .starts_with("dir_target_file_settings_"));
    }

    #[test]
    fn test_project_goes_into_filename() {
        let backup = Backup::new("project", "studio-prod", "studio-dev", json!({}))
            .with_project("shot a");
        let name = backup.filename(Compression::Zstd);
        assert!(name.starts_with("studio-dev_shot_a_project_"));
        assert!(name.ends_with(".json.zst"));
        assert!(has_backup_name(&name));

        let header = serde_json::to_value(&backup).unwrap();
        assert_eq!(header["project"], json!("shot a"));
        assert!(serde_json::to_value(sample()).unwrap().get("project").is_none());
    }

    #[test]
    fn test_write_then_read() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let backup = sample();
        let path = write_backup(dir.path().join("nested"), &backup, Compression::None)
            .map_err(|d| format!("{:?}", d))?;

        assert!(path.exists());
        assert!(is_backup_file(&path)?);

        let contents = fs::read_to_string(&path)?;
        assert!(contents.starts_with(r#"{"type":"@peoplesgrocers/bundle-sync-backup""#));

        let restored = read_backup(&path).map_err(|d| format!("{:?}", d))?;
        assert_eq!(restored, backup);
        Ok(())
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_write_then_read_compressed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let backup = sample();
        for compression in [Compression::Gzip, Compression::Zstd, Compression::Brotli] {
            let path = write_backup(dir.path().join(compression.as_str()), &backup, compression)
                .map_err(|d| format!("{:?}", d))?;
            let restored = read_backup(&path).map_err(|d| format!("{:?}", d))?;
            assert_eq!(restored.settings, backup.settings);
        }
        Ok(())
    }

    #[test]
    fn test_detect_by_type_field() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::with_suffix(".tmp")?;
        writeln!(file, r#"{{"type":"{}","version":1}}"#, BACKUP_TYPE)?;
        file.flush()?;
        assert!(is_backup_file(file.path())?);
        Ok(())
    }

    #[test]
    fn test_plain_json_is_not_backup() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::with_suffix(".json")?;
        writeln!(file, r#"{{"settings": {{}}, "type": "{}"}}"#, BACKUP_TYPE)?;
        file.flush()?;
        assert!(!is_backup_file(file.path())?);

        let mut plain = NamedTempFile::with_suffix(".json")?;
        writeln!(plain, r#"{{"settings": {{}}}}"#)?;
        plain.flush()?;
        let err = read_backup(plain.path()).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::InvalidBackup);
        Ok(())
    }

    #[test]
    fn test_unsupported_version() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::with_suffix(".json")?;
        writeln!(file, r#"{{"type":"{}","version":7}}"#, BACKUP_TYPE)?;
        file.flush()?;

        let err = read_backup(file.path()).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::UnsupportedBackupVersion);
        Ok(())
    }

    #[test]
    fn test_unwritable_directory_fails() -> Result<(), Box<dyn std::error::Error>> {
        let file = NamedTempFile::new()?;
        // A regular file can't be used as a directory.
        let err = write_backup(file.path().join("sub"), &sample(), Compression::None).unwrap_err();
        assert_eq!(err[0].code, DiagnosticCode::BackupFailed);
        Ok(())
    }

    #[test]
    fn test_backup_name_detection() {
        assert!(has_backup_name("studio_dev_bundle_20250101_120000.json.zst"));
        assert!(!has_backup_name("settings.json"));
        assert!(!has_backup_name("bundle_20250101_120000.json"));
        assert!(!has_backup_name("a_b_2025_120000.json"));
    }
}
