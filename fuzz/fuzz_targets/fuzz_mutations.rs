#![no_main]

use libfuzzer_sys::fuzz_target;
use bundle_sync::{read_backup, DiagnosticCode};
use std::io::Write;
use tempfile::NamedTempFile;

fn create_backup_content(data: &[u8]) -> Vec<u8> {
    // Start with a valid backup
    let base = r#"{"type":"@peoplesgrocers/bundle-sync-backup","version":1,"created":"2025-01-01T00:00:00Z","id":"67e55044-10b1-426f-9247-bb680e5fe0c8","kind":"bundle","source":"prod","target":"dev","settings":{"addons":{"maya":"1.0.0"}}}"#;

    let mut result = base.as_bytes().to_vec();

    if data.is_empty() {
        return result;
    }

    let max_size = 4096;

    for (i, &byte) in data.iter().take(16).enumerate() {
        if result.len() > max_size {
            break;
        }

        match byte % 8 {
            0 => {
                // Truncate at random position
                let pos = (byte as usize) % result.len().max(1);
                result.truncate(pos);
            }
            1 => {
                // Insert invalid UTF-8
                let pos = (byte as usize) % (result.len() + 1);
                result.insert(pos, 0xFF);
            }
            2 => {
                // Corrupt a quote
                if let Some(pos) = result.iter().position(|&b| b == b'"') {
                    result[pos] = b'X';
                }
            }
            3 => {
                // Bump the version digit
                if let Some(pos) = result.windows(10).position(|w| w == b"\"version\":") {
                    if let Some(digit) = result.get_mut(pos + 10) {
                        *digit = b'0' + byte % 10;
                    }
                }
            }
            4 => {
                // Corrupt JSON bracket
                if let Some(pos) = result.iter().position(|&b| b == b'[' || b == b'{') {
                    result[pos] = b'?';
                }
            }
            5 => {
                // Insert random byte
                let pos = (byte as usize) % (result.len() + 1);
                result.insert(pos, byte);
            }
            6 => {
                // Remove a character
                if !result.is_empty() {
                    let pos = (byte as usize) % result.len();
                    result.remove(pos);
                }
            }
            _ => {
                // Add a stray field
                let insertion = format!(",\"extra{}\":null", i);
                let pos = (byte as usize) % (result.len() + 1);
                result.splice(pos..pos, insertion.bytes());
            }
        }
    }

    result
}

fuzz_target!(|data: &[u8]| {
    let content = create_backup_content(data);

    if let Ok(mut temp_file) = NamedTempFile::with_suffix(".json") {
        if temp_file.write_all(&content).is_ok() {
            match read_backup(temp_file.path()) {
                Ok(backup) => {
                    assert_eq!(backup.version, 1);
                    assert_eq!(backup.file_type, "@peoplesgrocers/bundle-sync-backup");
                }
                Err(diagnostics) => {
                    assert!(!diagnostics.is_empty());
                    for diagnostic in &diagnostics {
                        assert!(!diagnostic.description.is_empty());
                        assert!(diagnostic.code != DiagnosticCode::NothingToSync);
                    }
                }
            }
        }
    }
});
