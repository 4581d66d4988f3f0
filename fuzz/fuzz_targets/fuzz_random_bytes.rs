#![no_main]

use libfuzzer_sys::fuzz_target;
use bundle_sync::{is_backup_file, read_backup, read_json, BundleExport};
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    for suffix in [".json", ".json.gz", ".json.zst", ".json.br"] {
        if let Ok(mut temp_file) = NamedTempFile::with_suffix(suffix) {
            if temp_file.write_all(data).is_ok() {
                // Any input either parses or produces diagnostics, never a panic
                let _ = is_backup_file(temp_file.path());
                let _ = read_backup(temp_file.path());
                if let Ok(value) = read_json(temp_file.path()) {
                    if let Ok(bundle) = BundleExport::from_value(&value) {
                        let _ = bundle.to_settings_tree();
                    }
                }
            }
        }
    }
});
