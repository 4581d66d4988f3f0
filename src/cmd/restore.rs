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

use bundle_sync::{
    flags, is_backup_file, read_backup, write_json_atomic, Diagnostic, DiagnosticCode,
};

pub fn run(flags: &flags::Restore) -> Vec<Diagnostic> {
    match is_backup_file(&flags.backup) {
        Ok(true) => {}
        Ok(false) => {
            return vec![Diagnostic::fatal(
                DiagnosticCode::InvalidBackup,
                format!("{} doesn't look like a backup file.", flags.backup.display()),
            )
            .with_advice(
                "Backups are named {target}_{kind}_{date}_{time}.json (with an optional\n\
                 project after the target) and start with a \
                 \"type\": \"@peoplesgrocers/bundle-sync-backup\" field."
                    .to_string(),
            )];
        }
        Err(e) => {
            return vec![Diagnostic::fatal(
                DiagnosticCode::PathNotFound,
                format!("I couldn't open the backup file: {}", e),
            )
            .with_file(flags.backup.display().to_string())];
        }
    }

    let backup = match read_backup(&flags.backup) {
        Ok(backup) => backup,
        Err(diagnostics) => return diagnostics,
    };

    match &flags.output {
        Some(output) => {
            if let Err(diagnostics) = write_json_atomic(output, &backup.settings) {
                return diagnostics;
            }
            println!(
                "Restored {} backup of {} (taken {}) to {}",
                backup.kind,
                backup.target,
                backup.created.to_rfc3339(),
                output.display()
            );
        }
        None => match serde_json::to_string_pretty(&backup.settings) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                return vec![Diagnostic::fatal(
                    DiagnosticCode::WriteFailed,
                    format!("I couldn't serialize the restored settings: {}", e),
                )];
            }
        },
    }

    Vec::new()
}
