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


use bundle_sync::{flags, sync_files, Compression, Diagnostic, Operation, SyncMode, SyncOptions};

pub fn run(flags: &flags::Sync) -> Vec<Diagnostic> {
    let mode = match flags.mode.as_deref().map(str::parse::<SyncMode>).transpose() {
        Ok(mode) => mode.unwrap_or_default(),
        Err(diagnostic) => return vec![diagnostic],
    };
    let operation = match flags.operation.as_deref().map(str::parse::<Operation>).transpose() {
        Ok(operation) => operation.unwrap_or_default(),
        Err(diagnostic) => return vec![diagnostic],
    };
    let compression = match flags.compress.as_deref().map(str::parse::<Compression>).transpose() {
        Ok(compression) => compression.unwrap_or_default(),
        Err(diagnostic) => return vec![diagnostic],
    };

    let options = SyncOptions {
        mode,
        operation,
        categories: flags.category.clone(),
        addons: flags.addon.clone(),
        bundle: flags.bundle,
        project: flags.project.clone(),
        dry_run: flags.dry_run,
        output: flags.output.clone(),
        backup_dir: flags.backup_dir.clone(),
        compression,
    };

    sync_files(&flags.source, &flags.target, &options).diagnostics
}
