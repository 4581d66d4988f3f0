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

//! Compare two settings trees and synchronize one into the other.
//!
//! The core is three pure layers: [`classify`] decides what happened at one
//! position, [`diff()`] walks two trees into a [`ChangeRecord`], and [`apply()`]
//! builds the synced target. [`SyncPlan`] lists what a sync would write.
//! Everything else reads and writes files around that core, and
//! [`sync_files`] strings the whole sync together.

pub mod apply;
pub mod backup;
pub mod bundle;
pub mod classify;
pub mod compression;
pub mod diagnostics;
pub mod diff;
pub mod files;
pub mod flags;
pub mod plan;
pub mod pointer;
pub mod sync;

pub use apply::apply;
pub use backup::{default_backup_dir, is_backup_file, read_backup, write_backup, Backup};
pub use bundle::{category_depth, merge_settings_tree, BundleExport, SettingsFile};
pub use classify::{classify, Status};
pub use compression::Compression;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector, DiagnosticLevel};
pub use diff::{diff, preview, ChangeRecord, ChangeSummary};
pub use files::{read_json, write_json_atomic};
pub use plan::{PlanEntry, SyncFilter, SyncMode, SyncPlan};
pub use pointer::JsonPointer;
pub use sync::{sync_files, Operation, SyncOptions, SyncOutcome};
