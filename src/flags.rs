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

use std::path::PathBuf;

xflags::xflags! {
    cmd bundle-sync {
        cmd compare {
            /// First settings file (bundle A)
            required a: PathBuf

            /// Second settings file (bundle B)
            required b: PathBuf

            /// Stop descending below this many levels (0 = unlimited)
            optional --max-depth max_depth: usize

            /// Leave unchanged positions out of the report
            optional --only-diff

            /// Treat both files as bundle exports and compare them by category
            optional --bundle

            /// Only report the subtree at this JSON pointer, e.g. /settings/maya
            optional --at at: String

            /// Write the change record as JSON to this file
            optional -o, --output output: PathBuf
        }

        cmd sync {
            /// File to copy settings from
            required source: PathBuf

            /// File to copy settings into
            required target: PathBuf

            /// diff-only (default) copies differences, all copies every in-scope value
            optional --mode mode: String

            /// bundle (default) syncs bundle to bundle, project-bundle copies the
            /// source's project settings into the target's studio settings
            optional --operation operation: String

            /// Restrict the sync to this top-level category (repeatable)
            repeated --category category: String

            /// Restrict addon-keyed categories to this addon (repeatable)
            repeated --addon addon: String

            /// Project the synced settings belong to, recorded in the backup name
            optional --project project: String

            /// Treat both files as bundle exports
            optional --bundle

            /// Show the plan without backing up or writing anything
            optional --dry-run

            /// Write the synced tree here instead of overwriting the target
            optional -o, --output output: PathBuf

            /// Directory for the pre-sync backup (defaults to ~/.ayon/sync_backups)
            optional --backup-dir backup_dir: PathBuf

            /// Compress the backup: gzip, zstd or brotli
            optional --compress compress: String
        }

        cmd restore {
            /// Backup file written by a previous sync
            required backup: PathBuf

            /// Write the restored settings here instead of printing them
            optional -o, --output output: PathBuf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Result<BundleSync, xflags::Error> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        BundleSync::from_vec(args)
    }

    #[test]
    fn test_parse_sync() {
        let flags = parse(&[
            "sync",
            "prod.json",
            "dev.json",
            "--mode",
            "all",
            "--category",
            "addons",
            "--category",
            "settings",
            "--addon",
            "maya",
            "--project",
            "shot_a",
            "--dry-run",
        ])
        .unwrap();

        match flags.subcommand {
            BundleSyncCmd::Sync(sync) => {
                assert_eq!(sync.source, PathBuf::from("prod.json"));
                assert_eq!(sync.mode.as_deref(), Some("all"));
                assert_eq!(sync.category, vec!["addons", "settings"]);
                assert_eq!(sync.addon, vec!["maya"]);
                assert_eq!(sync.project.as_deref(), Some("shot_a"));
                assert!(sync.operation.is_none());
                assert!(sync.dry_run);
                assert!(!sync.bundle);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_parse_compare() {
        let flags =
            parse(&["compare", "a.json", "b.json", "--max-depth", "2", "--only-diff"]).unwrap();
        match flags.subcommand {
            BundleSyncCmd::Compare(compare) => {
                assert_eq!(compare.max_depth, Some(2));
                assert!(compare.only_diff);
                assert!(compare.output.is_none());
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_parse_project_bundle_operation() {
        let flags =
            parse(&["sync", "proj.json", "dev.json", "--operation", "project-bundle"]).unwrap();
        match flags.subcommand {
            BundleSyncCmd::Sync(sync) => {
                assert_eq!(sync.operation.as_deref(), Some("project-bundle"));
                assert!(sync.category.is_empty());
                assert!(sync.addon.is_empty());
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_missing_target_is_rejected() {
        assert!(parse(&["sync", "prod.json"]).is_err());
    }
}
