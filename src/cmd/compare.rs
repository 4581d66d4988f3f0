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
    category_depth, diff, flags, preview, ChangeRecord, ChangeSummary, Diagnostic, DiagnosticCode,
    JsonPointer, SettingsFile,
};
use serde::Serialize;

#[derive(Serialize)]
struct CompareReport<'a> {
    a: &'a str,
    b: &'a str,
    max_depth: usize,
    summary: ChangeSummary,
    changes: Option<&'a ChangeRecord<'a>>,
}

pub fn run(flags: &flags::Compare) -> Vec<Diagnostic> {
    let at = match flags.at.as_deref().map(JsonPointer::new).transpose() {
        Ok(at) => at,
        Err(diagnostic) => return vec![diagnostic],
    };

    let a = match SettingsFile::load(&flags.a, flags.bundle) {
        Ok(loaded) => loaded,
        Err(diagnostics) => return diagnostics,
    };
    let b = match SettingsFile::load(&flags.b, flags.bundle) {
        Ok(loaded) => loaded,
        Err(diagnostics) => return diagnostics,
    };

    let max_depth = flags.max_depth.unwrap_or(0);
    // In bundle mode the depth counts from inside each category.
    let tree_depth = if flags.bundle { category_depth(max_depth) } else { max_depth };
    let full = diff(&a.tree, &b.tree, tree_depth);

    let scoped = match &at {
        Some(pointer) => match full.find(pointer) {
            Some(record) => record,
            None => {
                return vec![Diagnostic::fatal(
                    DiagnosticCode::PointerNotFound,
                    format!("Neither file has a position at {}.", pointer),
                )
                .with_advice(
                    "The position may lie below --max-depth. Try a larger depth or 0 for unlimited."
                        .to_string(),
                )];
            }
        },
        None => &full,
    };

    let summary = scoped.summary();
    let pruned = if flags.only_diff {
        scoped.only_differences()
    } else {
        Some(scoped.clone())
    };

    println!("Comparing {} -> {}", a.name, b.name);
    if let Some(record) = &pruned {
        for leaf in record.leaves() {
            println!("{} {}: {}", leaf.status.marker(), leaf.path, describe(leaf));
        }
    }
    if summary.differences() == 0 {
        println!("No differences found");
    }
    println!(
        "{} added, {} removed, {} changed, {} unchanged",
        summary.added, summary.removed, summary.changed, summary.unchanged
    );

    if let Some(output) = &flags.output {
        let report = CompareReport {
            a: &a.name,
            b: &b.name,
            max_depth,
            summary,
            changes: pruned.as_ref(),
        };
        if let Err(diagnostics) = bundle_sync::write_json_atomic(output, &report) {
            return diagnostics;
        }
        println!("Report written to {}", output.display());
    }

    Vec::new()
}

fn describe(record: &ChangeRecord<'_>) -> String {
    use bundle_sync::Status;

    match record.status {
        Status::Added => preview(record.value_b),
        Status::Removed | Status::Unchanged => preview(record.value_a),
        Status::Changed => format!("{} -> {}", preview(record.value_a), preview(record.value_b)),
    }
}
