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

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Fatal,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Fatal => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    PathNotFound,
    InvalidJson,
    InvalidUtf8,

    InvalidPointerSyntax,
    PointerNotFound,

    InvalidSyncMode,
    UnknownCompression,
    CompressionUnavailable,
    InvalidOperation,

    MissingBundleField,
    TargetNotDevBundle,

    BackupFailed,
    InvalidBackup,
    UnsupportedBackupVersion,

    WriteFailed,

    AddonNotInSource,

    NothingToSync,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::PathNotFound => "E001",
            DiagnosticCode::InvalidJson => "E002",
            DiagnosticCode::InvalidUtf8 => "E003",

            DiagnosticCode::InvalidPointerSyntax => "E010",
            DiagnosticCode::PointerNotFound => "E011",

            DiagnosticCode::InvalidSyncMode => "E020",
            DiagnosticCode::UnknownCompression => "E021",
            DiagnosticCode::CompressionUnavailable => "E022",
            DiagnosticCode::InvalidOperation => "E023",

            DiagnosticCode::MissingBundleField => "E030",
            DiagnosticCode::TargetNotDevBundle => "E031",

            DiagnosticCode::BackupFailed => "E040",
            DiagnosticCode::InvalidBackup => "E041",
            DiagnosticCode::UnsupportedBackupVersion => "E042",

            DiagnosticCode::WriteFailed => "E050",

            DiagnosticCode::AddonNotInSource => "W060",

            DiagnosticCode::NothingToSync => "I070",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiagnosticCode::PathNotFound => "Path not found",
            DiagnosticCode::InvalidJson => "Invalid JSON",
            DiagnosticCode::InvalidUtf8 => "Invalid UTF-8 encoding",

            DiagnosticCode::InvalidPointerSyntax => "Invalid JSON Pointer syntax",
            DiagnosticCode::PointerNotFound => "Pointer does not resolve",

            DiagnosticCode::InvalidSyncMode => "Invalid sync mode",
            DiagnosticCode::UnknownCompression => "Unknown compression format",
            DiagnosticCode::CompressionUnavailable => "Compression not available",
            DiagnosticCode::InvalidOperation => "Invalid sync operation",

            DiagnosticCode::MissingBundleField => "Missing bundle field",
            DiagnosticCode::TargetNotDevBundle => "Target is not a dev bundle",

            DiagnosticCode::BackupFailed => "Backup failed",
            DiagnosticCode::InvalidBackup => "Invalid backup file",
            DiagnosticCode::UnsupportedBackupVersion => "Unsupported backup version",

            DiagnosticCode::WriteFailed => "Write failed",

            DiagnosticCode::AddonNotInSource => "Addon not in source",

            DiagnosticCode::NothingToSync => "Nothing to sync",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub filename: Option<String>,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub description: String,
    pub advice: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, code: DiagnosticCode, description: String) -> Self {
        Self {
            filename: None,
            level,
            code,
            description,
            advice: None,
        }
    }

    pub fn fatal(code: DiagnosticCode, description: String) -> Self {
        Self::new(DiagnosticLevel::Fatal, code, description)
    }

    pub fn with_file(mut self, filename: String) -> Self {
        self.filename = Some(filename);
        self
    }

    pub fn with_advice(mut self, advice: String) -> Self {
        self.advice = Some(advice);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.level == DiagnosticLevel::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(filename) = &self.filename {
            write!(f, "{} - ", filename)?;
        }

        writeln!(
            f,
            "{} {}: {}",
            self.level,
            self.code.as_str(),
            self.code.title()
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.description)?;

        if let Some(advice) = &self.advice {
            writeln!(f)?;
            writeln!(f, "{}", advice)?;
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, diagnostics: I) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_fatal())
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
