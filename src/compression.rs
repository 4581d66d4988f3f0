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

//! Optional compression of backup files.
//!
//! The format is chosen by file extension, so a backup can always be read
//! back without extra flags. Builds without the `compression` feature still
//! understand the extensions and report `CompressionUnavailable` instead of
//! misreading compressed bytes as JSON.

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
    Brotli,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
            Compression::Brotli => "brotli",
        }
    }

    /// File name suffix appended after `.json`, including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Zstd => ".zst",
            Compression::Brotli => ".br",
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Compression {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") => Compression::Zstd,
            Some("br") => Compression::Brotli,
            _ => Compression::None,
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
        match self {
            Compression::None => Ok(data.to_vec()),
            _ => codec::compress(*self, data),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
        match self {
            Compression::None => Ok(data.to_vec()),
            _ => codec::decompress(*self, data),
        }
    }
}

impl FromStr for Compression {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "zstd" | "zst" => Ok(Compression::Zstd),
            "brotli" | "br" => Ok(Compression::Brotli),
            _ => Err(Diagnostic::fatal(
                DiagnosticCode::UnknownCompression,
                format!("I don't know the compression format '{}'.", s),
            )
            .with_advice("Use one of: none, gzip, zstd, brotli".to_string())),
        }
    }
}

#[cfg(feature = "compression")]
mod codec {
    use super::Compression;
    use crate::diagnostics::{Diagnostic, DiagnosticCode};
    use std::io::{Read, Write};

    const BROTLI_BUFFER: usize = 4096;
    const BROTLI_QUALITY: u32 = 9;
    const BROTLI_WINDOW: u32 = 22;
    const ZSTD_LEVEL: i32 = 3;

    fn compress_failed(format: Compression, error: std::io::Error) -> Diagnostic {
        Diagnostic::fatal(
            DiagnosticCode::BackupFailed,
            format!("I couldn't compress {} data: {}", format.as_str(), error),
        )
    }

    fn decompress_failed(format: Compression, error: std::io::Error) -> Diagnostic {
        Diagnostic::fatal(
            DiagnosticCode::InvalidBackup,
            format!("I couldn't decompress this file as {}: {}", format.as_str(), error),
        )
        .with_advice(
            "The file extension decides the compression format. \
             Check that the file wasn't renamed or truncated."
                .to_string(),
        )
    }

    pub(super) fn compress(format: Compression, data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
        let result = match format {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data).and_then(|_| encoder.finish())
            }
            Compression::Zstd => zstd::encode_all(data, ZSTD_LEVEL),
            Compression::Brotli => {
                let mut output = Vec::new();
                {
                    let mut writer = brotli::CompressorWriter::new(
                        &mut output,
                        BROTLI_BUFFER,
                        BROTLI_QUALITY,
                        BROTLI_WINDOW,
                    );
                    writer.write_all(data).map_err(|e| compress_failed(format, e))?;
                }
                Ok(output)
            }
        };
        result.map_err(|e| compress_failed(format, e))
    }

    pub(super) fn decompress(format: Compression, data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
        let mut output = Vec::new();
        let result = match format {
            Compression::None => {
                output.extend_from_slice(data);
                Ok(())
            }
            Compression::Gzip => flate2::read::GzDecoder::new(data)
                .read_to_end(&mut output)
                .map(|_| ()),
            Compression::Zstd => zstd::decode_all(data).map(|decoded| output = decoded),
            Compression::Brotli => brotli::Decompressor::new(data, BROTLI_BUFFER)
                .read_to_end(&mut output)
                .map(|_| ()),
        };
        result.map(|_| output).map_err(|e| decompress_failed(format, e))
    }
}

#[cfg(not(feature = "compression"))]
mod codec {
    use super::Compression;
    use crate::diagnostics::{Diagnostic, DiagnosticCode};

    fn unavailable(format: Compression) -> Diagnostic {
        Diagnostic::fatal(
            DiagnosticCode::CompressionUnavailable,
            format!("This build of bundle-sync can't handle {} data.", format.as_str()),
        )
        .with_advice("Rebuild with the 'compression' feature enabled.".to_string())
    }

    pub(super) fn compress(format: Compression, _data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
        Err(unavailable(format))
    }

    pub(super) fn decompress(format: Compression, _data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
        Err(unavailable(format))
    }
}
