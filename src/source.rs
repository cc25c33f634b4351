// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/source.rs - Input loader for pin tables and pinmux fragments.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `source` Module
 *
 * This module loads input files: pin tables (CSV or workbook) and pinmux
 * fragments. Inputs starting with the gzip magic are inflated transparently,
 * so `pinmux.csv.gz` or `before.dtsi.gz` can be passed as-is.
 *
 * ## Usage Example
 *
 * ```no_run
 * use pinmux::source::SourceFile;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let source = SourceFile::from_filename("before.dtsi.gz")?;
 *     println!("{}", source.text()?);
 *
 *     Ok(())
 * }
 * ```
 */

use std::fs::File;
use std::io::BufReader;
use std::io::prelude::*;
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt gzip stream: {0}")]
    Gzip(std::io::Error),
    #[error("input is not valid UTF-8")]
    NotUtf8,
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, SourceError> {
    let mut decoder = GzDecoder::new(data);
    let mut buffer = Vec::new();
    decoder
        .read_to_end(&mut buffer)
        .map_err(SourceError::Gzip)?;
    Ok(buffer)
}

/// The contents of an input file, inflated if it was gzip-compressed.
#[derive(Debug)]
pub struct SourceFile {
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn from_filename<P: AsRef<Path>>(filename: P) -> Result<Self, SourceError> {
        let file = File::open(filename)?;
        let mut reader = BufReader::new(file);

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;

        Self::from_bytes(buffer)
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Result<Self, SourceError> {
        let data = if buffer.starts_with(&GZIP_MAGIC) {
            decompress(&buffer)?
        } else {
            buffer
        };

        Ok(Self { data })
    }

    /// The contents as text, with a leading byte order mark removed.
    pub fn text(&self) -> Result<&str, SourceError> {
        let text = std::str::from_utf8(&self.data).map_err(|_| SourceError::NotUtf8)?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn plain_input_is_kept() {
        let source = SourceFile::from_bytes(b"common {\n};\n".to_vec()).unwrap();
        assert_eq!(source.text().unwrap(), "common {\n};\n");
    }

    #[test]
    fn gzip_input_is_inflated() {
        let source = SourceFile::from_bytes(gzip(b"GP1,spi1\n")).unwrap();
        assert_eq!(source.data, b"GP1,spi1\n");
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let mut data = gzip(b"a fairly long line of pin table text\n");
        let crc = data.len() - 8;
        data[crc] ^= 0xff;
        assert!(matches!(
            SourceFile::from_bytes(data),
            Err(SourceError::Gzip(_))
        ));
    }

    #[test]
    fn bom_and_utf8() {
        let source = SourceFile::from_bytes(b"\xef\xbb\xbfcommon".to_vec()).unwrap();
        assert_eq!(source.text().unwrap(), "common");

        let source = SourceFile::from_bytes(vec![0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(source.text(), Err(SourceError::NotUtf8)));
    }

    #[test]
    fn reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.csv.gz");
        std::fs::write(&path, gzip(b"x,y\n")).unwrap();
        assert_eq!(SourceFile::from_filename(&path).unwrap().data, b"x,y\n");

        assert!(matches!(
            SourceFile::from_filename(dir.path().join("missing.csv")),
            Err(SourceError::Io(_))
        ));
    }
}
