//! Readers for the raw little-endian record formats of the instrument tables.

use crate::error::{self, Error};
use crate::util::Result;
use snafu::ResultExt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Size of the record marker that Fortran writes in front of unformatted records.
pub const FORTRAN_HEADER_BYTES: u64 = 4;

/// A buffered reader over a binary table file that remembers its path for error reporting.
pub struct BinaryTableReader {
    path: PathBuf,
    reader: BufReader<File>,
    values_read: usize,
}

impl BinaryTableReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).context(error::TableIo { path })?;
        Ok(Self {
            path: path.to_owned(),
            reader: BufReader::new(file),
            values_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn skip_fortran_header(&mut self) -> Result<()> {
        self.seek(FORTRAN_HEADER_BYTES)
    }

    /// Positions the reader at an absolute byte `offset`.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .context(error::TableIo { path: &self.path })?;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0; N];
        match self.reader.read_exact(&mut buffer) {
            Ok(()) => {
                self.values_read += 1;
                Ok(buffer)
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::UnexpectedEndOfTable {
                path: self.path.clone(),
                values_read: self.values_read,
            }),
            Err(source) => Err(Error::TableIo {
                source,
                path: self.path.clone(),
            }),
        }
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    /// Reads `count` consecutive `f32` values and widens them.
    pub fn read_f32_vec(&mut self, count: usize) -> Result<Vec<f64>> {
        (0..count)
            .map(|_| self.read_f32().map(f64::from))
            .collect()
    }

    /// Returns `true` if no further byte can be read.
    pub fn at_end(&mut self) -> Result<bool> {
        let mut next_byte = [0_u8; 1];
        let position = self
            .reader
            .stream_position()
            .context(error::TableIo { path: &self.path })?;
        let n = self
            .reader
            .read(&mut next_byte)
            .context(error::TableIo { path: &self.path })?;
        self.seek(position)?;
        Ok(n == 0)
    }
}

/// Serializes `f32` values in the byte order the readers expect. Used by table writers and tests.
pub fn f32_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Reads a whole text table and returns its whitespace separated tokens line by line.
pub fn read_text_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path).context(error::TableIo { path })?;
    Ok(content
        .lines()
        .map(|line| line.split_whitespace().map(str::to_owned).collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect())
}

/// Parses a numeric token of a text table.
pub fn parse_token(table: &'static str, token: &str) -> Result<f64> {
    token.parse::<f64>().map_err(|_| Error::MalformedTable {
        table,
        reason: format!("`{token}` is not a number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn it_reads_little_endian_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 0, 0]).unwrap();
        file.write_all(&f32_le_bytes(&[1.5, -2.0])).unwrap();
        file.write_all(&7_i16.to_le_bytes()).unwrap();
        file.flush().unwrap();

        let mut reader = BinaryTableReader::open(file.path()).unwrap();
        reader.skip_fortran_header().unwrap();
        assert_eq!(reader.read_f32_vec(2).unwrap(), vec![1.5, -2.0]);
        assert_eq!(reader.read_i16().unwrap(), 7);
        assert!(reader.at_end().unwrap());
    }

    #[test]
    fn it_reports_truncated_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&f32_le_bytes(&[1.0])).unwrap();
        file.flush().unwrap();

        let mut reader = BinaryTableReader::open(file.path()).unwrap();
        assert!(reader.read_f32().is_ok());
        assert!(matches!(
            reader.read_f32(),
            Err(Error::UnexpectedEndOfTable { values_read: 1, .. })
        ));
    }

    #[test]
    fn it_splits_text_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 2 3\n\n  4.5   6").unwrap();
        file.flush().unwrap();

        let rows = read_text_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["4.5".to_owned(), "6".to_owned()]);
        assert!(parse_token("test", "x").is_err());
    }
}
