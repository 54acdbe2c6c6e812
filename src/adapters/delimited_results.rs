//! Delimited numeric text export of results tables.

use std::{fs, path::Path};

use tracing::info;

use crate::{Error, Result, surprisal::ResultsTable};

/// Writes a results table as delimited text with a header row.
///
/// Non-finite values are written as `nan`, `inf` and `-inf` so degenerate
/// steps survive the round trip.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedResultsWriter {
    delimiter: u8,
}

impl Default for DelimitedResultsWriter {
    fn default() -> Self {
        Self { delimiter: b' ' }
    }
}

impl DelimitedResultsWriter {
    /// # Errors
    ///
    /// The delimiter must be a single ASCII character.
    pub fn new(delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() {
            return Err(Error::config(format!(
                "delimiter must be an ASCII character, got {delimiter:?}"
            )));
        }
        Ok(Self {
            delimiter: delimiter as u8,
        })
    }

    pub fn delimiter(&self) -> char {
        self.delimiter as char
    }

    /// Write `table` to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, table: &ResultsTable, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::Io {
                operation: format!("create directory {parent:?}"),
                source,
            })?;
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;
        writer.write_record(table.header())?;
        for row in table.rows() {
            writer.write_record(row.into_iter().map(fmt_float))?;
        }
        writer.flush().map_err(|source| Error::Io {
            operation: format!("flush {path:?}"),
            source,
        })?;

        info!(path = %path.display(), rows = table.len(), label = table.label(), "wrote results");
        Ok(())
    }

    /// Read back a file produced by [`write`](Self::write) as header and rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a cell is not numeric.
    pub fn read(&self, path: &Path) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;
        let header = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    parse_float(cell).ok_or_else(|| Error::SerializationContext {
                        operation: format!("parse results file {path:?}"),
                        message: format!("'{cell}' is not a number"),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Ok((header, rows))
    }
}

/// Format a value, spelling out non-finite values.
fn fmt_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else {
        format!("{value}")
    }
}

fn parse_float(cell: &str) -> Option<f64> {
    match cell.trim() {
        "nan" => Some(f64::NAN),
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::surprisal::SurprisalRecord;

    fn table() -> ResultsTable {
        let mut table = ResultsTable::new("CD_SP", vec!["alpha_0".into(), "alpha_1".into()]);
        table.push(SurprisalRecord {
            t: 0,
            observation: 1,
            hidden: 0,
            predictive: 0.405_465_108_108_164_4,
            bayesian: 0.1,
            corrected: f64::NAN,
            parameters: vec![1.0, 2.0],
        });
        table.push(SurprisalRecord {
            t: 1,
            observation: 0,
            hidden: 1,
            predictive: f64::INFINITY,
            bayesian: 0.0,
            corrected: 0.25,
            parameters: vec![2.0, 2.0],
        });
        table
    }

    #[test]
    fn writes_header_and_special_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.txt");
        DelimitedResultsWriter::default().write(&table(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("t observation hidden PS BS CS alpha_0 alpha_1"));
        assert_eq!(lines.next(), Some("0 1 0 0.4054651081081644 0.1 nan 1 2"));
        assert_eq!(lines.next(), Some("1 0 1 inf 0 0.25 2 2"));
    }

    #[test]
    fn reads_back_what_it_wrote() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let writer = DelimitedResultsWriter::new(',').unwrap();
        writer.write(&table(), &path).unwrap();

        let (header, rows) = writer.read(&path).unwrap();
        assert_eq!(header, table().header());
        assert_eq!(rows.len(), 2);
        assert!(rows[0][5].is_nan());
        assert_eq!(rows[1][3], f64::INFINITY);
        assert_eq!(rows[1][6..], [2.0, 2.0]);
    }

    #[test]
    fn rejects_non_ascii_delimiter() {
        assert!(DelimitedResultsWriter::new('→').is_err());
        assert_eq!(DelimitedResultsWriter::new('\t').unwrap().delimiter(), '\t');
    }
}
