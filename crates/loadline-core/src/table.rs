//! Header + records view over delimited text (patronage files, GTFS tables, positions files).

use crate::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line the record starts on.
    pub line: usize,
    pub fields: Vec<String>,
}

impl Record {
    /// Field at `idx`, or `""` when the record is short.
    pub fn get(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Parses `text`, picking the delimiter from the header line.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self::parse_with_delimiter(text, detect_delimiter(text))
    }

    pub fn parse_with_delimiter(text: &str, delimiter: u8) -> Result<Self> {
        let mut rows = Vec::new();
        for (idx, result) in reader(text, delimiter).records().enumerate() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map_or(idx + 1, |p| p.line() as usize);
            let fields: Vec<String> = record.iter().map(str::to_string).collect();
            if fields.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows.push(Record { line, fields });
        }

        let mut it = rows.into_iter();
        let Some(header) = it.next() else {
            return Ok(Self::default());
        };
        let header = header
            .fields
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        let width = header.len();
        let records = it
            .map(|mut r| {
                if r.fields.len() < width {
                    r.fields.resize(width, String::new());
                }
                r
            })
            .collect();

        Ok(Self { header, records })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the header cell named `name`.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.column_opt(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    pub fn column_opt(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Comma-separated `header` then `rows`, `\n`-terminated, quoting only where needed.
pub fn write_csv<R, F, S>(header: &[&str], rows: R) -> Result<String>
where
    R: IntoIterator<Item = F>,
    F: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::CsvParse {
        line: 0,
        message: e.to_string(),
    })
}

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

fn reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// The candidate that splits the header into the most fields, quotes respected.
/// Ties go to the earlier candidate; a single-column header reads as comma-separated.
fn detect_delimiter(text: &str) -> u8 {
    let mut best = (b',', 1);
    for delimiter in DELIMITERS {
        let width = reader(text, delimiter)
            .records()
            .next()
            .and_then(|r| r.ok())
            .map_or(0, |r| r.len());
        if width > best.1 {
            best = (delimiter, width);
        }
    }
    best.0
}

fn csv_error(err: csv::Error) -> Error {
    Error::CsvParse {
        line: err.position().map_or(0, |p| p.line() as usize),
        message: err.to_string(),
    }
}
