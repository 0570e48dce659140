use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing column `{column}` in input header")]
    MissingColumn { column: String },

    #[error("Invalid quantity {value:?} on line {line}: expected a non-negative integer")]
    InvalidQuantity { line: usize, value: String },

    #[error("CSV parse error (line {line}): {message}")]
    CsvParse { line: usize, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid definitions: {message}")]
    InvalidDefinitions { message: String },

    #[error("Missing GTFS input: {} does not exist", path.display())]
    MissingGtfsFile { path: PathBuf },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
