use thiserror::Error;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors surfaced by the reader. `open` fails with the footer and schema
/// variants, `read` with the column and materialization variants.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Corrupt footer: {0}")]
    CorruptFooter(String),

    #[error("Corrupt schema: {0}")]
    CorruptSchema(String),

    #[error("Column read failed for '{path}': {reason}")]
    ColumnRead { path: String, reason: String },

    #[error("Materialization failed: {0}")]
    Materialize(String),

    #[error("Invalid reader configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    pub fn column_read(path: &str, reason: impl Into<String>) -> Self {
        ReaderError::ColumnRead {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// The file cannot be trusted: trailer, schema or column bytes are broken.
    pub fn is_file_corruption(&self) -> bool {
        matches!(
            self,
            ReaderError::CorruptFooter(_)
                | ReaderError::CorruptSchema(_)
                | ReaderError::ColumnRead { .. }
        )
    }

    /// The file is fine but the requested record shape does not match it.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, ReaderError::Materialize(_))
    }

    pub fn log_error(&self) {
        match self {
            ReaderError::CorruptFooter(e) => {
                error!("Corrupt footer: {}", e);
                debug!("Corrupt footer details: {:?}", e);
            }
            ReaderError::CorruptSchema(e) => {
                error!("Corrupt schema: {}", e);
                debug!("Corrupt schema details: {:?}", e);
            }
            ReaderError::ColumnRead { path, reason } => {
                error!("Column read failed for {}: {}", path, reason);
                debug!("Column read error details: path={:?} reason={:?}", path, reason);
            }
            ReaderError::Materialize(e) => {
                error!("Materialization failed: {}", e);
                debug!("Materialization error details: {:?}", e);
            }
            ReaderError::InvalidConfig(e) => {
                error!("Invalid reader configuration: {}", e);
            }
            ReaderError::Io(e) => {
                error!("I/O error: {}", e);
                debug!("I/O error details: {:?}", e);
            }
        }
    }
}

/// Failures of the compact protocol decoder. Callers map these into the
/// reader error that fits the bytes being decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThriftError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("varint overflow at byte {0}")]
    VarintOverflow(usize),

    #[error("invalid compact type {0}")]
    InvalidType(u8),

    #[error("nesting deeper than {0}")]
    TooDeep(usize),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("missing required field {field} in {strukt}")]
    MissingField {
        strukt: &'static str,
        field: &'static str,
    },

    #[error("invalid value {value} for {what}")]
    InvalidValue { what: &'static str, value: i64 },
}

/// Failures inside one column chunk. The column buffer attaches the leaf path
/// and surfaces them as `ReaderError::ColumnRead`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("unsupported encoding {0}")]
    UnsupportedEncoding(String),

    #[error("unsupported codec {0}")]
    UnsupportedCodec(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("page CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },

    #[error("invalid page header: {0}")]
    PageHeader(#[from] ThriftError),

    #[error("{0}")]
    Invalid(String),
}
