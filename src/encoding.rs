//! Output encodings for a list of records.

use crate::error::ProxyError;
use crate::neoshex;
use crate::types::RecordRef;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator between name and uri in the csv encoding. It is not escaped.
pub const CSV_DELIMITER: char = '|';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Json,
    Csv,
    Neoshex,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Neoshex => "neoshex",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Neoshex => "text/plain",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Neoshex
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    /// Exact, case-sensitive match on `json`, `csv` or `neoshex`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "neoshex" => Ok(Self::Neoshex),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// An encoded response payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoded {
    pub content_type: &'static str,
    pub body: String,
}

/// Encode `records` in `format`. The output depends only on the arguments.
pub fn encode(format: OutputFormat, records: &[RecordRef]) -> Result<Encoded, ProxyError> {
    let body = match format {
        OutputFormat::Json => encode_json(records)?,
        OutputFormat::Csv => encode_csv(records),
        OutputFormat::Neoshex => neoshex::encode(records),
    };
    Ok(Encoded {
        content_type: format.content_type(),
        body,
    })
}

/// A JSON array of `{"name", "uri"}` objects.
pub fn encode_json(records: &[RecordRef]) -> Result<String, ProxyError> {
    serde_json::to_string(records).map_err(|err| ProxyError::Internal {
        message: format!("unable to serialize records: {}", err),
    })
}

/// One `name|uri` line per record, joined by `\n` with no trailing newline and no header.
pub fn encode_csv(records: &[RecordRef]) -> String {
    records
        .iter()
        .map(|record| format!("{}{}{}", record.name(), CSV_DELIMITER, record.uri()))
        .join("\n")
}
