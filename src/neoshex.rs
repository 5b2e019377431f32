//! The neoshex record list layout.
//!
//! Every integer is written as lowercase hex, zero-padded to [PADDING] characters. A buffer is
//!
//! ```text
//! count | reserved (0) | end[0] .. end[count-1] | block[0] .. block[count-1]
//! ```
//!
//! where `block[i]` is `hex(len(name)) hex(len(uri)) name uri` and `end[i]` is the total length
//! of blocks `0..=i`. Lengths and offsets are counted in UTF-16 code units, which for ASCII text
//! is the same as bytes. A reader can locate any block from the offset table alone, without
//! walking the blocks in front of it.
//!
//! [Neoshex] is strict: integer fields must be lowercase hex digits only.

use crate::types::RecordRef;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::string::FromUtf16Error;

/// Width of every integer field.
pub const PADDING: usize = 8;

/// Value of the reserved header field.
pub const RESERVED: usize = 0;

const HEADER_LEN: usize = 2 * PADDING;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum NeoshexError {
    #[snafu(display("buffer ends inside {} at offset {}", what, offset))]
    Truncated { what: &'static str, offset: usize },

    #[snafu(display("{} at offset {} is not a hex integer", what, offset))]
    BadInteger { what: &'static str, offset: usize },

    #[snafu(display("reserved header field is {}, expected 0", value))]
    Reserved { value: usize },

    #[snafu(display("offset table entry {} ({}) is before the previous entry ({})", index, end, previous))]
    OffsetOrder {
        index: usize,
        end: usize,
        previous: usize,
    },

    #[snafu(display("data section is {} units long but the offset table covers {}", actual, expected))]
    DataLength { expected: usize, actual: usize },

    #[snafu(display("block {} declares {} units of text but holds {}", index, declared, actual))]
    BlockLength {
        index: usize,
        declared: usize,
        actual: usize,
    },

    #[snafu(display("record {} does not exist, buffer holds {}", index, count))]
    NoSuchRecord { index: usize, count: usize },

    #[snafu(display("block {} holds invalid text: {}", index, source))]
    Text {
        index: usize,
        source: FromUtf16Error,
    },
}

/// Render `value` as a neoshex integer field.
///
/// Values needing more than [PADDING] digits are written at their natural width.
pub fn hex_field(value: usize) -> String {
    format!("{:0width$x}", value, width = PADDING)
}

/// Length of `text` as neoshex counts it.
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn block(record: &RecordRef) -> String {
    let mut block = hex_field(text_len(record.name()));
    block.push_str(&hex_field(text_len(record.uri())));
    block.push_str(record.name());
    block.push_str(record.uri());
    block
}

/// Encode `records` as a neoshex buffer, preserving their order.
pub fn encode(records: &[RecordRef]) -> String {
    let mut out = String::with_capacity(PADDING * (2 + records.len()));
    out.push_str(&hex_field(records.len()));
    out.push_str(&hex_field(RESERVED));

    let mut data = String::new();
    let mut end = 0;
    for record in records {
        let block = block(record);
        end += text_len(&block);
        out.push_str(&hex_field(end));
        data.push_str(&block);
    }
    out.push_str(&data);
    out
}

/// A parsed neoshex buffer giving indexed access to its records.
///
/// Parsing checks the header and offset table; blocks are decoded on access.
#[derive(Clone, Debug)]
pub struct Neoshex {
    units: Vec<u16>,
    ends: Vec<usize>,
    data_start: usize,
}

impl Neoshex {
    pub fn parse(buf: &str) -> Result<Self, NeoshexError> {
        let units: Vec<u16> = buf.encode_utf16().collect();
        let count = read_field(&units, 0, "record count")?;
        let reserved = read_field(&units, PADDING, "reserved field")?;
        ensure!(reserved == RESERVED, ReservedSnafu { value: reserved });

        let data_start = count
            .checked_mul(PADDING)
            .and_then(|table| table.checked_add(HEADER_LEN))
            .filter(|start| *start <= units.len())
            .context(TruncatedSnafu {
                what: "offset table",
                offset: units.len(),
            })?;

        let mut ends = Vec::with_capacity(count);
        let mut previous = 0;
        for index in 0..count {
            let end = read_field(&units, HEADER_LEN + index * PADDING, "offset table")?;
            ensure!(
                end >= previous,
                OffsetOrderSnafu {
                    index,
                    end,
                    previous
                }
            );
            ends.push(end);
            previous = end;
        }

        let actual = units.len() - data_start;
        ensure!(
            actual == previous,
            DataLengthSnafu {
                expected: previous,
                actual
            }
        );

        Ok(Self {
            units,
            ends,
            data_start,
        })
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Decode record `index` using the offset table.
    pub fn record(&self, index: usize) -> Result<RecordRef, NeoshexError> {
        let end = *self.ends.get(index).context(NoSuchRecordSnafu {
            index,
            count: self.len(),
        })?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        let block = &self.units[self.data_start + start..self.data_start + end];

        let name_len = read_field(block, 0, "name length")?;
        let uri_len = read_field(block, PADDING, "uri length")?;
        let declared = HEADER_LEN + name_len + uri_len;
        ensure!(
            declared == block.len(),
            BlockLengthSnafu {
                index,
                declared,
                actual: block.len()
            }
        );

        let name = &block[HEADER_LEN..HEADER_LEN + name_len];
        let uri = &block[HEADER_LEN + name_len..];
        Ok(RecordRef::new(
            String::from_utf16(name).context(TextSnafu { index })?,
            String::from_utf16(uri).context(TextSnafu { index })?,
        ))
    }

    /// Decode every record in order.
    pub fn records(&self) -> Result<Vec<RecordRef>, NeoshexError> {
        (0..self.len()).map(|index| self.record(index)).collect()
    }
}

/// Decode a whole neoshex buffer.
pub fn decode(buf: &str) -> Result<Vec<RecordRef>, NeoshexError> {
    Neoshex::parse(buf)?.records()
}

fn read_field(units: &[u16], offset: usize, what: &'static str) -> Result<usize, NeoshexError> {
    let field = units
        .get(offset..offset + PADDING)
        .context(TruncatedSnafu { what, offset })?;
    field.iter().try_fold(0usize, |value, unit| {
        let digit = match *unit {
            unit @ 0x30..=0x39 => unit - 0x30,
            unit @ 0x61..=0x66 => unit - 0x61 + 10,
            _ => return BadIntegerSnafu { what, offset }.fail(),
        };
        Ok(value * 16 + usize::from(digit))
    })
}
