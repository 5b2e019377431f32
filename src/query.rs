// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Record Proxy library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Validation of the search query string.
//!
//! Parameters are checked in a fixed order (`sortby`, `sortdirection`, `format`) and the first
//! failing check is reported. `count` is never checked locally; it is handed to the upstream
//! search as given.

use crate::encoding::OutputFormat;
use crate::error::ProxyError;
use serde::{Deserialize, Serialize};

/// Value of `count` used when the caller does not supply one. The upstream treats it as "no
/// limit".
pub const DEFAULT_COUNT: u64 = 1_000_000;

pub const INVALID_SORT_BY: &str = "sortBy parameter is invalid. range is between 1 and 6. (CreationDate=1, LastUpdateDate=2, FirstPublishTime=3, TotalVisits=4, Name=5, Random=6)";
pub const INVALID_SORT_DIRECTION: &str =
    "sortDirection parameter is invalid. range is between 1 and 2. (Ascending=1, Descending=2)";
pub const INVALID_FORMAT: &str =
    "format parameter is invalid. available options are json, csv and neoshex";

/// Raw, untrusted query parameters of a search request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub count: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub format: Option<String>,
}

/// The `count` forwarded to the upstream search.
///
/// A caller-supplied value is passed through verbatim; the upstream decides what it means.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Count {
    Limit(u64),
    Raw(String),
}

impl Default for Count {
    fn default() -> Self {
        Count::Limit(DEFAULT_COUNT)
    }
}

/// Sort keys understood by the upstream search, numbered as they are in the query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortField {
    CreationDate = 1,
    LastUpdateDate = 2,
    FirstPublishTime = 3,
    TotalVisits = 4,
    Name = 5,
    Random = 6,
}

impl SortField {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Self::CreationDate,
            2 => Self::LastUpdateDate,
            3 => Self::FirstPublishTime,
            4 => Self::TotalVisits,
            5 => Self::Name,
            6 => Self::Random,
            _ => return None,
        })
    }

    /// The 1-based code used in the query string.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl Default for SortField {
    fn default() -> Self {
        Self::TotalVisits
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending = 1,
    Descending = 2,
}

impl SortDirection {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Ascending),
            2 => Some(Self::Descending),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Descending
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Zero-based sort key, as the upstream numbers them.
    pub fn upstream_field(&self) -> u8 {
        self.field.code() - 1
    }

    /// Zero-based sort direction, as the upstream numbers them.
    pub fn upstream_direction(&self) -> u8 {
        self.direction.code() - 1
    }
}

/// A search request whose parameters passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub count: Count,
    pub sort: SortSpec,
    pub format: OutputFormat,
}

impl QueryParams {
    /// Collect the parameters from decoded query string pairs.
    ///
    /// The first occurrence of a key wins. Unknown keys, including bracketed ones such as
    /// `format[]`, are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "count" => &mut params.count,
                "sortby" => &mut params.sort_by,
                "sortdirection" => &mut params.sort_direction,
                "format" => &mut params.format,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    /// Check every parameter and substitute defaults for the missing ones.
    ///
    /// Empty values count as missing. The first failing check wins; later parameters are not
    /// looked at.
    pub fn validate(&self) -> Result<ValidatedQuery, ProxyError> {
        let field = match given(&self.sort_by) {
            Some(raw) => parse_leading_int(raw)
                .and_then(SortField::from_code)
                .ok_or_else(|| invalid(INVALID_SORT_BY))?,
            None => SortField::default(),
        };

        let direction = match given(&self.sort_direction) {
            Some(raw) => parse_leading_int(raw)
                .and_then(SortDirection::from_code)
                .ok_or_else(|| invalid(INVALID_SORT_DIRECTION))?,
            None => SortDirection::default(),
        };

        let format = match given(&self.format) {
            Some(raw) => raw
                .parse::<OutputFormat>()
                .map_err(|_| invalid(INVALID_FORMAT))?,
            None => OutputFormat::default(),
        };

        let count = match given(&self.count) {
            Some(raw) => Count::Raw(raw.to_string()),
            None => Count::default(),
        };

        Ok(ValidatedQuery {
            count,
            sort: SortSpec { field, direction },
            format,
        })
    }
}

fn given(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|raw| !raw.is_empty())
}

fn invalid(message: &str) -> ProxyError {
    ProxyError::InvalidParameter {
        message: message.to_string(),
    }
}

/// Parse the base-10 integer at the start of `raw`.
///
/// Leading whitespace and a single sign are accepted and anything after the digits is ignored,
/// so `"3abc"` parses as 3. Returns `None` if there are no digits or the value overflows.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value = rest[..digits].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}
