// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Record Proxy library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::query::{Count, ValidatedQuery};
use fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme of the locator synthesized for every record.
pub const RECORD_URI_SCHEME: &str = "neosrec";

/// Name given to records whose upstream name is empty or absent.
pub const UNKNOWN_NAME: &str = "unknown";

/// Request body for the upstream paged search endpoint.
///
/// Sort codes are zero-based here, unlike in the proxy's own query string.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub count: Count,
    pub sort_by: u8,
    pub sort_direction: u8,
}

impl From<&ValidatedQuery> for SearchRequest {
    fn from(query: &ValidatedQuery) -> Self {
        Self {
            count: query.count.clone(),
            sort_by: query.sort.upstream_field(),
            sort_direction: query.sort.upstream_direction(),
        }
    }
}

impl Display for SearchRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_as_json(self, f)
    }
}

/// The subset of an upstream record the proxy relies on. Other fields are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamRecord {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response body of the upstream paged search endpoint.
///
/// A body without a `records` array fails to deserialize.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResponse {
    pub records: Vec<UpstreamRecord>,
}

/// The `(name, uri)` projection of an upstream record that the encoders emit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RecordRef {
    name: String,
    uri: String,
}

impl RecordRef {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl From<UpstreamRecord> for RecordRef {
    fn from(record: UpstreamRecord) -> Self {
        let name = record
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let uri = format!(
            "{}:///{}/{}",
            RECORD_URI_SCHEME, record.owner_id, record.id
        );
        Self { name, uri }
    }
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_as_json(self, f)
    }
}

// Display implementation for types which serialize to JSON. Displays as a valid JSON object.
pub fn fmt_as_json<T: Serialize>(v: &T, f: &mut Formatter<'_>) -> fmt::Result {
    let string = serde_json::to_string(v).map_err(|_| fmt::Error)?;
    write!(f, "{}", string)
}
