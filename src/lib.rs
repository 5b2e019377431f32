// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Record Proxy library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Record search proxy.
//!
//! The proxy accepts `GET` requests whose query string describes a record search (`count`,
//! `sortby`, `sortdirection`, `format`), forwards an equivalent request to the upstream paged
//! search API, and re-encodes the records it gets back in one of three formats:
//!
//! * `json`: an array of `{"name", "uri"}` objects,
//! * `csv`: `name|uri` lines,
//! * `neoshex`: a hex-indexed layout built for readers that cannot parse JSON (see [neoshex]).
//!
//! Query parameters are validated before anything is sent upstream. Failures are reported as a
//! `{"code", "message"}` JSON body with a matching HTTP status, produced by the
//! [server::add_error_body] middleware from a [ProxyError].
//!
//! The `server` and `client` modules contain the `tide` application and the `surf` client for the
//! upstream search respectively. Neither keeps state between requests.

pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod neoshex;
pub mod query;
pub mod server;
pub mod types;

pub use client::UpstreamClient;
pub use config::ProxyConfig;
pub use encoding::{encode, Encoded, OutputFormat};
pub use error::*;
pub use query::{QueryParams, ValidatedQuery};
pub use server::{app, Proxy};
pub use types::*;
