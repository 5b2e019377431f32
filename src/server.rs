// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Record Proxy library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::client::UpstreamClient;
use crate::config::ProxyConfig;
use crate::encoding::encode;
use crate::error::{server_error, Error, ProxyError};
use crate::query::QueryParams;
use futures::future::BoxFuture;
use tide::{Body, Next, Request, Response, StatusCode};
use tracing::{event, Level};

/// State shared by all requests. It holds no mutable data.
#[derive(Clone, Debug)]
pub struct Proxy {
    upstream: UpstreamClient,
}

impl Proxy {
    pub fn new(config: &ProxyConfig) -> Self {
        Self::with_upstream(UpstreamClient::new(config))
    }

    pub fn with_upstream(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }
}

fn proxy_error(error: ProxyError) -> tide::Error {
    server_error(error)
}

/// Build the proxy application. Searches are served on every path.
pub fn app(proxy: Proxy) -> tide::Server<Proxy> {
    let mut app = tide::with_state(proxy);
    app.with(trace::<Proxy>)
        .with(add_error_body::<Proxy, ProxyError>);
    app.at("/").get(search);
    app.at("/*path").get(search);
    app
}

/// Validate the query, run the upstream search and encode its records.
///
/// Validation happens before anything is sent upstream.
pub async fn search(req: Request<Proxy>) -> tide::Result {
    let params = QueryParams::from_pairs(req.url().query_pairs());
    let query = params.validate().map_err(proxy_error)?;
    let records = req
        .state()
        .upstream
        .search(&query)
        .await
        .map_err(proxy_error)?;
    let encoded = encode(query.format, &records).map_err(proxy_error)?;
    event!(
        Level::DEBUG,
        "encoded {} records as {}",
        records.len(),
        query.format
    );
    Ok(Response::builder(StatusCode::Ok)
        .body(encoded.body)
        .content_type(encoded.content_type)
        .build())
}

/// Server middleware which automatically populates the body of error responses.
///
/// If the response contains an error, the error is encoded into the [Error] type (either by
/// downcasting if the server has generated an instance of [Error], or by converting to a
/// [String] using [Display](std::fmt::Display) if the error can not be downcasted to [Error]).
/// The resulting [Error] is then serialized as JSON and used as the body of the response, whose
/// status is taken from [Error::status].
///
/// If the response does not contain an error, it is passed through unchanged.
pub fn add_error_body<'a, T: Clone + Send + Sync + 'static, E: Error>(
    req: Request<T>,
    next: Next<'a, T>,
) -> BoxFuture<'a, tide::Result> {
    Box::pin(async {
        let mut res = next.run(req).await;
        if let Some(error) = res.take_error() {
            let error = E::from_client_error(error);
            event!(Level::WARN, "responding with error: {}", error);
            Ok(Response::builder(error.status())
                .body(Body::from_json(&error)?)
                .content_type(tide::http::mime::JSON)
                .build())
        } else {
            Ok(res)
        }
    })
}

/// Server middleware which logs requests and responses.
pub fn trace<'a, T: Clone + Send + Sync + 'static>(
    req: Request<T>,
    next: Next<'a, T>,
) -> BoxFuture<'a, tide::Result> {
    Box::pin(async {
        event!(
            Level::INFO,
            "<-- received request {{method: {}, url: {}}}",
            req.method(),
            req.url(),
        );
        let res = next.run(req).await;
        event!(
            Level::INFO,
            "--> responding with {{status: {}, content-type: {:?}, error: {:?}}}",
            res.status(),
            res.content_type(),
            res.error(),
        );
        Ok(res)
    })
}
