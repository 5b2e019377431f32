use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::query::ValidatedQuery;
use crate::types::{RecordRef, SearchRequest, SearchResponse};
use futures::future::BoxFuture;
use futures::prelude::*;
use std::time::Duration;
use surf::{middleware::Next, Client, Request, Response, Url};
use tracing::{event, Level};

/// Turn a non-success upstream response into an error.
pub async fn response_to_result(res: Response) -> surf::Result<Response> {
    if res.status().is_success() {
        Ok(res)
    } else {
        let status = res.status();
        Err(surf::Error::from_str(
            status,
            format!("upstream responded with status {}", status),
        ))
    }
}

/// Client middleware which turns responses with non-success statuses into errors.
///
/// If the request fails without producing a response at all, the [surf::Error] from the failed
/// request is passed through.
pub fn reject_error_status(
    req: Request,
    client: Client,
    next: Next<'_>,
) -> BoxFuture<'_, surf::Result<Response>> {
    Box::pin(next.run(req, client).and_then(response_to_result))
}

/// Client for the upstream paged record search.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client,
    url: Url,
    timeout: Option<Duration>,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Self {
        Self::with_client(Client::new(), config.upstream_url.clone())
            .timeout(config.upstream_timeout)
    }

    /// Search `url` through an existing HTTP client.
    pub fn with_client(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            timeout: None,
        }
    }

    /// Give up on searches that take longer than `timeout`. `None` waits indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run one upstream search for `query` and project the results to [RecordRef]s.
    ///
    /// Every failure, including a body without a `records` array, is reported as
    /// [ProxyError::UpstreamFailure].
    pub async fn search(&self, query: &ValidatedQuery) -> Result<Vec<RecordRef>, ProxyError> {
        let body = SearchRequest::from(query);
        event!(Level::DEBUG, "--> upstream search {}", body);

        let req = self
            .client
            .post(self.url.as_str())
            .middleware(reject_error_status)
            .body_json(&body)
            .map_err(upstream_failure)?;
        // The timeout covers reading the body as well as the response head.
        let exchange = async {
            let mut res = req.await?;
            res.body_json::<SearchResponse>().await
        };
        let payload = match self.timeout {
            Some(timeout) => async_std::future::timeout(timeout, exchange)
                .await
                .map_err(|_| ProxyError::UpstreamFailure {
                    message: format!("no response within {:?}", timeout),
                })?,
            None => exchange.await,
        }
        .map_err(upstream_failure)?;

        event!(
            Level::DEBUG,
            "<-- upstream returned {} records",
            payload.records.len()
        );
        Ok(payload.records.into_iter().map(RecordRef::from).collect())
    }
}

fn upstream_failure(err: surf::Error) -> ProxyError {
    ProxyError::UpstreamFailure {
        message: err.to_string(),
    }
}
