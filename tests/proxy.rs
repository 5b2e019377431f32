//! End-to-end tests of the proxy.
//!
//! A tide app plays the upstream search. Both the proxy's upstream client and the test client
//! talk to their tide apps in memory, so no network access is needed.

use futures::TryStreamExt;
use record_proxy::{app, neoshex, Proxy, ProxyError, UpstreamClient};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use surf::{Client, StatusCode, Url};
use tide::{Body, Request, Response};

const UPSTREAM_URL: &str = "http://upstream.test/api/records/pagedSearch";

#[derive(Clone)]
struct MockUpstream {
    status: StatusCode,
    body: Value,
    delay: Option<Duration>,
    body_delay: Option<Duration>,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<Value>>>,
}

impl MockUpstream {
    fn new(body: Value) -> Self {
        Self {
            status: StatusCode::Ok,
            body,
            delay: None,
            body_delay: None,
            hits: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    fn failing(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::new(json!({"error": "down for maintenance"}))
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Option<Value> {
        self.last_request.lock().unwrap().clone()
    }

    fn client(&self) -> Client {
        let mut upstream = tide::with_state(self.clone());
        upstream
            .at("/api/records/pagedSearch")
            .post(|mut req: Request<MockUpstream>| async move {
                let body: Value = req.body_json().await?;
                let state = req.state();
                if let Some(delay) = state.delay {
                    async_std::task::sleep(delay).await;
                }
                state.hits.fetch_add(1, Ordering::SeqCst);
                *state.last_request.lock().unwrap() = Some(body);
                let mut res = Response::new(state.status);
                match state.body_delay {
                    Some(delay) => {
                        // Send half the body now and the rest after `delay`.
                        let body = serde_json::to_vec(&state.body)?;
                        let (head, tail) = body.split_at(body.len() / 2);
                        let (sender, receiver) = async_std::channel::unbounded();
                        let _ = sender.try_send(Ok::<_, std::io::Error>(head.to_vec()));
                        let tail = tail.to_vec();
                        async_std::task::spawn(async move {
                            async_std::task::sleep(delay).await;
                            let _ = sender.send(Ok(tail)).await;
                        });
                        res.set_body(Body::from_reader(receiver.into_async_read(), None));
                    }
                    None => res.set_body(Body::from_json(&state.body)?),
                }
                Ok(res)
            });
        Client::with_http_client(upstream)
    }
}

fn proxy_client(upstream: &MockUpstream) -> Client {
    proxy_client_with_timeout(upstream, None)
}

fn proxy_client_with_timeout(upstream: &MockUpstream, timeout: Option<Duration>) -> Client {
    let url = Url::parse(UPSTREAM_URL).unwrap();
    let upstream = UpstreamClient::with_client(upstream.client(), url).timeout(timeout);
    Client::with_http_client(app(Proxy::with_upstream(upstream)))
}

fn sample_records() -> Value {
    json!({
        "records": [
            {"id": "R-1", "ownerId": "U-alice", "name": "a", "visits": 10},
            {"id": "R-22", "ownerId": "U-bob", "name": "bb", "visits": 3},
            {"id": "R-3", "ownerId": "U-carol", "name": "", "visits": 1},
        ]
    })
}

async fn get(client: &Client, query: &str) -> (StatusCode, Option<String>, String) {
    let mut res = client
        .get(format!("http://proxy.test/{}", query))
        .await
        .unwrap();
    let content_type = res.content_type().map(|mime| mime.essence().to_string());
    let body = res.body_string().await.unwrap();
    (res.status(), content_type, body)
}

#[async_std::test]
async fn test_default_query() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, content_type, body) = get(&client, "").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(content_type.as_deref(), Some("text/plain"));
    assert_eq!(
        upstream.last_request(),
        Some(json!({"count": 1000000, "sortBy": 3, "sortDirection": 1}))
    );

    let records = neoshex::decode(&body).unwrap();
    let pairs: Vec<_> = records.iter().map(|r| (r.name(), r.uri())).collect();
    assert_eq!(
        pairs,
        vec![
            ("a", "neosrec:///U-alice/R-1"),
            ("bb", "neosrec:///U-bob/R-22"),
            ("unknown", "neosrec:///U-carol/R-3"),
        ]
    );
    assert_eq!(&body[0..16], "0000000300000000");
}

#[async_std::test]
async fn test_query_is_forwarded_zero_based() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, _, _) = get(&client, "?count=25&sortby=1&sortdirection=1&format=json").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(
        upstream.last_request(),
        Some(json!({"count": "25", "sortBy": 0, "sortDirection": 0}))
    );
}

#[async_std::test]
async fn test_json_format() {
    let upstream = MockUpstream::new(json!({
        "records": [{"id": "r1", "ownerId": "o1", "name": "alice"}]
    }));
    let client = proxy_client(&upstream);

    let (status, content_type, body) = get(&client, "?format=json").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, r#"[{"name":"alice","uri":"neosrec:///o1/r1"}]"#);
}

#[async_std::test]
async fn test_csv_format() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, content_type, body) = get(&client, "?format=csv&sortby=5").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
    assert_eq!(
        body,
        "a|neosrec:///U-alice/R-1\nbb|neosrec:///U-bob/R-22\nunknown|neosrec:///U-carol/R-3"
    );
}

#[async_std::test]
async fn test_empty_results() {
    let upstream = MockUpstream::new(json!({"records": []}));
    let client = proxy_client(&upstream);

    assert_eq!(get(&client, "").await.2, "0000000000000000");
    assert_eq!(get(&client, "?format=json").await.2, "[]");
    assert_eq!(get(&client, "?format=csv").await.2, "");
}

#[async_std::test]
async fn test_any_path_is_served() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, content_type, _) = get(&client, "records/search?format=csv").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
}

#[async_std::test]
async fn test_invalid_parameters_are_rejected_before_upstream() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    for query in &[
        "?sortby=0",
        "?sortby=7",
        "?sortby=-3",
        "?sortby=visits",
        "?sortdirection=0",
        "?sortdirection=3",
        "?format=xml",
        "?format=JSON",
    ] {
        let (status, content_type, body) = get(&client, query).await;
        assert_eq!(status, StatusCode::BadRequest, "{}", query);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["code"], 400, "{}", query);
        assert!(body["message"].as_str().unwrap().contains("parameter is invalid"));
    }
    assert_eq!(upstream.hits(), 0);
}

#[async_std::test]
async fn test_first_invalid_parameter_is_reported() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (_, _, body) = get(&client, "?sortby=9&sortdirection=9&format=xml").await;
    let err: ProxyError = serde_json::from_str(&body).unwrap();
    assert_eq!(
        err,
        ProxyError::InvalidParameter {
            message: "sortBy parameter is invalid. range is between 1 and 6. (CreationDate=1, LastUpdateDate=2, FirstPublishTime=3, TotalVisits=4, Name=5, Random=6)".into()
        }
    );

    let (_, _, body) = get(&client, "?sortdirection=9&format=xml").await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body["message"],
        "sortDirection parameter is invalid. range is between 1 and 2. (Ascending=1, Descending=2)"
    );
}

#[async_std::test]
async fn test_upstream_error_status() {
    let upstream = MockUpstream::failing(StatusCode::ServiceUnavailable);
    let client = proxy_client(&upstream);

    let (status, _, body) = get(&client, "?format=json").await;
    assert_eq!(status, StatusCode::BadGateway);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["code"], 502);
    assert_eq!(upstream.hits(), 1);
}

#[async_std::test]
async fn test_upstream_without_records() {
    let upstream = MockUpstream::new(json!({"results": []}));
    let client = proxy_client(&upstream);

    let (status, content_type, body) = get(&client, "").await;
    assert_eq!(status, StatusCode::BadGateway);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let err: ProxyError = serde_json::from_str(&body).unwrap();
    assert!(matches!(err, ProxyError::UpstreamFailure { .. }));
}

#[async_std::test]
async fn test_upstream_timeout() {
    let upstream = MockUpstream {
        delay: Some(Duration::from_secs(5)),
        ..MockUpstream::new(sample_records())
    };
    let client = proxy_client_with_timeout(&upstream, Some(Duration::from_millis(50)));

    let (status, _, body) = get(&client, "?format=csv").await;
    assert_eq!(status, StatusCode::BadGateway);
    let err: ProxyError = serde_json::from_str(&body).unwrap();
    assert!(err.message().starts_with("no response within"));
}

#[async_std::test]
async fn test_upstream_timeout_covers_body() {
    let upstream = MockUpstream {
        body_delay: Some(Duration::from_secs(5)),
        ..MockUpstream::new(sample_records())
    };
    let client = proxy_client_with_timeout(&upstream, Some(Duration::from_millis(50)));

    let (status, _, body) = get(&client, "?format=json").await;
    assert_eq!(status, StatusCode::BadGateway);
    let err: ProxyError = serde_json::from_str(&body).unwrap();
    assert!(err.message().starts_with("no response within"));
    assert_eq!(upstream.hits(), 1);
}

#[async_std::test]
async fn test_slow_body_without_timeout_is_served() {
    let upstream = MockUpstream {
        body_delay: Some(Duration::from_millis(20)),
        ..MockUpstream::new(sample_records())
    };
    let client = proxy_client(&upstream);

    let (status, _, body) = get(&client, "?format=csv").await;
    assert_eq!(status, StatusCode::Ok);
    assert!(body.starts_with("a|neosrec:///U-alice/R-1\n"));
}

#[async_std::test]
async fn test_repeated_keys_use_first_value() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, content_type, _) =
        get(&client, "?sortby=2&sortby=9&format=csv&format=xml&count=5&count=7").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
    assert_eq!(
        upstream.last_request(),
        Some(json!({"count": "5", "sortBy": 1, "sortDirection": 1}))
    );
}

#[async_std::test]
async fn test_bracketed_keys_are_ignored() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, content_type, _) = get(&client, "?format[]=csv&sortby[0]=9").await;
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(content_type.as_deref(), Some("text/plain"));
    assert_eq!(
        upstream.last_request(),
        Some(json!({"count": 1000000, "sortBy": 3, "sortDirection": 1}))
    );
}

#[async_std::test]
async fn test_undecodable_value_gets_fixed_message() {
    let upstream = MockUpstream::new(sample_records());
    let client = proxy_client(&upstream);

    let (status, _, body) = get(&client, "?format=%FF").await;
    assert_eq!(status, StatusCode::BadRequest);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body["message"],
        "format parameter is invalid. available options are json, csv and neoshex"
    );
    assert_eq!(upstream.hits(), 0);
}
