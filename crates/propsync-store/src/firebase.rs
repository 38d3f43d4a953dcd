//! Realtime Database REST backend
//!
//! - `write` → `PUT {url}/{path}.json`
//! - `patch` → `PATCH {url}/{path}.json`
//! - `read_once` → `GET {url}/{path}.json` (`null` body means absent)
//! - `subscribe` → `GET` with `Accept: text/event-stream`; `put` and `patch`
//!   events are mirrored into a local snapshot which is emitted after each one

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::path::StorePath;
use crate::sse::{EventParser, ServerEvent, StreamEvent};
use crate::store::{RemoteStore, SnapshotStream};
use crate::tree;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, Response, Url};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::time::Duration;

/// REST client for one database
#[derive(Debug, Clone)]
pub struct FirebaseStore {
    client: Client,
    stream_client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl FirebaseStore {
    /// Build a client from configuration
    ///
    /// # Errors
    /// [`StoreError::Config`] when the URL is missing or unusable
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let raw = config
            .database_url
            .as_deref()
            .ok_or_else(|| StoreError::Config("store.database_url is not set".to_string()))?;
        let base = Url::parse(raw)
            .map_err(|e| StoreError::Config(format!("invalid database url '{raw}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "database url '{raw}' cannot hold paths"
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Config(format!("http client: {e}")))?;
        let stream_client = Client::builder()
            .connect_timeout(config.timeout().max(Duration::from_secs(1)))
            .build()
            .map_err(|e| StoreError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            stream_client,
            base,
            auth_token: config.auth_token.clone(),
        })
    }

    /// REST URL for a path
    pub(crate) fn url_for(&self, path: &StorePath) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::Config("database url cannot hold paths".to_string()))?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                None => {
                    segments.push(".json");
                }
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
            }
        }
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    async fn send_write(
        &self,
        method: Method,
        path: &StorePath,
        body: &Value,
    ) -> Result<(), StoreError> {
        let url = self.url_for(path)?;
        tracing::debug!("{} {}", method, path);
        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::write(path, e.to_string()))?;
        check_status(response)
            .await
            .map_err(|reason| StoreError::write(path, reason))?;
        Ok(())
    }
}

/// Pass 2xx through; otherwise turn the body's `error` field into a reason
async fn check_status(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    if detail.is_empty() {
        Err(format!("HTTP {status}"))
    } else {
        Err(format!("HTTP {status}: {detail}"))
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.send_write(Method::PUT, path, &value).await
    }

    async fn patch(
        &self,
        path: &StorePath,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        for key in partial.keys() {
            path.child(key.as_str())?;
        }
        self.send_write(Method::PATCH, path, &Value::Object(partial))
            .await
    }

    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let url = self.url_for(path)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::read(path, e.to_string()))?;
        let response = check_status(response)
            .await
            .map_err(|reason| StoreError::read(path, reason))?;
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::read(path, e.to_string()))?;
        let value: Value = serde_json::from_str(&body).map_err(|source| StoreError::Decode {
            path: path.to_string(),
            source,
        })?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        let url = self.url_for(path)?;
        let response = self
            .stream_client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await
            .map_err(|e| StoreError::read(path, e.to_string()))?;
        let response = check_status(response)
            .await
            .map_err(|reason| StoreError::read(path, reason))?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        tracing::debug!("Event stream opened for {}", path);
        let mirror = StreamMirror::new(path.to_string(), body);
        let stream = futures::stream::unfold(mirror, |mut mirror| async move {
            let item = mirror.next_snapshot().await?;
            Some((item, mirror))
        });
        Ok(stream.boxed())
    }
}

/// Local copy of the subscribed location, advanced by stream events
struct StreamMirror {
    path: String,
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: EventParser,
    queue: VecDeque<ServerEvent>,
    snapshot: Value,
    finished: bool,
}

impl StreamMirror {
    fn new(path: String, body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> Self {
        Self {
            path,
            body,
            parser: EventParser::default(),
            queue: VecDeque::new(),
            snapshot: Value::Null,
            finished: false,
        }
    }

    /// Next emitted snapshot, `None` once the stream is over
    async fn next_snapshot(&mut self) -> Option<Result<Option<Value>, StoreError>> {
        if self.finished {
            return None;
        }
        loop {
            while let Some(event) = self.queue.pop_front() {
                if let Some(item) = self.apply(&event) {
                    return Some(item);
                }
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.queue.extend(self.parser.feed(&chunk)),
                Some(Err(e)) => return Some(Err(self.fail(e.to_string()))),
                None => return Some(Err(self.fail("event stream closed by server".to_string()))),
            }
        }
    }

    /// Apply one event; `Some` when it produces an item for the subscriber
    fn apply(&mut self, event: &ServerEvent) -> Option<Result<Option<Value>, StoreError>> {
        match StreamEvent::parse(event, &self.path) {
            Ok(StreamEvent::Put { path, data }) => {
                tree::put(&mut self.snapshot, &path, data);
                Some(Ok(tree::read(&self.snapshot, &[])))
            }
            Ok(StreamEvent::Patch { path, data }) => {
                match data {
                    Value::Object(partial) => tree::merge(&mut self.snapshot, &path, partial),
                    other => tree::put(&mut self.snapshot, &path, other),
                }
                Some(Ok(tree::read(&self.snapshot, &[])))
            }
            Ok(StreamEvent::KeepAlive | StreamEvent::Other) => None,
            Ok(StreamEvent::Cancel(reason)) => {
                Some(Err(self.fail(format!("subscription cancelled: {reason}"))))
            }
            Ok(StreamEvent::AuthRevoked) => {
                Some(Err(self.fail("subscription credential revoked".to_string())))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    fn fail(&mut self, reason: String) -> StoreError {
        tracing::warn!("Event stream for {} ended: {}", self.path, reason);
        self.finished = true;
        StoreError::read(&self.path, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn store(url: &str, token: Option<&str>) -> FirebaseStore {
        let mut config = StoreConfig::new().with_database_url(url);
        if let Some(token) = token {
            config = config.with_auth_token(token);
        }
        FirebaseStore::new(&config).unwrap()
    }

    #[test]
    fn url_for_property_path_encodes_spaces() {
        let store = store("https://demo.firebaseio.com", None);
        let path: StorePath = "properties/Delaware/Westover Pointe".parse().unwrap();
        assert_eq!(
            store.url_for(&path).unwrap().as_str(),
            "https://demo.firebaseio.com/properties/Delaware/Westover%20Pointe.json"
        );
    }

    #[test]
    fn url_for_root_and_auth() {
        let store = store("https://demo.firebaseio.com/", Some("s3cret"));
        assert_eq!(
            store.url_for(&StorePath::root()).unwrap().as_str(),
            "https://demo.firebaseio.com/.json?auth=s3cret"
        );
    }

    #[test]
    fn missing_url_is_config_error() {
        let err = FirebaseStore::new(&StoreConfig::new()).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
        let err = FirebaseStore::new(&StoreConfig::new().with_database_url("not a url")).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    /// Serve one canned reply on a local port; the handle yields the raw request
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (FirebaseStore, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        let mut store = store(&url, Some("tok"));
        // Local replies must not go through an ambient proxy
        store.client = Client::builder().no_proxy().build().unwrap();
        (store, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    fn body_of(request: &str) -> Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn read_once_null_body_is_absent() {
        let (store, server) = serve_once("200 OK", "null").await;
        let path: StorePath = "properties/Delaware".parse().unwrap();

        assert_eq!(store.read_once(&path).await.unwrap(), None);
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /properties/Delaware.json?auth=tok HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn read_once_returns_stored_value() {
        let (store, server) = serve_once("200 OK", r#"{"A":{"unit-1":"1"}}"#).await;
        let path: StorePath = "properties/Delaware".parse().unwrap();

        let value = store.read_once(&path).await.unwrap();
        assert_eq!(value, Some(json!({"A": {"unit-1": "1"}})));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_read_carries_status_and_error_field() {
        let (store, server) =
            serve_once("401 Unauthorized", r#"{"error":"Permission denied"}"#).await;
        let path: StorePath = "properties/Delaware".parse().unwrap();

        let err = store.read_once(&path).await.unwrap_err();
        match &err {
            StoreError::Read { path, reason } => {
                assert_eq!(path, "properties/Delaware");
                assert_eq!(reason, "HTTP 401 Unauthorized: Permission denied");
            }
            other => panic!("expected a read error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_write_without_error_field_keeps_body() {
        let (store, server) = serve_once("500 Internal Server Error", "boom").await;
        let path: StorePath = "properties/Delaware/A".parse().unwrap();

        let err = store.write(&path, json!({"unit-1": "1"})).await.unwrap_err();
        assert!(err.is_write());
        assert_eq!(
            err.to_string(),
            "write to 'properties/Delaware/A' failed: HTTP 500 Internal Server Error: boom"
        );
        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /properties/Delaware/A.json?auth=tok HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn patch_sends_partial_as_json_body() {
        let (store, server) = serve_once("200 OK", r#"{"accountant":{"name":"Jane"}}"#).await;
        let path: StorePath = "properties/Delaware/Westover Pointe".parse().unwrap();
        let mut partial = Map::new();
        partial.insert("accountant".into(), json!({"name": "Jane"}));
        partial.insert("unit-101".into(), json!("101"));

        store.patch(&path, partial).await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with(
            "PATCH /properties/Delaware/Westover%20Pointe.json?auth=tok HTTP/1.1\r\n"
        ));
        assert_eq!(
            body_of(&request),
            json!({"accountant": {"name": "Jane"}, "unit-101": "101"})
        );
    }

    #[tokio::test]
    async fn patch_with_unaddressable_key_sends_nothing() {
        let store = store("http://127.0.0.1:9", None);
        let path: StorePath = "properties/Delaware/A".parse().unwrap();
        let mut partial = Map::new();
        partial.insert("a.b".into(), json!(1));

        let err = store.patch(&path, partial).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    fn mirror_from(chunks: &[&'static str]) -> StreamMirror {
        let owned: Vec<reqwest::Result<Vec<u8>>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        let body = futures::stream::iter(owned).boxed();
        StreamMirror::new("properties/Delaware".to_string(), body)
    }

    #[tokio::test]
    async fn mirror_applies_put_and_patch() {
        let mut mirror = mirror_from(&[
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"A\":{\"unit\":\"1\"}}}\n\n",
            "event: keep-alive\ndata: null\n\n",
            "event: patch\ndata: {\"path\":\"/A\",\"data\":{\"manager\":{\"name\":\"M\"}}}\n\n",
        ]);

        let first = mirror.next_snapshot().await.unwrap().unwrap();
        assert_eq!(first, Some(json!({"A": {"unit": "1"}})));

        let second = mirror.next_snapshot().await.unwrap().unwrap();
        assert_eq!(
            second,
            Some(json!({"A": {"unit": "1", "manager": {"name": "M"}}}))
        );

        // Body exhausted: one error, then the stream ends
        let closed = mirror.next_snapshot().await.unwrap();
        assert!(matches!(closed, Err(StoreError::Read { .. })));
        assert!(mirror.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn mirror_stops_on_cancel() {
        let mut mirror = mirror_from(&["event: cancel\ndata: Permission denied\n\n"]);
        let item = mirror.next_snapshot().await.unwrap();
        let err = item.unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
        assert!(mirror.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn mirror_null_put_clears_snapshot() {
        let mut mirror = mirror_from(&[
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"A\":1}}\n\n",
            "event: put\ndata: {\"path\":\"/A\",\"data\":null}\n\n",
        ]);
        assert_eq!(mirror.next_snapshot().await.unwrap().unwrap(), Some(json!({"A": 1})));
        assert_eq!(mirror.next_snapshot().await.unwrap().unwrap(), None);
    }
}
