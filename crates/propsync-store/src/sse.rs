//! Server-sent event framing for the streaming REST endpoint
//!
//! Bytes arrive in arbitrary chunks; [`EventParser`] buffers partial lines
//! and yields a [`ServerEvent`] whenever a blank line closes one.

use crate::error::StoreError;
use serde::Deserialize;
use serde_json::Value;

/// One framed server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerEvent {
    pub(crate) name: String,
    pub(crate) data: String,
}

/// Incremental event-stream parser
#[derive(Debug, Default)]
pub(crate) struct EventParser {
    pending: Vec<u8>,
    name: Option<String>,
    data: Vec<String>,
}

impl EventParser {
    /// Feed a chunk, returning every event it completes
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            if self.name.is_none() && self.data.is_empty() {
                return None;
            }
            return Some(ServerEvent {
                name: self.name.take().unwrap_or_else(|| "message".to_string()),
                data: std::mem::take(&mut self.data).join("\n"),
            });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.name = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

/// Event kinds the database stream emits
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StreamEvent {
    /// Replace the value at a relative path
    Put { path: Vec<String>, data: Value },
    /// Merge keys into the value at a relative path
    Patch { path: Vec<String>, data: Value },
    /// Heartbeat
    KeepAlive,
    /// Server closed the subscription (usually permissions)
    Cancel(String),
    /// Credential expired
    AuthRevoked,
    /// Anything else is ignored
    Other,
}

#[derive(Deserialize)]
struct Payload {
    path: String,
    data: Value,
}

impl StreamEvent {
    /// Interpret a framed event
    ///
    /// # Errors
    /// [`StoreError::Decode`] when a `put` / `patch` payload is not the
    /// expected `{"path", "data"}` object.
    pub(crate) fn parse(event: &ServerEvent, subscribed: &str) -> Result<Self, StoreError> {
        let payload = || {
            serde_json::from_str::<Payload>(&event.data).map_err(|source| StoreError::Decode {
                path: subscribed.to_string(),
                source,
            })
        };
        Ok(match event.name.as_str() {
            "put" => {
                let p = payload()?;
                Self::Put {
                    path: split_path(&p.path),
                    data: p.data,
                }
            }
            "patch" => {
                let p = payload()?;
                Self::Patch {
                    path: split_path(&p.path),
                    data: p.data,
                }
            }
            "keep-alive" => Self::KeepAlive,
            "cancel" => Self::Cancel(event.data.clone()),
            "auth_revoked" => Self::AuthRevoked,
            _ => Self::Other,
        })
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parser_handles_split_chunks() {
        let mut parser = EventParser::default();
        assert!(parser.feed(b"event: put\nda").is_empty());
        let events = parser.feed(b"ta: {\"path\":\"/\",\"data\":null}\n\n");
        assert_eq!(
            events,
            vec![ServerEvent {
                name: "put".into(),
                data: "{\"path\":\"/\",\"data\":null}".into(),
            }]
        );
    }

    #[test]
    fn parser_handles_crlf_and_comments() {
        let mut parser = EventParser::default();
        let events = parser.feed(b": hello\r\nevent: keep-alive\r\ndata: null\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "keep-alive");
        assert_eq!(events[0].data, "null");
    }

    #[test]
    fn put_event_relative_path() {
        let event = ServerEvent {
            name: "put".into(),
            data: r#"{"path":"/Westover Pointe/accountant","data":{"name":"Jane"}}"#.into(),
        };
        let parsed = StreamEvent::parse(&event, "properties/Delaware").unwrap();
        assert_eq!(
            parsed,
            StreamEvent::Put {
                path: vec!["Westover Pointe".into(), "accountant".into()],
                data: json!({"name": "Jane"}),
            }
        );
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let event = ServerEvent {
            name: "patch".into(),
            data: "not json".into(),
        };
        let err = StreamEvent::parse(&event, "p").unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn control_events() {
        let cancel = ServerEvent {
            name: "cancel".into(),
            data: "Permission denied".into(),
        };
        assert_eq!(
            StreamEvent::parse(&cancel, "p").unwrap(),
            StreamEvent::Cancel("Permission denied".into())
        );
        let revoked = ServerEvent {
            name: "auth_revoked".into(),
            data: "credential is no longer valid".into(),
        };
        assert_eq!(StreamEvent::parse(&revoked, "p").unwrap(), StreamEvent::AuthRevoked);
    }
}
