//! Wire protocol for the shared terminal server
//!
//! Every frame is a JSON object carrying a message list whose first element
//! is a one-character type tag:
//!
//! ```text
//! client -> server   {"id": 3, "request": ["k", [27, 79, 65]]}
//! server -> client   {"id": 3, "response": ["o"]}
//! server -> client   {"response": ["_", 10, 4]}        (pushed, no id)
//! ```
//!
//! Requests: screen `%`, changes `?` (since change number), settings `s`,
//! hello `h`, keypress `k` (key codes of one keystroke), chat `:`, leave `l`,
//! owner `~`.
//!
//! Server messages: screen `%` (rows, change number), changes `?`
//! (`[change, line, row]` triples), cursor `_` (x, y), owner `~`
//! (0 nobody, 1 you, 2 someone else), chat `:` (sender, text), status `u`,
//! error `e`, settings `s` (`{rows, cols}`), hello `h`, ok `o`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    #[error("frame has an empty message")]
    EmptyResponse,

    #[error("message tag is not a string: {0}")]
    BadTag(Value),

    #[error("bad arguments for '{tag}': {reason}")]
    BadArguments { tag: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Message type tags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Screen,
    Changes,
    Settings,
    Hello,
    Keypress,
    Cursor,
    Error,
    Chat,
    Leave,
    Status,
    Owner,
    Ok,
}

impl MessageKind {
    pub const ALL: [MessageKind; 12] = [
        MessageKind::Screen,
        MessageKind::Changes,
        MessageKind::Settings,
        MessageKind::Hello,
        MessageKind::Keypress,
        MessageKind::Cursor,
        MessageKind::Error,
        MessageKind::Chat,
        MessageKind::Leave,
        MessageKind::Status,
        MessageKind::Owner,
        MessageKind::Ok,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::Screen => "%",
            MessageKind::Changes => "?",
            MessageKind::Settings => "s",
            MessageKind::Hello => "h",
            MessageKind::Keypress => "k",
            MessageKind::Cursor => "_",
            MessageKind::Error => "e",
            MessageKind::Chat => ":",
            MessageKind::Leave => "l",
            MessageKind::Status => "u",
            MessageKind::Owner => "~",
            MessageKind::Ok => "o",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }
}

/// Client to server frame
#[derive(Debug, Serialize)]
pub struct RequestFrame<'a> {
    pub id: u64,
    pub request: &'a [Value],
}

/// Server to client frame. Pushed messages carry no id.
#[derive(Debug, Deserialize)]
pub struct ResponseFrame {
    #[serde(default)]
    pub id: Option<u64>,
    pub response: Vec<Value>,
}

impl ResponseFrame {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)
    }

    /// Split into the tag and the arguments after it.
    pub fn into_message(self) -> Result<(String, Vec<Value>)> {
        let mut response = self.response.into_iter();
        match response.next() {
            Some(Value::String(tag)) => Ok((tag, response.collect())),
            Some(other) => Err(ProtocolError::BadTag(other)),
            None => Err(ProtocolError::EmptyResponse),
        }
    }
}

/// A request payload: tag followed by its arguments
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    payload: Vec<Value>,
}

impl Request {
    pub fn new(kind: MessageKind, args: Vec<Value>) -> Self {
        let mut payload = Vec::with_capacity(args.len() + 1);
        payload.push(Value::from(kind.tag()));
        payload.extend(args);
        Self { payload }
    }

    pub fn screen() -> Self {
        Self::new(MessageKind::Screen, vec![])
    }

    /// All changes after `last_change`
    pub fn changes(last_change: u64) -> Self {
        Self::new(MessageKind::Changes, vec![Value::from(last_change)])
    }

    pub fn settings() -> Self {
        Self::new(MessageKind::Settings, vec![])
    }

    pub fn hello() -> Self {
        Self::new(MessageKind::Hello, vec![Value::from("hello")])
    }

    /// The key codes produced by one keystroke
    pub fn keypress(codes: &[u32]) -> Self {
        Self::new(MessageKind::Keypress, vec![Value::from(codes.to_vec())])
    }

    pub fn chat(message: &str) -> Self {
        Self::new(MessageKind::Chat, vec![Value::from(message)])
    }

    pub fn leave() -> Self {
        Self::new(MessageKind::Leave, vec![])
    }

    pub fn owner() -> Self {
        Self::new(MessageKind::Owner, vec![])
    }

    pub fn kind(&self) -> Option<MessageKind> {
        self.payload.first()?.as_str().and_then(MessageKind::from_tag)
    }

    pub fn payload(&self) -> &[Value] {
        &self.payload
    }
}

/// Terminal dimensions reported by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub rows: usize,
    pub cols: usize,
}

/// One changed line
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Change {
    pub number: u64,
    pub line: usize,
    /// Encoded row, see `term::row`
    pub row: Value,
}

/// A decoded server message
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    Screen { rows: Vec<Value>, change: Option<u64> },
    Changes(Vec<Change>),
    Cursor { x: i64, y: i64 },
    Owner(u64),
    Chat { sender: String, text: String },
    Status(String),
    Error(String),
    Settings(Settings),
    Hello,
    Ok,
}

fn bad(kind: MessageKind, reason: impl ToString) -> ProtocolError {
    ProtocolError::BadArguments {
        tag: kind.tag().to_string(),
        reason: reason.to_string(),
    }
}

fn arg<T: DeserializeOwned>(kind: MessageKind, args: &[Value], index: usize) -> Result<T> {
    let value = args
        .get(index)
        .ok_or_else(|| bad(kind, format!("missing argument {}", index)))?;
    T::deserialize(value).map_err(|e| bad(kind, e))
}

impl ServerEvent {
    /// Decode the arguments of a message with the given tag.
    ///
    /// Returns `None` for tags this client does not know.
    pub fn parse(tag: &str, args: &[Value]) -> Option<Result<Self>> {
        let kind = MessageKind::from_tag(tag)?;
        Some(Self::parse_kind(kind, args))
    }

    pub fn parse_kind(kind: MessageKind, args: &[Value]) -> Result<Self> {
        let event = match kind {
            MessageKind::Screen => ServerEvent::Screen {
                rows: arg(kind, args, 0)?,
                change: match args.get(1) {
                    Some(value) => Some(u64::deserialize(value).map_err(|e| bad(kind, e))?),
                    None => None,
                },
            },
            MessageKind::Changes => {
                let triples: Vec<(u64, usize, Value)> = arg(kind, args, 0)?;
                ServerEvent::Changes(
                    triples
                        .into_iter()
                        .map(|(number, line, row)| Change { number, line, row })
                        .collect(),
                )
            }
            MessageKind::Cursor => ServerEvent::Cursor {
                x: arg(kind, args, 0)?,
                y: arg(kind, args, 1)?,
            },
            MessageKind::Owner => ServerEvent::Owner(arg(kind, args, 0)?),
            MessageKind::Chat => ServerEvent::Chat {
                sender: arg(kind, args, 0)?,
                text: arg(kind, args, 1)?,
            },
            MessageKind::Status => ServerEvent::Status(arg(kind, args, 0)?),
            MessageKind::Error => ServerEvent::Error(arg(kind, args, 0)?),
            MessageKind::Settings => ServerEvent::Settings(arg(kind, args, 0)?),
            MessageKind::Hello => ServerEvent::Hello,
            MessageKind::Ok => ServerEvent::Ok,
            MessageKind::Keypress | MessageKind::Leave => {
                return Err(bad(kind, "not a server message"));
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_payloads() {
        assert_eq!(Request::screen().payload(), &[json!("%")]);
        assert_eq!(Request::changes(12).payload(), &[json!("?"), json!(12)]);
        assert_eq!(Request::hello().payload(), &[json!("h"), json!("hello")]);
        assert_eq!(Request::keypress(&[13]).payload(), &[json!("k"), json!([13])]);
        assert_eq!(Request::chat("hi").payload(), &[json!(":"), json!("hi")]);
        assert_eq!(Request::owner().kind(), Some(MessageKind::Owner));
    }

    #[test]
    fn test_request_frame_shape() {
        let request = Request::keypress(&[27, 79, 65]);
        let frame = RequestFrame {
            id: 7,
            request: request.payload(),
        };
        let text = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&text).unwrap(),
            json!({"id": 7, "request": ["k", [27, 79, 65]]})
        );
    }

    #[test]
    fn test_response_frame_without_id() {
        let frame = ResponseFrame::parse(r#"{"response": ["_", 3, 4]}"#).unwrap();
        assert_eq!(frame.id, None);
        let (tag, args) = frame.into_message().unwrap();
        assert_eq!(tag, "_");
        assert_eq!(
            ServerEvent::parse(&tag, &args).unwrap().unwrap(),
            ServerEvent::Cursor { x: 3, y: 4 }
        );
    }

    #[test]
    fn test_bad_frames() {
        assert!(matches!(
            ResponseFrame::parse("not json"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        let empty = ResponseFrame::parse(r#"{"id": 1, "response": []}"#).unwrap();
        assert!(matches!(empty.into_message(), Err(ProtocolError::EmptyResponse)));
        let numeric = ResponseFrame::parse(r#"{"response": [5]}"#).unwrap();
        assert!(matches!(numeric.into_message(), Err(ProtocolError::BadTag(_))));
    }

    #[test]
    fn test_parse_screen_and_changes() {
        let screen = ServerEvent::parse("%", &[json!([["a"], ["b"]]), json!(9)]).unwrap().unwrap();
        assert_eq!(
            screen,
            ServerEvent::Screen {
                rows: vec![json!(["a"]), json!(["b"])],
                change: Some(9),
            }
        );

        let changes = ServerEvent::parse("?", &[json!([[4, 1, ["x", 2]]])]).unwrap().unwrap();
        assert_eq!(
            changes,
            ServerEvent::Changes(vec![Change {
                number: 4,
                line: 1,
                row: json!(["x", 2]),
            }])
        );
    }

    #[test]
    fn test_parse_settings_ignores_extra_fields() {
        let event = ServerEvent::parse("s", &[json!({"rows": 30, "cols": 80, "title": "lcs"})])
            .unwrap()
            .unwrap();
        assert_eq!(event, ServerEvent::Settings(Settings { rows: 30, cols: 80 }));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(ServerEvent::parse("_", &[json!(1)]).unwrap().is_err());
        assert!(ServerEvent::parse("~", &[json!("you")]).unwrap().is_err());
        assert!(ServerEvent::parse("k", &[]).unwrap().is_err());
        assert!(ServerEvent::parse("!", &[]).is_none());
    }
}
