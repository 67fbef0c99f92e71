//! Wire-level types shared between the transport, router and session layers.
//!
//! This crate knows the shape of a CDP envelope — `id`/`method`/`params`/`result`/`error` — and
//! nothing else. It does not know what any particular method name means; `params` and `result`
//! are carried as opaque [`serde_json::Value`].

use std::borrow::Cow;
use std::fmt;
use std::fmt::Debug;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A method identifier, e.g. `Network.enable`. Usually `'static` for generated command types,
/// owned for anything built from a runtime string.
pub type MethodId = Cow<'static, str>;

/// Identifier assigned to an outbound request by the transport's writer.
///
/// Unique for the lifetime of the session that minted it; the writer is the sole id-minter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallId(usize);

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// An outbound request as written to the wire: `{"id":..,"method":..,"sessionId"?:..,"params":..}`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MethodCall {
    pub id: CallId,
    pub method: MethodId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Method for MethodCall {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

/// Trait implemented by every typed CDP command (request) struct.
pub trait Command: serde::ser::Serialize + Method {
    /// The type of the response this request triggers on the browser side.
    type Response: DeserializeOwned + fmt::Debug;

    fn response_from_value(response: serde_json::Value) -> serde_json::Result<Self::Response> {
        serde_json::from_value(response)
    }
}

/// A successful response with `result` deserialized into `Command::Response`.
#[derive(Debug)]
pub struct CommandResponse<T>
where
    T: fmt::Debug,
{
    pub id: CallId,
    pub result: T,
    pub method: MethodId,
}

impl<T: fmt::Debug> Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

pub type CommandResult<T> = Result<CommandResponse<T>, Error>;

/// Trait implemented by types that carry a `method` field: both commands and events.
pub trait Method {
    /// The full identifier, e.g. `DOM.removeNode`.
    fn identifier(&self) -> MethodId;

    /// The domain half of the identifier: `DOM`.
    fn domain_name(&self) -> MethodId {
        self.split().0
    }

    /// The method half of the identifier: `removeNode`.
    fn method_name(&self) -> MethodId {
        self.split().1
    }

    fn split(&self) -> (MethodId, MethodId) {
        match self.identifier() {
            Cow::Borrowed(id) => {
                let mut iter = id.split('.');
                (iter.next().unwrap_or_default().into(), iter.next().unwrap_or_default().into())
            }
            Cow::Owned(id) => {
                let mut iter = id.split('.').map(|s| s.to_string());
                (
                    Cow::Owned(iter.next().unwrap_or_default()),
                    Cow::Owned(iter.next().unwrap_or_default()),
                )
            }
        }
    }
}

/// Identifies an event type at compile time, independent of any particular instance.
pub trait MethodType {
    fn method_id() -> MethodId
    where
        Self: Sized;
}

/// Implemented by the concrete event-message type a `Connection`/`Transport` deserializes
/// unsolicited inbound envelopes into. Most consumers use [`JsonEventMessage`]; a typed
/// deserialization layer on top may implement this for a richer event enum.
pub trait EventMessage: Method + DeserializeOwned + Debug {
    /// The CDP session this event is scoped to, if any.
    fn session_id(&self) -> Option<&str>;
}

/// The untyped, always-deserializable event representation: a method name plus opaque params.
///
/// This is what the core transport and router operate on. Typed event wrappers belong to the
/// protocol-stub layer, not this crate.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct JsonEventMessage {
    pub method: MethodId,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Method for JsonEventMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

impl EventMessage for JsonEventMessage {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// A deserialized inbound request view (mirror of [`MethodCall`] without the id, used by
/// anything that needs to replay or log an outbound request).
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Request {
    pub method: MethodId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(method: MethodId, params: serde_json::Value) -> Self {
        Self { method, params, session_id: None }
    }

    pub fn with_session(method: MethodId, params: serde_json::Value, session_id: impl Into<String>) -> Self {
        Self { method, params, session_id: Some(session_id.into()) }
    }
}

/// A response to a [`MethodCall`], identified by the `id` the writer assigned it.
#[derive(Deserialize, Debug, Clone)]
pub struct Response {
    pub id: CallId,
    pub result: Option<serde_json::Value>,
    pub error: Option<Error>,
}

/// An inbound envelope: either a `Response` correlated to an earlier `id`, or an unsolicited
/// `Event`. Untagged so the wire distinction (presence of `method`) drives the match, per the
/// envelope codec's contract.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Message<T = JsonEventMessage> {
    Response(Response),
    Event(T),
}

/// The error the browser returns in a failed response's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}
