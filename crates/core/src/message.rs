//! The wire message taxonomy.
//!
//! Every message travels as an ordered, heterogeneous tuple whose first
//! element is an integer kind tag.  The tag values are fixed for interop
//! with other ObjectLink implementations and must never change.

use std::fmt;

use serde_json::Value;

use crate::codec::CodecError;

/// A property snapshot or payload map, keyed by member path.
pub type Props = serde_json::Map<String, Value>;

/// Wire message kind tags.  Values are part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgKind {
    Link = 10,
    Init = 11,
    Unlink = 12,
    SetProperty = 20,
    PropertyChange = 21,
    Invoke = 30,
    InvokeReply = 31,
    Signal = 40,
    Error = 90,
}

impl MsgKind {
    /// The integer tag carried as the first tuple element.
    pub fn tag(self) -> u64 {
        self as u64
    }

    /// Map a wire tag back to a kind.  Unknown tags yield `None` and are
    /// dropped at the decode boundary.
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            10 => Some(MsgKind::Link),
            11 => Some(MsgKind::Init),
            12 => Some(MsgKind::Unlink),
            20 => Some(MsgKind::SetProperty),
            21 => Some(MsgKind::PropertyChange),
            30 => Some(MsgKind::Invoke),
            31 => Some(MsgKind::InvokeReply),
            40 => Some(MsgKind::Signal),
            90 => Some(MsgKind::Error),
            _ => None,
        }
    }
}

impl fmt::Display for MsgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MsgKind::Link => "link",
            MsgKind::Init => "init",
            MsgKind::Unlink => "unlink",
            MsgKind::SetProperty => "set_property",
            MsgKind::PropertyChange => "property_change",
            MsgKind::Invoke => "invoke",
            MsgKind::InvokeReply => "invoke_reply",
            MsgKind::Signal => "signal",
            MsgKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// A decoded wire message.  Immutable once constructed; no identity beyond
/// its fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client → remote: attach to a named object.
    Link { name: String },
    /// Remote → client: property snapshot answering a LINK.
    Init { name: String, props: Props },
    /// Client → remote: detach from a named object.
    Unlink { name: String },
    /// Client → remote: request a property write.
    SetProperty { name: String, value: Value },
    /// Remote → client: a property value changed.
    PropertyChange { name: String, value: Value },
    /// Client → remote: call a method, correlated by `request_id`.
    Invoke {
        request_id: u64,
        name: String,
        args: Vec<Value>,
    },
    /// Remote → client: the result of a correlated INVOKE.
    InvokeReply {
        request_id: u64,
        name: String,
        value: Value,
    },
    /// Remote → client: a signal fired on the object.
    Signal { name: String, args: Vec<Value> },
    /// Either direction: a failure report, correlated to the original
    /// message kind and request id.
    Error {
        kind: MsgKind,
        request_id: u64,
        message: String,
    },
}

impl Message {
    pub fn link(name: impl Into<String>) -> Self {
        Message::Link { name: name.into() }
    }

    pub fn init(name: impl Into<String>, props: Props) -> Self {
        Message::Init {
            name: name.into(),
            props,
        }
    }

    pub fn unlink(name: impl Into<String>) -> Self {
        Message::Unlink { name: name.into() }
    }

    pub fn set_property(name: impl Into<String>, value: Value) -> Self {
        Message::SetProperty {
            name: name.into(),
            value,
        }
    }

    pub fn property_change(name: impl Into<String>, value: Value) -> Self {
        Message::PropertyChange {
            name: name.into(),
            value,
        }
    }

    pub fn invoke(request_id: u64, name: impl Into<String>, args: Vec<Value>) -> Self {
        Message::Invoke {
            request_id,
            name: name.into(),
            args,
        }
    }

    pub fn invoke_reply(request_id: u64, name: impl Into<String>, value: Value) -> Self {
        Message::InvokeReply {
            request_id,
            name: name.into(),
            value,
        }
    }

    pub fn signal(name: impl Into<String>, args: Vec<Value>) -> Self {
        Message::Signal {
            name: name.into(),
            args,
        }
    }

    pub fn error(kind: MsgKind, request_id: u64, message: impl Into<String>) -> Self {
        Message::Error {
            kind,
            request_id,
            message: message.into(),
        }
    }

    /// The kind tag of this message.
    pub fn kind(&self) -> MsgKind {
        match self {
            Message::Link { .. } => MsgKind::Link,
            Message::Init { .. } => MsgKind::Init,
            Message::Unlink { .. } => MsgKind::Unlink,
            Message::SetProperty { .. } => MsgKind::SetProperty,
            Message::PropertyChange { .. } => MsgKind::PropertyChange,
            Message::Invoke { .. } => MsgKind::Invoke,
            Message::InvokeReply { .. } => MsgKind::InvokeReply,
            Message::Signal { .. } => MsgKind::Signal,
            Message::Error { .. } => MsgKind::Error,
        }
    }

    /// Lower the message into the ordered wire tuple.
    pub fn into_values(self) -> Vec<Value> {
        let tag = Value::from(self.kind().tag());
        match self {
            Message::Link { name } | Message::Unlink { name } => {
                vec![tag, Value::String(name)]
            }
            Message::Init { name, props } => {
                vec![tag, Value::String(name), Value::Object(props)]
            }
            Message::SetProperty { name, value } | Message::PropertyChange { name, value } => {
                vec![tag, Value::String(name), value]
            }
            Message::Invoke {
                request_id,
                name,
                args,
            } => vec![
                tag,
                Value::from(request_id),
                Value::String(name),
                Value::Array(args),
            ],
            Message::InvokeReply {
                request_id,
                name,
                value,
            } => vec![tag, Value::from(request_id), Value::String(name), value],
            Message::Signal { name, args } => {
                vec![tag, Value::String(name), Value::Array(args)]
            }
            Message::Error {
                kind,
                request_id,
                message,
            } => vec![
                tag,
                Value::from(kind.tag()),
                Value::from(request_id),
                Value::String(message),
            ],
        }
    }

    /// Raise an ordered wire tuple into a message.
    pub fn from_values(values: Vec<Value>) -> Result<Self, CodecError> {
        let mut fields = values.into_iter();
        let tag = match fields.next() {
            Some(value) => value
                .as_u64()
                .ok_or_else(|| CodecError::Malformed("message tag is not an integer".into()))?,
            None => return Err(CodecError::Malformed("empty message tuple".into())),
        };
        let kind = MsgKind::from_tag(tag).ok_or(CodecError::UnknownKind(tag))?;

        match kind {
            MsgKind::Link => Ok(Message::Link {
                name: take_string(&mut fields, "name")?,
            }),
            MsgKind::Init => Ok(Message::Init {
                name: take_string(&mut fields, "name")?,
                props: take_object(&mut fields, "props")?,
            }),
            MsgKind::Unlink => Ok(Message::Unlink {
                name: take_string(&mut fields, "name")?,
            }),
            MsgKind::SetProperty => Ok(Message::SetProperty {
                name: take_string(&mut fields, "name")?,
                value: take_value(&mut fields, "value")?,
            }),
            MsgKind::PropertyChange => Ok(Message::PropertyChange {
                name: take_string(&mut fields, "name")?,
                value: take_value(&mut fields, "value")?,
            }),
            MsgKind::Invoke => Ok(Message::Invoke {
                request_id: take_u64(&mut fields, "requestId")?,
                name: take_string(&mut fields, "name")?,
                args: take_array(&mut fields, "args")?,
            }),
            MsgKind::InvokeReply => Ok(Message::InvokeReply {
                request_id: take_u64(&mut fields, "requestId")?,
                name: take_string(&mut fields, "name")?,
                value: take_value(&mut fields, "value")?,
            }),
            MsgKind::Signal => Ok(Message::Signal {
                name: take_string(&mut fields, "name")?,
                args: take_array(&mut fields, "args")?,
            }),
            MsgKind::Error => {
                let original = take_u64(&mut fields, "originalKind")?;
                let kind = MsgKind::from_tag(original).ok_or_else(|| {
                    CodecError::Malformed(format!("unknown original kind in error: {original}"))
                })?;
                Ok(Message::Error {
                    kind,
                    request_id: take_u64(&mut fields, "requestId")?,
                    message: take_string(&mut fields, "message")?,
                })
            }
        }
    }
}

fn take_value(
    fields: &mut impl Iterator<Item = Value>,
    field: &str,
) -> Result<Value, CodecError> {
    fields
        .next()
        .ok_or_else(|| CodecError::Malformed(format!("missing field: {field}")))
}

fn take_string(
    fields: &mut impl Iterator<Item = Value>,
    field: &str,
) -> Result<String, CodecError> {
    match take_value(fields, field)? {
        Value::String(s) => Ok(s),
        other => Err(CodecError::Malformed(format!(
            "field {field} is not a string: {other}"
        ))),
    }
}

fn take_u64(fields: &mut impl Iterator<Item = Value>, field: &str) -> Result<u64, CodecError> {
    take_value(fields, field)?
        .as_u64()
        .ok_or_else(|| CodecError::Malformed(format!("field {field} is not an integer")))
}

fn take_array(
    fields: &mut impl Iterator<Item = Value>,
    field: &str,
) -> Result<Vec<Value>, CodecError> {
    match take_value(fields, field)? {
        Value::Array(items) => Ok(items),
        other => Err(CodecError::Malformed(format!(
            "field {field} is not an array: {other}"
        ))),
    }
}

fn take_object(
    fields: &mut impl Iterator<Item = Value>,
    field: &str,
) -> Result<Props, CodecError> {
    match take_value(fields, field)? {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::Malformed(format!(
            "field {field} is not an object: {other}"
        ))),
    }
}
