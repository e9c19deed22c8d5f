//! Inbound messages (device → client)
//!
//! Messages are JSON objects discriminated by a string `type` field:
//!
//! | `type`          | payload                                        |
//! |-----------------|------------------------------------------------|
//! | `auth_required` | optional `message`                             |
//! | `auth_success`  | none                                           |
//! | `auth_failed`   | `message`                                      |
//! | `status`        | device fields, see [`StatusUpdate`]            |
//! | `log`           | `timestamp`, `level`, `source`, `message`      |
//! | `error`         | `message`                                      |
//! | `fault`         | `timestamp`, `data`                            |
//! | `pong`          | optional `timestamp`                           |
//!
//! An unrecognised `type` is not an error: it decodes to
//! [`InboundMessage::Unknown`] so the caller can log and drop it. Unknown
//! fields inside a recognised type are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Device status snapshot.
///
/// Every field is optional because the status surface renders whatever the
/// firmware chose to send; keys not modelled here are kept in `extra`, and so
/// is a modelled key whose value has an unexpected JSON type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub datetime: Option<String>,
    pub uptime: Option<String>,
    pub device_name: Option<String>,
    pub tm_name: Option<String>,
    #[serde(rename = "deviceIP")]
    pub device_ip: Option<String>,
    pub baud_rate: Option<u32>,
    pub ethernet_status: Option<bool>,
    pub time_synced: Option<bool>,
    pub free_heap: Option<u64>,
    pub ws_clients: Option<u32>,
    /// Fields not covered above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusUpdate {
    /// Build a status update from the raw object of a `status` frame.
    ///
    /// Never fails: a known key carrying the wrong JSON type stays in `extra`
    /// under its wire name, and `null` counts as absent.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        Self {
            datetime: take(&mut fields, "datetime", string),
            uptime: take(&mut fields, "uptime", string),
            device_name: take(&mut fields, "deviceName", string),
            tm_name: take(&mut fields, "tmName", string),
            device_ip: take(&mut fields, "deviceIP", string),
            baud_rate: take(&mut fields, "baudRate", unsigned::<u32>),
            ethernet_status: take(&mut fields, "ethernetStatus", Value::as_bool),
            time_synced: take(&mut fields, "timeSynced", Value::as_bool),
            free_heap: take(&mut fields, "freeHeap", Value::as_u64),
            ws_clients: take(&mut fields, "wsClients", unsigned::<u32>),
            extra: fields,
        }
    }
}

impl<'de> Deserialize<'de> for StatusUpdate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_fields)
    }
}

/// Remove `key` from `fields` if `convert` accepts its value
fn take<T>(
    fields: &mut Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = fields.get(key)?;
    if value.is_null() {
        fields.remove(key);
        return None;
    }
    let converted = convert(value)?;
    fields.remove(key);
    Some(converted)
}

fn string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn unsigned<T: TryFrom<u64>>(value: &Value) -> Option<T> {
    value.as_u64().and_then(|n| T::try_from(n).ok())
}

/// One device log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// Fault record pushed by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub timestamp: String,
    pub data: String,
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Server asks the client to authenticate (sent right after open)
    AuthRequired { message: Option<String> },
    /// Authentication accepted
    AuthSuccess,
    /// Authentication rejected; the server disconnects afterwards
    AuthFailed { message: String },
    /// Status snapshot
    Status(StatusUpdate),
    /// Log entry
    Log(LogEntry),
    /// Server-pushed error notice
    Error { message: String },
    /// Fault record
    Fault(FaultRecord),
    /// Keep-alive answer
    Pong { timestamp: Option<u64> },
    /// Well-formed message with an unrecognised discriminant
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct PongBody {
    #[serde(default)]
    timestamp: Option<u64>,
}

impl InboundMessage {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let mut object = match value {
            Value::Object(object) => object,
            _ => return Err(ProtocolError::NotAnObject),
        };

        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(ProtocolError::MissingType),
        };
        let body = Value::Object(object);

        let shape = |source| ProtocolError::Shape {
            kind: kind.clone(),
            source,
        };

        let message = match kind.as_str() {
            "auth_required" => {
                let body: MessageBody = serde_json::from_value(body).map_err(shape)?;
                Self::AuthRequired {
                    message: body.message,
                }
            }
            "auth_success" => Self::AuthSuccess,
            "auth_failed" => {
                let body: MessageBody = serde_json::from_value(body).map_err(shape)?;
                Self::AuthFailed {
                    message: body.message.unwrap_or_default(),
                }
            }
            "status" => match body {
                Value::Object(fields) => Self::Status(StatusUpdate::from_fields(fields)),
                _ => return Err(ProtocolError::NotAnObject),
            },
            "log" => Self::Log(serde_json::from_value(body).map_err(shape)?),
            "error" => {
                let body: MessageBody = serde_json::from_value(body).map_err(shape)?;
                Self::Error {
                    message: body.message.unwrap_or_default(),
                }
            }
            "fault" => Self::Fault(serde_json::from_value(body).map_err(shape)?),
            "pong" => {
                let body: PongBody = serde_json::from_value(body).map_err(shape)?;
                Self::Pong {
                    timestamp: body.timestamp,
                }
            }
            _ => Self::Unknown { kind: kind.clone() },
        };

        Ok(message)
    }

    /// The wire discriminant of this message
    pub fn kind(&self) -> &str {
        match self {
            Self::AuthRequired { .. } => "auth_required",
            Self::AuthSuccess => "auth_success",
            Self::AuthFailed { .. } => "auth_failed",
            Self::Status(_) => "status",
            Self::Log(_) => "log",
            Self::Error { .. } => "error",
            Self::Fault(_) => "fault",
            Self::Pong { .. } => "pong",
            Self::Unknown { kind } => kind,
        }
    }
}
