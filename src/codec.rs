// Codec for the Engine.IO v4 polling transport carrying Socket.IO packets.
// A polling body holds one or more packets separated by 0x1e:
//   <engine type>[<data>]\x1e<engine type>[<data>]...
// Socket.IO packets ride inside engine MESSAGE packets (type 4):
//   <socket type>[<namespace>,][<ack id>][<json payload>]

use bytes::{BufMut, BytesMut};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::CompanionError;

pub const RECORD_SEPARATOR: u8 = 0x1e;

/// Payload of the engine OPEN packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(rename = "pingInterval", default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(rename = "pingTimeout", default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        name: String,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
    /// Acks and binary packets, which this client never asks for.
    Unsupported {
        namespace: String,
        kind: u8,
    },
}

impl SocketPacket {
    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. }
            | SocketPacket::Unsupported { namespace, .. } => namespace,
        }
    }

    pub fn parse(text: &str) -> Result<Self, CompanionError> {
        let kind = text
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| invalid(format!("Socket packet without type: {:?}", text)))?
            as u8;
        let mut rest = &text[1..];

        // Binary packets carry an attachment count before a dash.
        if matches!(kind, 5 | 6) {
            if let Some(dash) = rest.find('-') {
                rest = &rest[dash + 1..];
            }
        }

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(comma) => {
                    let ns = &rest[..comma];
                    rest = &rest[comma + 1..];
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            "/".to_string()
        };

        let ack_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let payload = rest[ack_len..].trim();
        let data = if payload.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(payload)?)
        };

        match kind {
            0 => Ok(SocketPacket::Connect { namespace, data }),
            1 => Ok(SocketPacket::Disconnect { namespace }),
            2 => {
                let mut args = match data {
                    Some(Value::Array(items)) => items,
                    other => {
                        return Err(invalid(format!("Event payload is not an array: {:?}", other)))
                    }
                };
                if args.is_empty() {
                    return Err(invalid("Event without a name".to_string()));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => return Err(invalid(format!("Event name is not a string: {}", other))),
                };
                Ok(SocketPacket::Event {
                    namespace,
                    name,
                    args,
                })
            }
            4 => {
                let message = match data {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    Some(Value::String(message)) => message,
                    _ => String::new(),
                };
                Ok(SocketPacket::ConnectError { namespace, message })
            }
            3 | 5 | 6 => Ok(SocketPacket::Unsupported { namespace, kind }),
            other => Err(invalid(format!("Unknown socket packet type {}", other))),
        }
    }

    /// `0/ns,{auth}`
    pub fn connect(namespace: &str, auth: &Value) -> String {
        format!("0{},{}", namespace, auth)
    }
}

impl EnginePacket {
    pub fn parse(text: &str) -> Result<Self, CompanionError> {
        let kind = text
            .chars()
            .next()
            .ok_or_else(|| invalid("Empty engine packet".to_string()))?;
        let data = &text[kind.len_utf8()..];
        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(data)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(SocketPacket::parse(data)?)),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(invalid(format!("Unknown engine packet type {:?}", other))),
        }
    }
}

fn invalid(message: String) -> CompanionError {
    CompanionError::InvalidResponse(message)
}

/// Outbound packets. Socket packets are sent pre-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Pong(String),
    Message(String),
    Close,
}

#[derive(Debug, Default)]
pub struct EngineCodec;

impl EngineCodec {
    pub fn new() -> Self {
        Self
    }

    fn decode_record(record: &[u8]) -> Result<Option<EnginePacket>, CompanionError> {
        let text = std::str::from_utf8(record)
            .map_err(|_| invalid("Invalid UTF-8 in engine packet".to_string()))?;
        if text.is_empty() {
            return Ok(None);
        }
        EnginePacket::parse(text).map(Some)
    }
}

impl Decoder for EngineCodec {
    type Item = EnginePacket;
    type Error = CompanionError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = buf.iter().position(|&b| b == RECORD_SEPARATOR) else {
                // The last packet of a body has no trailing separator.
                return Ok(None);
            };
            let record = buf.split_to(pos + 1);
            if let Some(packet) = Self::decode_record(&record[..pos])? {
                return Ok(Some(packet));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(packet) = self.decode(buf)? {
            return Ok(Some(packet));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let record = buf.split_to(buf.len());
        Self::decode_record(&record)
    }
}

impl Encoder<Outbound> for EngineCodec {
    type Error = CompanionError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if !dst.is_empty() {
            dst.put_u8(RECORD_SEPARATOR);
        }
        match item {
            Outbound::Pong(data) => {
                dst.put_u8(b'3');
                dst.put_slice(data.as_bytes());
            }
            Outbound::Message(data) => {
                dst.put_u8(b'4');
                dst.put_slice(data.as_bytes());
            }
            Outbound::Close => dst.put_u8(b'1'),
        }
        Ok(())
    }
}
