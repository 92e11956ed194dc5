use std::collections::HashMap;
use std::str::FromStr;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::{parse_event, InboundEvent};
use crate::message::{parse_message, InboundMessage};
use crate::reply::{Reply, ReplyBody};

/// Flat field bag decoded from an inbound push body.
///
/// Holds the direct children of the root `<xml>` element (or of the `xml`
/// object of a JSON body) as text. Variant parsers copy fields out of it
/// without validating them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvelope {
    fields: HashMap<String, String>,
}

impl RawEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an XML push body. Nested elements below the first level are
    /// ignored. Field text is copied verbatim; only whitespace-only text
    /// nodes (indentation between elements) are skipped.
    pub fn from_xml(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);

        let mut fields = HashMap::new();
        let mut depth = 0usize;
        let mut current: Option<(String, String)> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    depth += 1;
                    if depth == 2 {
                        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                        current = Some((name, String::new()));
                    }
                }
                Event::End(_) => {
                    if depth == 2 {
                        if let Some((name, value)) = current.take() {
                            fields.insert(name, value);
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Empty(empty) => {
                    if depth == 1 {
                        let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                        fields.insert(name, String::new());
                    }
                }
                Event::Text(text) => {
                    if let (2, Some((_, value))) = (depth, current.as_mut()) {
                        let unescaped = text.unescape()?;
                        if !unescaped.trim().is_empty() {
                            value.push_str(&unescaped);
                        }
                    }
                }
                Event::CData(cdata) => {
                    if let (2, Some((_, value))) = (depth, current.as_mut()) {
                        let raw = cdata.into_inner();
                        value.push_str(&String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { fields })
    }

    /// Decode a JSON push body of the shape `{"xml": {...}}`.
    ///
    /// Scalar values are kept as their text form; nested values and nulls are
    /// dropped. A body without an `xml` object decodes to an empty envelope.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let body: Value = serde_json::from_slice(bytes)?;
        let mut fields = HashMap::new();

        if let Some(object) = body.get("xml").and_then(Value::as_object) {
            for (key, value) in object {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                fields.insert(key.clone(), text);
            }
        }

        Ok(Self { fields })
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Required text field; empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Optional text field.
    pub fn opt_text(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    /// Required numeric field; the type's default when absent.
    pub fn number<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr + Default,
    {
        Ok(self.opt_number(key)?.unwrap_or_default())
    }

    /// Optional numeric field. A present value that does not parse is an error.
    pub fn opt_number<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| Error::decode(format!("field {key} is not a number: {raw:?}"))),
        }
    }

    /// Whether the push is an event (`MsgType` == `event`).
    pub fn is_event(&self) -> bool {
        self.get("MsgType") == Some("event")
    }
}

/// Fields shared by every inbound event and message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// The receiving official account.
    pub to_user_name: String,
    /// The sending user's openid.
    pub from_user_name: String,
    /// Unix seconds.
    pub create_time: u64,
}

impl Header {
    pub fn from_raw(raw: &RawEnvelope) -> Result<Self> {
        Ok(Self {
            to_user_name: raw.text("ToUserName"),
            from_user_name: raw.text("FromUserName"),
            create_time: raw.number("CreateTime")?,
        })
    }

    /// Address a reply back to the sender of this push.
    pub fn reply(&self, body: ReplyBody) -> Reply {
        Reply::new(&self.from_user_name, &self.to_user_name, body)
    }
}

/// A parsed push: either a subscriber event or a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inbound {
    Event(InboundEvent),
    Message(InboundMessage),
}

impl Inbound {
    pub fn header(&self) -> &Header {
        match self {
            Inbound::Event(event) => event.header(),
            Inbound::Message(message) => message.header(),
        }
    }
}

/// Parse a decoded push body, routing `MsgType == "event"` to
/// [`parse_event`] and everything else to [`parse_message`].
pub fn parse_inbound(raw: &RawEnvelope) -> Result<Inbound> {
    if raw.is_event() {
        parse_event(raw).map(Inbound::Event)
    } else {
        parse_message(raw).map(Inbound::Message)
    }
}
