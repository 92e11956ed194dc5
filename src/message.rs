use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::envelope::{Header, RawEnvelope};
use crate::error::{Error, Result};

/// Discriminator of an inbound user message (`MsgType` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Voice,
    Video,
    Location,
    Link,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::Text,
        MessageKind::Image,
        MessageKind::Voice,
        MessageKind::Video,
        MessageKind::Location,
        MessageKind::Link,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Voice => "voice",
            MessageKind::Video => "video",
            MessageKind::Location => "location",
            MessageKind::Link => "link",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| Error::UnknownVariant {
                family: "message",
                tag: tag.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub header: Header,
    pub msg_id: u64,
    pub content: String,
    /// Set when the text is a tap on a menu message option.
    pub bizmsgmenuid: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMessage {
    pub header: Header,
    pub msg_id: u64,
    pub pic_url: String,
    pub media_id: String,
    pub msg_data_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceMessage {
    pub header: Header,
    pub msg_id: u64,
    pub media_id: String,
    /// Codec, e.g. `amr` or `speex`.
    pub format: String,
    pub msg_data_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMessage {
    pub header: Header,
    pub msg_id: u64,
    pub media_id: String,
    pub thumb_media_id: String,
    pub msg_data_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMessage {
    pub header: Header,
    pub msg_id: u64,
    pub location_x: f64,
    pub location_y: f64,
    pub scale: u32,
    pub label: String,
    pub msg_data_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMessage {
    pub header: Header,
    pub msg_id: u64,
    pub title: String,
    pub description: String,
    pub url: String,
    pub msg_data_id: String,
}

/// Inbound user message, one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundMessage {
    Text(TextMessage),
    Image(ImageMessage),
    Voice(VoiceMessage),
    Video(VideoMessage),
    Location(LocationMessage),
    Link(LinkMessage),
}

impl InboundMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundMessage::Text(_) => MessageKind::Text,
            InboundMessage::Image(_) => MessageKind::Image,
            InboundMessage::Voice(_) => MessageKind::Voice,
            InboundMessage::Video(_) => MessageKind::Video,
            InboundMessage::Location(_) => MessageKind::Location,
            InboundMessage::Link(_) => MessageKind::Link,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            InboundMessage::Text(m) => &m.header,
            InboundMessage::Image(m) => &m.header,
            InboundMessage::Voice(m) => &m.header,
            InboundMessage::Video(m) => &m.header,
            InboundMessage::Location(m) => &m.header,
            InboundMessage::Link(m) => &m.header,
        }
    }

    pub fn msg_id(&self) -> u64 {
        match self {
            InboundMessage::Text(m) => m.msg_id,
            InboundMessage::Image(m) => m.msg_id,
            InboundMessage::Voice(m) => m.msg_id,
            InboundMessage::Video(m) => m.msg_id,
            InboundMessage::Location(m) => m.msg_id,
            InboundMessage::Link(m) => m.msg_id,
        }
    }
}

/// Parse a user message from a decoded push body, selecting the variant by
/// `MsgType`.
pub fn parse_message(raw: &RawEnvelope) -> Result<InboundMessage> {
    let kind: MessageKind = raw.get("MsgType").unwrap_or_default().parse()?;
    let header = Header::from_raw(raw)?;
    let msg_id = raw.number("MsgId")?;

    let message = match kind {
        MessageKind::Text => InboundMessage::Text(TextMessage {
            header,
            msg_id,
            content: raw.text("Content"),
            bizmsgmenuid: raw.opt_number("bizmsgmenuid")?,
        }),
        MessageKind::Image => InboundMessage::Image(ImageMessage {
            header,
            msg_id,
            pic_url: raw.text("PicUrl"),
            media_id: raw.text("MediaId"),
            msg_data_id: raw.text("MsgDataId"),
        }),
        MessageKind::Voice => InboundMessage::Voice(VoiceMessage {
            header,
            msg_id,
            media_id: raw.text("MediaId"),
            format: raw.text("Format"),
            msg_data_id: raw.text("MsgDataId"),
        }),
        MessageKind::Video => InboundMessage::Video(VideoMessage {
            header,
            msg_id,
            media_id: raw.text("MediaId"),
            thumb_media_id: raw.text("ThumbMediaId"),
            msg_data_id: raw.text("MsgDataId"),
        }),
        MessageKind::Location => InboundMessage::Location(LocationMessage {
            header,
            msg_id,
            location_x: raw.number("Location_X")?,
            location_y: raw.number("Location_Y")?,
            scale: raw.number("Scale")?,
            label: raw.text("Label"),
            msg_data_id: raw.text("MsgDataId"),
        }),
        MessageKind::Link => InboundMessage::Link(LinkMessage {
            header,
            msg_id,
            title: raw.text("Title"),
            description: raw.text("Description"),
            url: raw.text("Url"),
            msg_data_id: raw.text("MsgDataId"),
        }),
    };

    Ok(message)
}
