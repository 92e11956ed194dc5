use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::envelope::{Header, RawEnvelope};
use crate::error::{Error, Result};

/// Discriminator of an inbound event (`Event` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "subscribe")]
    Subscribe,
    #[serde(rename = "unsubscribe")]
    Unsubscribe,
    #[serde(rename = "SCAN")]
    Scan,
    #[serde(rename = "LOCATION")]
    Location,
    #[serde(rename = "CLICK")]
    Click,
    #[serde(rename = "VIEW")]
    View,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Subscribe,
        EventKind::Unsubscribe,
        EventKind::Scan,
        EventKind::Location,
        EventKind::Click,
        EventKind::View,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Subscribe => "subscribe",
            EventKind::Unsubscribe => "unsubscribe",
            EventKind::Scan => "SCAN",
            EventKind::Location => "LOCATION",
            EventKind::Click => "CLICK",
            EventKind::View => "VIEW",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| Error::UnknownVariant {
                family: "event",
                tag: tag.to_string(),
            })
    }
}

/// A user followed the account, possibly by scanning a parametric QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeEvent {
    pub header: Header,
    /// `qrscene_<scene>` when the follow came from a QR code.
    pub event_key: Option<String>,
    pub ticket: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeEvent {
    pub header: Header,
}

/// An existing follower scanned a parametric QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub header: Header,
    pub event_key: String,
    pub ticket: String,
}

/// Periodic location report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEvent {
    pub header: Header,
    pub latitude: f64,
    pub longitude: f64,
    pub precision: f64,
}

/// Custom menu interaction. Shared by `CLICK` (key) and `VIEW` (url).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEvent {
    pub header: Header,
    pub event_key: String,
}

/// Inbound event, one variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundEvent {
    Subscribe(SubscribeEvent),
    Unsubscribe(UnsubscribeEvent),
    Scan(ScanEvent),
    Location(LocationEvent),
    Click(MenuEvent),
    View(MenuEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::Subscribe(_) => EventKind::Subscribe,
            InboundEvent::Unsubscribe(_) => EventKind::Unsubscribe,
            InboundEvent::Scan(_) => EventKind::Scan,
            InboundEvent::Location(_) => EventKind::Location,
            InboundEvent::Click(_) => EventKind::Click,
            InboundEvent::View(_) => EventKind::View,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            InboundEvent::Subscribe(e) => &e.header,
            InboundEvent::Unsubscribe(e) => &e.header,
            InboundEvent::Scan(e) => &e.header,
            InboundEvent::Location(e) => &e.header,
            InboundEvent::Click(e) | InboundEvent::View(e) => &e.header,
        }
    }
}

/// Parse an event from a decoded push body, selecting the variant by `Event`.
pub fn parse_event(raw: &RawEnvelope) -> Result<InboundEvent> {
    let kind: EventKind = raw.get("Event").unwrap_or_default().parse()?;
    let header = Header::from_raw(raw)?;

    let event = match kind {
        EventKind::Subscribe => InboundEvent::Subscribe(SubscribeEvent {
            header,
            event_key: raw.opt_text("EventKey"),
            ticket: raw.opt_text("Ticket"),
        }),
        EventKind::Unsubscribe => InboundEvent::Unsubscribe(UnsubscribeEvent { header }),
        EventKind::Scan => InboundEvent::Scan(ScanEvent {
            header,
            event_key: raw.text("EventKey"),
            ticket: raw.text("Ticket"),
        }),
        EventKind::Location => InboundEvent::Location(LocationEvent {
            header,
            latitude: raw.number("Latitude")?,
            longitude: raw.number("Longitude")?,
            precision: raw.number("Precision")?,
        }),
        EventKind::Click => InboundEvent::Click(MenuEvent {
            header,
            event_key: raw.text("EventKey"),
        }),
        EventKind::View => InboundEvent::View(MenuEvent {
            header,
            event_key: raw.text("EventKey"),
        }),
    };

    Ok(event)
}
