//! Client SDK for the Weixin official-account platform.
//!
//! This crate covers the two halves of an official-account integration:
//! the **inbound webhook** the platform pushes events and messages to, and
//! the **outbound HTTP API** authenticated with a platform-issued access
//! token.
//!
//! ## Guarantees
//! - At most one credential is trusted as current per manager instance
//! - Every authenticated call is retried at most once, and only after the
//!   platform reported the credential expired
//! - Inbound discriminators map to variants exhaustively; unknown tags are
//!   rejected, never guessed
//! - Reply text is CDATA-wrapped and cannot break the reply document
//!
//! ## Non-Guarantees
//! - Credential coordination across processes sharing one app identity
//! - Webhook signature verification
//! - Deduplication of redelivered pushes
//!
//! The HTTP server hosting the webhook is the caller's: translate the request
//! into a [`WebhookRequest`] and the [`WebhookResponse`] back.

mod client;
mod config;
mod credential;
mod envelope;
mod error;
mod event;
mod media;
mod menu;
mod message;
mod qrcode;
mod reply;
mod send;
mod types;
mod webhook;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_REFRESH_INTERVAL, PLATFORM_TOKEN_TTL};
pub use credential::{
    AutoRefresh, CredentialIssuer, CredentialManager, CredentialManagerExt,
    MemoryCredentialManager, PlatformIssuer,
};
pub use envelope::{parse_inbound, Header, Inbound, RawEnvelope};
pub use error::{
    check_response, classify, Error, Result, CREDENTIAL_EXPIRED_CODES, USER_UNSUBSCRIBED_CODE,
};
pub use event::{
    parse_event, EventKind, InboundEvent, LocationEvent, MenuEvent, ScanEvent, SubscribeEvent,
    UnsubscribeEvent,
};
pub use media::{mime_extension, MediaData, DEFAULT_MEDIA_MIME};
pub use menu::{MenuButton, MenuItem, MenuItemKind};
pub use message::{
    parse_message, ImageMessage, InboundMessage, LinkMessage, LocationMessage, MessageKind,
    TextMessage, VideoMessage, VoiceMessage,
};
pub use qrcode::{display_url, QrCode, QrCodeRequest, QrScene};
pub use reply::{cdata, Article, Music, Reply, ReplyBody};
pub use send::{
    MediaBody, MenuBody, MenuOption, MiniProgramPageBody, MusicBody, SendBody, SendContent,
    TextBody, VideoBody,
};
pub use types::{AppIdentity, Credential, Lang, MediaKind, UserInfo};
pub use webhook::{
    decode_body, handler_fn, Handler, HandlerFn, WebhookDispatcher, WebhookRequest,
    WebhookResponse, ACKNOWLEDGEMENT, CHALLENGE_PARAM,
};
