use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::{parse_inbound, Inbound, RawEnvelope};
use crate::error::{Error, Result};
use crate::event::InboundEvent;
use crate::message::InboundMessage;
use crate::reply::Reply;

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Body returned when a push produces no reply.
pub const ACKNOWLEDGEMENT: &str = "success";

/// Query parameter carrying the verification handshake challenge.
pub const CHALLENGE_PARAM: &str = "echostr";

pub const XML_CONTENT_TYPE: &str = "text/xml";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Transport-neutral view of an inbound webhook call.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub content_type: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl WebhookRequest {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: None,
            query: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Challenge value of a verification handshake, if this is one.
    pub fn challenge(&self) -> Option<&str> {
        self.query
            .get(CHALLENGE_PARAM)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Response to hand back to the HTTP layer. Always status 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub content_type: &'static str,
    pub body: String,
}

impl WebhookResponse {
    fn plain(body: impl Into<String>) -> Self {
        Self {
            content_type: TEXT_CONTENT_TYPE,
            body: body.into(),
        }
    }

    fn acknowledgement() -> Self {
        Self::plain(ACKNOWLEDGEMENT)
    }

    fn reply(reply: &Reply) -> Result<Self> {
        Ok(Self {
            content_type: XML_CONTENT_TYPE,
            body: reply.to_xml()?,
        })
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.content_type == TEXT_CONTENT_TYPE && self.body == ACKNOWLEDGEMENT
    }
}

/// Handles one family of inbound pushes, optionally producing a reply.
#[async_trait]
pub trait Handler<T: Send + 'static>: Send + Sync {
    async fn handle(&self, input: T) -> Result<Option<Reply>>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F>(F);

pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn(f)
}

#[async_trait]
impl<T, F, Fut> Handler<T> for HandlerFn<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Reply>>> + Send + 'static,
{
    async fn handle(&self, input: T) -> Result<Option<Reply>> {
        (self.0)(input).await
    }
}

/// Routes inbound webhook calls to the registered handlers.
///
/// Handler errors are returned unchanged; the hosting HTTP layer should turn
/// them into a generic server error without leaking details to the platform.
#[derive(Default, Clone)]
pub struct WebhookDispatcher {
    event_handler: Option<Arc<dyn Handler<InboundEvent>>>,
    message_handler: Option<Arc<dyn Handler<InboundMessage>>>,
}

impl WebhookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(mut self, handler: impl Handler<InboundEvent> + 'static) -> Self {
        self.event_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_message(mut self, handler: impl Handler<InboundMessage> + 'static) -> Self {
        self.message_handler = Some(Arc::new(handler));
        self
    }

    /// Process one webhook call.
    pub async fn dispatch(&self, request: &WebhookRequest) -> Result<WebhookResponse> {
        if let Some(challenge) = request.challenge() {
            tracing::info!(echostr = %challenge, "webhook verification handshake");
            metric_inc("weixin.webhook.verified");
            return Ok(WebhookResponse::plain(challenge));
        }

        let raw = decode_body(request.content_type.as_deref(), &request.body)?;
        if raw.is_empty() {
            tracing::debug!(content_type = ?request.content_type, "webhook body carried no push");
            return Ok(WebhookResponse::acknowledgement());
        }

        let reply = match parse_inbound(&raw)? {
            Inbound::Event(event) => {
                tracing::debug!(
                    kind = %event.kind(),
                    from = %event.header().from_user_name,
                    "received event"
                );
                metric_inc("weixin.webhook.event");
                match &self.event_handler {
                    Some(handler) => handler.handle(event).await?,
                    None => None,
                }
            }
            Inbound::Message(message) => {
                tracing::debug!(
                    kind = %message.kind(),
                    from = %message.header().from_user_name,
                    "received message"
                );
                metric_inc("weixin.webhook.message");
                match &self.message_handler {
                    Some(handler) => handler.handle(message).await?,
                    None => None,
                }
            }
        };

        match reply {
            Some(reply) => WebhookResponse::reply(&reply),
            None => Ok(WebhookResponse::acknowledgement()),
        }
    }
}

/// Decode a push body according to its declared content type.
///
/// Only the mime essence is compared, case-insensitively. Unrecognized or
/// missing content types decode to an empty envelope.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<RawEnvelope> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        XML_CONTENT_TYPE => {
            let text = std::str::from_utf8(body)
                .map_err(|e| Error::decode(format!("webhook body is not utf-8: {e}")))?;
            RawEnvelope::from_xml(text)
        }
        JSON_CONTENT_TYPE => RawEnvelope::from_json(body),
        _ => Ok(RawEnvelope::new()),
    }
}
