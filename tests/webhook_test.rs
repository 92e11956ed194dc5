use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use weixin_sdk::{
    decode_body, handler_fn, Error, Handler, InboundEvent, InboundMessage, RawEnvelope, Reply,
    ReplyBody, Result, WebhookDispatcher, WebhookRequest, ACKNOWLEDGEMENT,
};

const TEXT_PUSH: &str = "<xml>\
    <ToUserName><![CDATA[gh_account]]></ToUserName>\
    <FromUserName><![CDATA[user-openid]]></FromUserName>\
    <CreateTime>1700000000</CreateTime>\
    <MsgType><![CDATA[text]]></MsgType>\
    <Content><![CDATA[ping]]></Content>\
    <MsgId>1</MsgId>\
    </xml>";

/// Counts invocations and answers text messages with "pong".
#[derive(Clone, Default)]
struct EchoHandler {
    calls: Arc<AtomicUsize>,
}

impl EchoHandler {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler<InboundMessage> for EchoHandler {
    async fn handle(&self, message: InboundMessage) -> Result<Option<Reply>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match message {
            InboundMessage::Text(text) => Ok(Some(text.header.reply(ReplyBody::text("pong")))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Handler<InboundEvent> for EchoHandler {
    async fn handle(&self, _event: InboundEvent) -> Result<Option<Reply>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn test_verification_challenge_is_echoed() {
    let handler = EchoHandler::default();
    let dispatcher = WebhookDispatcher::new()
        .on_message(handler.clone())
        .on_event(handler.clone());

    let request = WebhookRequest::new("not a push body")
        .with_content_type("text/xml")
        .with_query("echostr", "abc123")
        .with_query("signature", "ignored");
    let response = dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(response.body, "abc123");
    assert_eq!(response.content_type, "text/plain");
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_push_without_handler_is_acknowledged() {
    let dispatcher = WebhookDispatcher::new();
    let request = WebhookRequest::new(TEXT_PUSH).with_content_type("text/xml");

    let response = dispatcher.dispatch(&request).await.unwrap();

    assert!(response.is_acknowledgement());
    assert_eq!(response.body, ACKNOWLEDGEMENT);
}

#[tokio::test]
async fn test_message_handler_reply_is_rendered() {
    let handler = EchoHandler::default();
    let dispatcher = WebhookDispatcher::new().on_message(handler.clone());
    let request = WebhookRequest::new(TEXT_PUSH).with_content_type("text/xml; charset=utf-8");

    let response = dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(response.content_type, "text/xml");
    let reply = RawEnvelope::from_xml(&response.body).unwrap();
    assert_eq!(reply.get("MsgType"), Some("text"));
    assert_eq!(reply.get("Content"), Some("pong"));
    assert_eq!(reply.get("ToUserName"), Some("user-openid"));
    assert_eq!(reply.get("FromUserName"), Some("gh_account"));
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn test_json_subscribe_from_qr_code() {
    let seen = Arc::new(std::sync::Mutex::new(None));
    let recorder = seen.clone();

    let dispatcher = WebhookDispatcher::new().on_event(handler_fn(move |event: InboundEvent| {
        let recorder = recorder.clone();
        async move {
            let reply = event.header().reply(ReplyBody::text("hi"));
            if let InboundEvent::Subscribe(subscribe) = event {
                *recorder.lock().unwrap() = subscribe.event_key;
            }
            Ok::<_, Error>(Some(reply))
        }
    }));

    let body = json!({
        "xml": {
            "ToUserName": "gh_account",
            "FromUserName": "user-openid",
            "CreateTime": 1700000000,
            "MsgType": "event",
            "Event": "subscribe",
            "EventKey": "qrscene_42"
        }
    });
    let request = WebhookRequest::new(body.to_string()).with_content_type("application/json");
    let response = dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(seen.lock().unwrap().as_deref(), Some("qrscene_42"));
    assert_eq!(response.content_type, "text/xml");
    assert!(response.body.contains("<MsgType><![CDATA[text]]></MsgType>"));
    assert!(response.body.contains("<Content><![CDATA[hi]]></Content>"));
    assert!(response.body.contains("<ToUserName><![CDATA[user-openid]]></ToUserName>"));
}

#[tokio::test]
async fn test_events_do_not_reach_message_handler() {
    let handler = EchoHandler::default();
    let dispatcher = WebhookDispatcher::new().on_message(handler.clone());

    let body = json!({"xml": {"MsgType": "event", "Event": "unsubscribe", "FromUserName": "u"}});
    let request = WebhookRequest::new(body.to_string()).with_content_type("application/json");
    let response = dispatcher.dispatch(&request).await.unwrap();

    assert!(response.is_acknowledgement());
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_unrecognized_content_type_is_acknowledged() {
    let handler = EchoHandler::default();
    let dispatcher = WebhookDispatcher::new().on_message(handler.clone());

    for content_type in [Some("text/html"), Some("application/x-www-form-urlencoded"), None] {
        let mut request = WebhookRequest::new(TEXT_PUSH);
        request.content_type = content_type.map(str::to_string);

        let response = dispatcher.dispatch(&request).await.unwrap();
        assert!(response.is_acknowledgement());
    }

    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_handler_error_propagates() {
    let failing = handler_fn(|_message: InboundMessage| async {
        Err::<Option<Reply>, _>(Error::handler(std::io::Error::other("database unavailable")))
    });
    let dispatcher = WebhookDispatcher::new().on_message(failing);
    let request = WebhookRequest::new(TEXT_PUSH).with_content_type("text/xml");

    let err = dispatcher.dispatch(&request).await.unwrap_err();

    assert!(matches!(err, Error::Handler(_)));
    assert!(err.to_string().contains("database unavailable"));
}

#[tokio::test]
async fn test_unknown_push_type_is_rejected() {
    let dispatcher = WebhookDispatcher::new();
    let body = json!({"xml": {"MsgType": "event", "Event": "MASSSENDJOBFINISH"}});
    let request = WebhookRequest::new(body.to_string()).with_content_type("application/json");

    let err = dispatcher.dispatch(&request).await.unwrap_err();

    assert!(matches!(err, Error::UnknownVariant { family: "event", .. }));
}

#[test]
fn test_decode_body_matches_essence_case_insensitively() {
    let raw = decode_body(Some("Text/XML; charset=UTF-8"), TEXT_PUSH.as_bytes()).unwrap();
    assert_eq!(raw.get("Content"), Some("ping"));

    let empty = decode_body(Some("text/plain"), TEXT_PUSH.as_bytes()).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_empty_challenge_is_not_a_handshake() {
    let request = WebhookRequest::new(TEXT_PUSH).with_query("echostr", "");
    assert_eq!(request.challenge(), None);
}
