use std::sync::Arc;

use weixin_sdk::{
    handler_fn, Client, ClientConfig, InboundEvent, Reply, ReplyBody, Result, SendContent,
    WebhookDispatcher, WebhookRequest,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::from_env()
        .unwrap_or_else(|_| ClientConfig::new("wx_app_id", "app_secret"));
    let client = Arc::new(Client::new(config)?);

    let api = client.clone();
    let dispatcher = WebhookDispatcher::new().on_event(handler_fn(move |event: InboundEvent| {
        let api = api.clone();
        async move {
            let header = event.header().clone();
            let reply: Result<Option<Reply>> = match event {
                InboundEvent::Subscribe(_) => Ok(Some(header.reply(ReplyBody::text("welcome")))),
                InboundEvent::Click(click) => {
                    let content = format!("you clicked {}", click.event_key);
                    api.send_message(&SendContent::text(&header.from_user_name, content))
                        .await?;
                    Ok(None)
                }
                _ => Ok(None),
            };
            reply
        }
    }));

    let push = "<xml>\
        <ToUserName><![CDATA[gh_account]]></ToUserName>\
        <FromUserName><![CDATA[user-openid]]></FromUserName>\
        <CreateTime>1700000000</CreateTime>\
        <MsgType><![CDATA[event]]></MsgType>\
        <Event><![CDATA[subscribe]]></Event>\
        </xml>";
    let request = WebhookRequest::new(push).with_content_type("text/xml");

    let response = dispatcher.dispatch(&request).await?;
    println!("{}\n{}", response.content_type, response.body);

    Ok(())
}
