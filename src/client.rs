use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::credential::{
    AutoRefresh, CredentialManager, CredentialManagerExt, MemoryCredentialManager, PlatformIssuer,
};
use crate::error::{check_response, Result};
use crate::media::{MediaData, UploadResponse, DEFAULT_MEDIA_MIME};
use crate::menu::{MenuButton, MenuRequest};
use crate::qrcode::{QrCode, QrCodeRequest, QrCodeResponse};
use crate::send::SendContent;
use crate::types::{Credential, Lang, MediaKind, UserInfo};

/// Authenticated platform API client.
///
/// Every call runs through
/// [`run_with_credential`](CredentialManagerExt::run_with_credential), so a
/// credential invalidated mid-flight costs one refresh and one retry.
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialManager>,
    auto_refresh: Option<AutoRefresh>,
}

impl Client {
    /// Build a client backed by a [`MemoryCredentialManager`].
    ///
    /// When `config` enables auto refresh, the refresh task is spawned on the
    /// current tokio runtime; without one this returns [`Error::Runtime`](crate::Error::Runtime).
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let issuer = PlatformIssuer::new(http.clone(), &config.api_base, config.identity());
        let manager = Arc::new(MemoryCredentialManager::new(Arc::new(issuer)));
        let auto_refresh = config
            .auto_refresh()
            .map(|period| manager.spawn_auto_refresh(period))
            .transpose()?;

        Ok(Self {
            http,
            config,
            credentials: manager,
            auto_refresh,
        })
    }

    /// Build a client around an existing credential manager, e.g. one backed
    /// by a store shared between processes.
    pub fn with_credential_manager(
        config: ClientConfig,
        http: reqwest::Client,
        credentials: Arc<dyn CredentialManager>,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
            auto_refresh: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialManager> {
        &self.credentials
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh.as_ref().is_some_and(AutoRefresh::is_running)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.config.endpoint(path);
        self.credentials
            .run_with_credential(|credential: Credential| {
                let request = self
                    .http
                    .get(&url)
                    .query(&[("access_token", credential.as_str())])
                    .query(query);
                async move {
                    let body: Value = request.send().await?.json().await?;
                    check_response(body)
                }
            })
            .await
    }

    async fn post_json<B>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<Value>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.config.endpoint(path);
        let payload = serde_json::to_vec(body)?;
        self.credentials
            .run_with_credential(|credential: Credential| {
                let request = self
                    .http
                    .post(&url)
                    .query(&[("access_token", credential.as_str())])
                    .query(query)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(payload.clone());
                async move {
                    let body: Value = request.send().await?.json().await?;
                    check_response(body)
                }
            })
            .await
    }

    /// Push a message through the custom-send API.
    pub async fn send_message(&self, content: &SendContent) -> Result<()> {
        tracing::debug!(
            touser = %content.touser,
            msgtype = content.body.msg_type(),
            "sending custom message"
        );
        self.post_json("/cgi-bin/message/custom/send", &[], content)
            .await?;
        Ok(())
    }

    /// Look up a subscriber's profile.
    pub async fn user_info(&self, openid: &str, lang: Lang) -> Result<UserInfo> {
        let body = self
            .get_json("/cgi-bin/user/info", &[("openid", openid), ("lang", lang.as_str())])
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Upload temporary media and return its media id.
    pub async fn upload_media(&self, kind: MediaKind, media: MediaData) -> Result<String> {
        let url = self.config.endpoint("/cgi-bin/media/upload");
        let file_name = media.file_name();

        let body = self
            .credentials
            .run_with_credential(|credential: Credential| {
                let request = self
                    .http
                    .post(&url)
                    .query(&[("access_token", credential.as_str()), ("type", kind.as_str())]);
                let bytes = media.bytes.clone();
                let file_name = file_name.clone();
                let mime = media.mime.clone();
                async move {
                    let part = Part::bytes(bytes).file_name(file_name).mime_str(&mime)?;
                    let form = Form::new().part("media", part);
                    let body: Value = request.multipart(form).send().await?.json().await?;
                    check_response(body)
                }
            })
            .await?;

        let response: UploadResponse = serde_json::from_value(body)?;
        tracing::debug!(
            kind = kind.as_str(),
            media_id = %response.media_id,
            "uploaded temporary media"
        );
        Ok(response.media_id)
    }

    /// Fetch `source_url` and upload it as temporary media.
    ///
    /// The mime type comes from the fetched response's `Content-Type`.
    pub async fn upload_media_from_url(&self, kind: MediaKind, source_url: &str) -> Result<String> {
        let response = self.http.get(source_url).send().await?.error_for_status()?;
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| DEFAULT_MEDIA_MIME.to_string());
        let bytes = response.bytes().await?.to_vec();

        self.upload_media(kind, MediaData::new(bytes, mime)).await
    }

    /// Upload base64 or data-URL encoded media.
    pub async fn upload_media_base64(
        &self,
        kind: MediaKind,
        data: &str,
        mime: Option<&str>,
    ) -> Result<String> {
        let media = MediaData::from_base64(data, mime)?;
        self.upload_media(kind, media).await
    }

    /// Generate a parametric QR code.
    pub async fn create_qr_code(&self, request: &QrCodeRequest) -> Result<QrCode> {
        let body = self
            .post_json("/cgi-bin/qrcode/create", &[], &request.body())
            .await?;
        let response: QrCodeResponse = serde_json::from_value(body)?;
        Ok(QrCode::from_response(response, &self.config.qrcode_base))
    }

    /// Replace the custom menu.
    pub async fn create_menu(&self, buttons: &[MenuButton]) -> Result<()> {
        self.post_json("/cgi-bin/menu/create", &[], &MenuRequest { button: buttons })
            .await?;
        Ok(())
    }

    /// Remove the custom menu.
    pub async fn delete_menu(&self) -> Result<()> {
        self.get_json("/cgi-bin/menu/delete", &[]).await?;
        Ok(())
    }
}
