use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::AppIdentity;

/// Nominal access-token validity announced by the platform.
pub const PLATFORM_TOKEN_TTL: Duration = Duration::from_secs(7200);

/// Default background refresh period, comfortably inside [`PLATFORM_TOKEN_TTL`].
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(6000);

/// Client configuration.
///
/// Built in code with the `with_*` methods or loaded from `WEIXIN_*`
/// environment variables with [`ClientConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub app_id: String,
    pub app_secret: String,

    /// The official account's own user name (`gh_...`), used as the
    /// sender of webhook replies.
    #[serde(default)]
    pub account_name: String,

    /// Base URL of the platform API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL QR code tickets are redeemed at.
    #[serde(default = "default_qrcode_base")]
    pub qrcode_base: String,

    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Background credential refresh period. Disabled when absent.
    #[serde(default)]
    pub auto_refresh_secs: Option<u64>,
}

fn default_api_base() -> String {
    "https://api.weixin.qq.com".to_string()
}

fn default_qrcode_base() -> String {
    "https://mp.weixin.qq.com/cgi-bin/showqrcode".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl ClientConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            account_name: String::new(),
            api_base: default_api_base(),
            qrcode_base: default_qrcode_base(),
            request_timeout_secs: default_request_timeout_secs(),
            auto_refresh_secs: None,
        }
    }

    /// Load from `WEIXIN_APP_ID`, `WEIXIN_APP_SECRET`, `WEIXIN_ACCOUNT_NAME`,
    /// `WEIXIN_API_BASE`, `WEIXIN_QRCODE_BASE`, `WEIXIN_REQUEST_TIMEOUT_SECS`
    /// and `WEIXIN_AUTO_REFRESH_SECS`.
    pub fn from_env() -> Result<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("WEIXIN").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn with_account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = account_name.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_qrcode_base(mut self, qrcode_base: impl Into<String>) -> Self {
        self.qrcode_base = qrcode_base.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Enable background credential refresh every `period`.
    pub fn with_auto_refresh(mut self, period: Duration) -> Self {
        self.auto_refresh_secs = Some(period.as_secs().max(1));
        self
    }

    pub fn identity(&self) -> AppIdentity {
        AppIdentity::new(&self.app_id, &self.app_secret)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn auto_refresh(&self) -> Option<Duration> {
        self.auto_refresh_secs.map(Duration::from_secs)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}
