use serde::{Deserialize, Serialize};

/// Scene value embedded in a parametric QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrScene {
    Id(u32),
    Str(String),
}

/// Parameters of a QR code generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodeRequest {
    pub permanent: bool,
    /// Validity of a temporary code in seconds. Ignored for permanent codes.
    pub expire_seconds: u32,
    pub scene: QrScene,
}

impl QrCodeRequest {
    pub fn temporary(expire_seconds: u32, scene: QrScene) -> Self {
        Self {
            permanent: false,
            expire_seconds,
            scene,
        }
    }

    pub fn permanent(scene: QrScene) -> Self {
        Self {
            permanent: true,
            expire_seconds: 0,
            scene,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match (self.permanent, &self.scene) {
            (false, QrScene::Id(_)) => "QR_SCENE",
            (false, QrScene::Str(_)) => "QR_STR_SCENE",
            (true, QrScene::Id(_)) => "QR_LIMIT_SCENE",
            (true, QrScene::Str(_)) => "QR_LIMIT_STR_SCENE",
        }
    }

    pub(crate) fn body(&self) -> QrCodeBody<'_> {
        let scene = match &self.scene {
            QrScene::Id(id) => SceneBody {
                scene_id: Some(*id),
                scene_str: None,
            },
            QrScene::Str(s) => SceneBody {
                scene_id: None,
                scene_str: Some(s),
            },
        };

        QrCodeBody {
            expire_seconds: (!self.permanent).then_some(self.expire_seconds),
            action_name: self.action_name(),
            action_info: ActionInfo { scene },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QrCodeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    expire_seconds: Option<u32>,
    action_name: &'static str,
    action_info: ActionInfo<'a>,
}

#[derive(Debug, Serialize)]
struct ActionInfo<'a> {
    scene: SceneBody<'a>,
}

#[derive(Debug, Serialize)]
struct SceneBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    scene_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene_str: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QrCodeResponse {
    pub ticket: String,
    #[serde(default)]
    pub expire_seconds: Option<u64>,
    pub url: String,
}

/// A generated QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    pub ticket: String,
    /// Absent for permanent codes.
    pub expire_seconds: Option<u64>,
    /// Content encoded in the code.
    pub url: String,
    /// Where the rendered code image can be fetched.
    pub image_url: String,
}

impl QrCode {
    pub(crate) fn from_response(response: QrCodeResponse, qrcode_base: &str) -> Self {
        let image_url = display_url(qrcode_base, &response.ticket);
        Self {
            ticket: response.ticket,
            expire_seconds: response.expire_seconds,
            url: response.url,
            image_url,
        }
    }
}

/// Image URL for a ticket; the ticket is URL-encoded.
pub fn display_url(qrcode_base: &str, ticket: &str) -> String {
    format!("{}?ticket={}", qrcode_base, urlencoding::encode(ticket))
}
