use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBody {
    pub media_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoBody {
    pub media_id: String,
    pub thumb_media_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicBody {
    pub title: String,
    pub description: String,
    pub musicurl: String,
    pub hqmusicurl: String,
    pub thumb_media_id: String,
}

/// One tappable option of a menu message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuBody {
    pub head_content: String,
    pub list: Vec<MenuOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgramPageBody {
    pub title: String,
    pub appid: String,
    pub pagepath: String,
    pub thumb_media_id: String,
}

/// Payload of a custom-send message, tagged by `msgtype`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum SendBody {
    Text { text: TextBody },
    Image { image: MediaBody },
    Voice { voice: MediaBody },
    Video { video: VideoBody },
    Music { music: MusicBody },
    #[serde(rename = "msgmenu")]
    Menu { msgmenu: MenuBody },
    #[serde(rename = "miniprogrampage")]
    MiniProgramPage { miniprogrampage: MiniProgramPageBody },
}

impl SendBody {
    pub fn msg_type(&self) -> &'static str {
        match self {
            SendBody::Text { .. } => "text",
            SendBody::Image { .. } => "image",
            SendBody::Voice { .. } => "voice",
            SendBody::Video { .. } => "video",
            SendBody::Music { .. } => "music",
            SendBody::Menu { .. } => "msgmenu",
            SendBody::MiniProgramPage { .. } => "miniprogrampage",
        }
    }
}

/// A message pushed through the custom-send API.
///
/// Unlike a [`Reply`](crate::Reply) it is not bound to a webhook call and is
/// authenticated independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendContent {
    pub touser: String,
    #[serde(flatten)]
    pub body: SendBody,
}

impl SendContent {
    pub fn new(touser: impl Into<String>, body: SendBody) -> Self {
        Self {
            touser: touser.into(),
            body,
        }
    }

    pub fn text(touser: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            touser,
            SendBody::Text {
                text: TextBody {
                    content: content.into(),
                },
            },
        )
    }

    pub fn image(touser: impl Into<String>, media_id: impl Into<String>) -> Self {
        Self::new(
            touser,
            SendBody::Image {
                image: MediaBody {
                    media_id: media_id.into(),
                },
            },
        )
    }

    pub fn voice(touser: impl Into<String>, media_id: impl Into<String>) -> Self {
        Self::new(
            touser,
            SendBody::Voice {
                voice: MediaBody {
                    media_id: media_id.into(),
                },
            },
        )
    }

    pub fn video(touser: impl Into<String>, video: VideoBody) -> Self {
        Self::new(touser, SendBody::Video { video })
    }

    pub fn music(touser: impl Into<String>, music: MusicBody) -> Self {
        Self::new(touser, SendBody::Music { music })
    }

    pub fn menu(touser: impl Into<String>, msgmenu: MenuBody) -> Self {
        Self::new(touser, SendBody::Menu { msgmenu })
    }

    pub fn mini_program_page(touser: impl Into<String>, page: MiniProgramPageBody) -> Self {
        Self::new(
            touser,
            SendBody::MiniProgramPage {
                miniprogrampage: page,
            },
        )
    }

    /// Wire encoding expected by the custom-send endpoint.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
