use serde::{Deserialize, Serialize};

/// Action performed by a menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItemKind {
    Click,
    View,
    ScancodePush,
    ScancodeWaitmsg,
    PicSysphoto,
    PicPhotoOrAlbum,
    PicWeixin,
    LocationSelect,
    MediaId,
    ArticleId,
    ArticleViewLimited,
    #[serde(rename = "miniprogram")]
    MiniProgram,
}

/// A clickable menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MenuItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, kind: MenuItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            key: None,
            url: None,
            media_id: None,
            appid: None,
            pagepath: None,
            article_id: None,
        }
    }

    /// Entry that pushes a `CLICK` event carrying `key`.
    pub fn click(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, MenuItemKind::Click).with_key(key)
    }

    /// Entry that opens `url` and pushes a `VIEW` event.
    pub fn view(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, MenuItemKind::View).with_url(url)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_media_id(mut self, media_id: impl Into<String>) -> Self {
        self.media_id = Some(media_id.into());
        self
    }

    pub fn with_mini_program(
        mut self,
        appid: impl Into<String>,
        pagepath: impl Into<String>,
    ) -> Self {
        self.appid = Some(appid.into());
        self.pagepath = Some(pagepath.into());
        self
    }

    pub fn with_article_id(mut self, article_id: impl Into<String>) -> Self {
        self.article_id = Some(article_id.into());
        self
    }
}

/// Top-level menu button: a single entry or a named group of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuButton {
    Group { name: String, sub_button: Vec<MenuItem> },
    Item(MenuItem),
}

impl MenuButton {
    pub fn group(name: impl Into<String>, items: Vec<MenuItem>) -> Self {
        MenuButton::Group {
            name: name.into(),
            sub_button: items,
        }
    }
}

impl From<MenuItem> for MenuButton {
    fn from(item: MenuItem) -> Self {
        MenuButton::Item(item)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MenuRequest<'a> {
    pub button: &'a [MenuButton],
}
