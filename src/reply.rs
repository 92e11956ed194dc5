use std::time::{SystemTime, UNIX_EPOCH};

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One entry of a news (article list) reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub pic_url: String,
    pub url: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        pic_url: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            pic_url: pic_url.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Music {
    pub title: Option<String>,
    pub description: Option<String>,
    pub music_url: Option<String>,
    pub hq_music_url: Option<String>,
    pub thumb_media_id: String,
}

/// Content of a passive reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyBody {
    Text {
        content: String,
    },
    Image {
        media_id: String,
    },
    Voice {
        media_id: String,
    },
    Video {
        media_id: String,
        title: String,
        description: String,
    },
    News {
        articles: Vec<Article>,
    },
    Music(Music),
}

impl ReplyBody {
    pub fn text(content: impl Into<String>) -> Self {
        ReplyBody::Text {
            content: content.into(),
        }
    }

    pub fn image(media_id: impl Into<String>) -> Self {
        ReplyBody::Image {
            media_id: media_id.into(),
        }
    }

    pub fn voice(media_id: impl Into<String>) -> Self {
        ReplyBody::Voice {
            media_id: media_id.into(),
        }
    }

    pub fn video(
        media_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        ReplyBody::Video {
            media_id: media_id.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn news(articles: Vec<Article>) -> Self {
        ReplyBody::News { articles }
    }

    /// `MsgType` written into the reply document.
    pub fn msg_type(&self) -> &'static str {
        match self {
            ReplyBody::Text { .. } => "text",
            ReplyBody::Image { .. } => "image",
            ReplyBody::Voice { .. } => "voice",
            ReplyBody::Video { .. } => "video",
            ReplyBody::News { .. } => "news",
            ReplyBody::Music(_) => "music",
        }
    }
}

/// Passive reply returned as the body of a webhook response.
///
/// Must reach the platform within the webhook response window; use
/// [`SendContent`](crate::SendContent) for anything sent later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Recipient openid.
    pub to_user_name: String,
    /// The official account's user name.
    pub from_user_name: String,
    pub body: ReplyBody,
}

impl Reply {
    pub fn new(
        to_user_name: impl Into<String>,
        from_user_name: impl Into<String>,
        body: ReplyBody,
    ) -> Self {
        Self {
            to_user_name: to_user_name.into(),
            from_user_name: from_user_name.into(),
            body,
        }
    }

    pub fn msg_type(&self) -> &'static str {
        self.body.msg_type()
    }

    /// Render the XML document, stamped with the current time.
    pub fn to_xml(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.to_xml_at(now)
    }

    /// Render the XML document with an explicit `CreateTime` (unix seconds).
    pub fn to_xml_at(&self, create_time: u64) -> Result<String> {
        let mut doc = XmlDoc::new();
        doc.open("xml")?;
        doc.cdata("ToUserName", &self.to_user_name)?;
        doc.cdata("FromUserName", &self.from_user_name)?;
        doc.text("CreateTime", &create_time.to_string())?;
        doc.cdata("MsgType", self.msg_type())?;

        match &self.body {
            ReplyBody::Text { content } => {
                doc.cdata("Content", content)?;
            }
            ReplyBody::Image { media_id } => {
                doc.open("Image")?;
                doc.cdata("MediaId", media_id)?;
                doc.close("Image")?;
            }
            ReplyBody::Voice { media_id } => {
                doc.open("Voice")?;
                doc.cdata("MediaId", media_id)?;
                doc.close("Voice")?;
            }
            ReplyBody::Video {
                media_id,
                title,
                description,
            } => {
                doc.open("Video")?;
                doc.cdata("MediaId", media_id)?;
                doc.cdata("Title", title)?;
                doc.cdata("Description", description)?;
                doc.close("Video")?;
            }
            ReplyBody::News { articles } => {
                doc.text("ArticleCount", &articles.len().to_string())?;
                doc.open("Articles")?;
                for article in articles {
                    doc.open("item")?;
                    doc.cdata("Title", &article.title)?;
                    doc.cdata("Description", &article.description)?;
                    doc.cdata("PicUrl", &article.pic_url)?;
                    doc.cdata("Url", &article.url)?;
                    doc.close("item")?;
                }
                doc.close("Articles")?;
            }
            ReplyBody::Music(music) => {
                let opt = |v: &Option<String>| v.clone().unwrap_or_default();
                doc.open("Music")?;
                doc.cdata("Title", &opt(&music.title))?;
                doc.cdata("Description", &opt(&music.description))?;
                doc.cdata("MusicUrl", &opt(&music.music_url))?;
                doc.cdata("HQMusicUrl", &opt(&music.hq_music_url))?;
                doc.cdata("ThumbMediaId", &music.thumb_media_id)?;
                doc.close("Music")?;
            }
        }

        doc.close("xml")?;
        doc.finish()
    }
}

/// Wrap `value` in CDATA. A `]]>` inside `value` is split across two
/// sections so it cannot terminate the block early.
pub fn cdata(value: &str) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for section in cdata_sections(value) {
        writer.write_event(Event::CData(BytesCData::new(section)))?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| Error::decode(e.to_string()))
}

/// Cut `value` right after every `]]` that is followed by `>`.
fn cdata_sections(value: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(value);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find("]]>") {
            Some(at) => {
                let (head, tail) = current.split_at(at + 2);
                rest = Some(tail);
                Some(head)
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// Two-space indented reply document on top of [`quick_xml::Writer`].
struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn open(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn cdata(&mut self, name: &str, value: &str) -> Result<()> {
        self.open(name)?;
        for section in cdata_sections(value) {
            self.writer
                .write_event(Event::CData(BytesCData::new(section)))?;
        }
        self.close(name)
    }

    fn text(&mut self, name: &str, value: &str) -> Result<()> {
        self.open(name)?;
        self.writer.write_event(Event::Text(BytesText::new(value)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String> {
        let mut out = String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::decode(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}
