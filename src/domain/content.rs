//! Rich content model pulled from the CMS: annotated text spans and the
//! typed blocks that make up a document body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Icon rendered for callouts that do not carry an emoji of their own.
pub const DEFAULT_CALLOUT_ICON: &str = "💡";

/// A single inline formatting flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl Annotation {
    /// Fixed nesting order used when wrapping a span, innermost first.
    pub const NESTING: [Annotation; 5] = [
        Annotation::Bold,
        Annotation::Italic,
        Annotation::Underline,
        Annotation::Strikethrough,
        Annotation::Code,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Annotation::Bold => "strong",
            Annotation::Italic => "em",
            Annotation::Underline => "u",
            Annotation::Strikethrough => "s",
            Annotation::Code => "code",
        }
    }
}

/// Set of inline annotations applied to a span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl Annotations {
    pub fn contains(&self, annotation: Annotation) -> bool {
        match annotation {
            Annotation::Bold => self.bold,
            Annotation::Italic => self.italic,
            Annotation::Underline => self.underline,
            Annotation::Strikethrough => self.strikethrough,
            Annotation::Code => self.code,
        }
    }

    pub fn insert(&mut self, annotation: Annotation) {
        match annotation {
            Annotation::Bold => self.bold = true,
            Annotation::Italic => self.italic = true,
            Annotation::Underline => self.underline = true,
            Annotation::Strikethrough => self.strikethrough = true,
            Annotation::Code => self.code = true,
        }
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut annotations = Annotations::default();
        for annotation in iter {
            annotations.insert(annotation);
        }
        annotations
    }
}

/// One run of text sharing the same inline formatting and link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    #[serde(rename = "plain_text", default)]
    pub text: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(rename = "href", default)]
    pub link: Option<String>,
}

impl TextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        self.annotations = annotations.into_iter().collect();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Parse a CMS rich-text array. Anything that is not an array yields no spans;
/// individual entries that fail to parse are dropped.
pub fn spans_from_value(value: &Value) -> Vec<TextSpan> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match TextSpan::deserialize(item) {
            Ok(span) => Some(span),
            Err(err) => {
                debug!(
                    target = "sitesync::domain::content",
                    error = %err,
                    "Dropping unparseable rich text span"
                );
                None
            }
        })
        .collect()
}

/// Plain text of a span sequence with all formatting stripped.
pub fn plain_text(spans: &[TextSpan]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Number => "ol",
        }
    }
}

/// One structural unit of rich content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Paragraph(Vec<TextSpan>),
    Heading1(Vec<TextSpan>),
    Heading2(Vec<TextSpan>),
    Heading3(Vec<TextSpan>),
    BulletItem(Vec<TextSpan>),
    NumberItem(Vec<TextSpan>),
    Quote(Vec<TextSpan>),
    Code(Vec<TextSpan>),
    Divider,
    Callout {
        icon: String,
        spans: Vec<TextSpan>,
    },
    Image {
        url: Option<String>,
        caption: Vec<TextSpan>,
    },
    /// A block kind this pipeline does not render.
    Unsupported {
        kind: String,
    },
}

impl ContentBlock {
    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            ContentBlock::BulletItem(_) => Some(ListKind::Bullet),
            ContentBlock::NumberItem(_) => Some(ListKind::Number),
            _ => None,
        }
    }

    /// Parse a block object as returned by the CMS block-children endpoint.
    pub fn from_value(value: &Value) -> Self {
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return ContentBlock::Unsupported {
                kind: "unknown".to_string(),
            };
        };

        let payload = value.get(kind).unwrap_or(&Value::Null);
        let rich_text = || spans_from_value(payload.get("rich_text").unwrap_or(&Value::Null));

        match kind {
            "paragraph" => ContentBlock::Paragraph(rich_text()),
            "heading_1" => ContentBlock::Heading1(rich_text()),
            "heading_2" => ContentBlock::Heading2(rich_text()),
            "heading_3" => ContentBlock::Heading3(rich_text()),
            "bulleted_list_item" => ContentBlock::BulletItem(rich_text()),
            "numbered_list_item" => ContentBlock::NumberItem(rich_text()),
            "quote" => ContentBlock::Quote(rich_text()),
            "code" => ContentBlock::Code(rich_text()),
            "divider" => ContentBlock::Divider,
            "callout" => ContentBlock::Callout {
                icon: payload
                    .pointer("/icon/emoji")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_CALLOUT_ICON)
                    .to_string(),
                spans: rich_text(),
            },
            "image" => ContentBlock::Image {
                url: file_url(payload),
                caption: spans_from_value(payload.get("caption").unwrap_or(&Value::Null)),
            },
            other => ContentBlock::Unsupported {
                kind: other.to_string(),
            },
        }
    }
}

/// Resolve the URL of a CMS file object, preferring hosted files over
/// external links.
pub fn file_url(file: &Value) -> Option<String> {
    file.pointer("/file/url")
        .or_else(|| file.pointer("/external/url"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
