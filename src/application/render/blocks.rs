//! Block document renderer.
//!
//! Blocks are rendered one at a time, but list items are not standalone in
//! HTML: consecutive items of one kind share a single `<ul>`/`<ol>`. The
//! [`BlockWriter`] tracks which list (if any) is open so that every list it
//! opens is closed exactly once, either when a different block arrives or at
//! the end of the document.

use serde_json::Value;
use tracing::debug;

use crate::domain::content::{ContentBlock, ListKind, TextSpan, plain_text};

use super::html::escape_attribute;
use super::rich_text::render_rich_text;

/// Render an ordered block sequence into an HTML fragment.
pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    let mut writer = BlockWriter::default();
    for block in blocks {
        writer.push(block);
    }
    writer.finish()
}

/// Parse and render raw CMS block objects.
pub fn render_block_values(values: &[Value]) -> String {
    let blocks: Vec<ContentBlock> = values.iter().map(ContentBlock::from_value).collect();
    render_blocks(&blocks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ListState {
    #[default]
    None,
    InBulletList,
    InNumberList,
}

impl ListState {
    fn open_kind(self) -> Option<ListKind> {
        match self {
            ListState::None => None,
            ListState::InBulletList => Some(ListKind::Bullet),
            ListState::InNumberList => Some(ListKind::Number),
        }
    }

    fn entering(kind: ListKind) -> Self {
        match kind {
            ListKind::Bullet => ListState::InBulletList,
            ListKind::Number => ListState::InNumberList,
        }
    }
}

#[derive(Debug, Default)]
struct BlockWriter {
    html: String,
    state: ListState,
}

impl BlockWriter {
    fn push(&mut self, block: &ContentBlock) {
        match (block.list_kind(), list_item_spans(block)) {
            (Some(kind), Some(spans)) => {
                if self.state.open_kind() != Some(kind) {
                    self.close_list();
                    self.html.push('<');
                    self.html.push_str(kind.tag());
                    self.html.push('>');
                    self.state = ListState::entering(kind);
                }
                self.html.push_str("<li>");
                self.html.push_str(&render_rich_text(spans));
                self.html.push_str("</li>");
            }
            _ => {
                self.close_list();
                self.html.push_str(&render_block(block));
            }
        }
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.state.open_kind() {
            self.html.push_str("</");
            self.html.push_str(kind.tag());
            self.html.push('>');
            self.state = ListState::None;
        }
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.html
    }
}

fn list_item_spans(block: &ContentBlock) -> Option<&[TextSpan]> {
    match block {
        ContentBlock::BulletItem(spans) | ContentBlock::NumberItem(spans) => Some(spans),
        _ => None,
    }
}

fn wrap(tag: &str, spans: &[TextSpan]) -> String {
    format!("<{tag}>{}</{tag}>", render_rich_text(spans))
}

/// Markup for a single non-list block.
fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Paragraph(spans) => wrap("p", spans),
        ContentBlock::Heading1(spans) => wrap("h1", spans),
        ContentBlock::Heading2(spans) => wrap("h2", spans),
        ContentBlock::Heading3(spans) => wrap("h3", spans),
        ContentBlock::Quote(spans) => format!(
            "<blockquote class=\"content-quote\">{}</blockquote>",
            render_rich_text(spans)
        ),
        ContentBlock::Code(spans) => format!("<pre><code>{}</code></pre>", render_rich_text(spans)),
        ContentBlock::Divider => "<hr />".to_string(),
        ContentBlock::Callout { icon, spans } => format!(
            "<div class=\"content-callout\"><span class=\"content-callout-icon\">{icon}</span><div class=\"content-callout-body\">{}</div></div>",
            render_rich_text(spans)
        ),
        ContentBlock::Image { url, caption } => render_image(url.as_deref(), caption),
        ContentBlock::Unsupported { kind } => {
            debug!(
                target = "sitesync::render::blocks",
                kind = kind.as_str(),
                "Skipping unsupported block"
            );
            String::new()
        }
        // Routed through the list branch of `BlockWriter::push`.
        ContentBlock::BulletItem(spans) | ContentBlock::NumberItem(spans) => wrap("li", spans),
    }
}

fn render_image(url: Option<&str>, caption: &[TextSpan]) -> String {
    let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
        return String::new();
    };

    let mut html = String::from("<figure class=\"content-image\"><img src=\"");
    html.push_str(&escape_attribute(url));
    html.push_str("\" alt=\"");
    html.push_str(&escape_attribute(plain_text(caption).trim()));
    html.push_str("\" loading=\"lazy\" />");

    let caption_html = render_rich_text(caption);
    if !caption_html.is_empty() {
        html.push_str("<p class=\"content-image-caption\">");
        html.push_str(&caption_html);
        html.push_str("</p>");
    }

    html.push_str("</figure>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::Annotation;
    use serde_json::json;

    fn bullet(text: &str) -> ContentBlock {
        ContentBlock::BulletItem(vec![TextSpan::plain(text)])
    }

    fn number(text: &str) -> ContentBlock {
        ContentBlock::NumberItem(vec![TextSpan::plain(text)])
    }

    fn paragraph(text: &str) -> ContentBlock {
        ContentBlock::Paragraph(vec![TextSpan::plain(text)])
    }

    /// Walks the output and checks that list tags open and close in order.
    fn assert_balanced_lists(html: &str) {
        let mut stack: Vec<&str> = Vec::new();
        let mut rest = html;
        while let Some(start) = rest.find('<') {
            rest = &rest[start..];
            for tag in ["<ul>", "<ol>", "</ul>", "</ol>"] {
                if rest.starts_with(tag) {
                    match tag {
                        "<ul>" => stack.push("ul"),
                        "<ol>" => stack.push("ol"),
                        "</ul>" => assert_eq!(stack.pop(), Some("ul"), "unbalanced in {html}"),
                        _ => assert_eq!(stack.pop(), Some("ol"), "unbalanced in {html}"),
                    }
                }
            }
            rest = &rest[1..];
        }
        assert!(stack.is_empty(), "unclosed list in {html}");
    }

    #[test]
    fn empty_document_renders_nothing() {
        assert_eq!(render_blocks(&[]), "");
    }

    #[test]
    fn empty_paragraph_renders_empty_element() {
        assert_eq!(render_blocks(&[ContentBlock::Paragraph(Vec::new())]), "<p></p>");
    }

    #[test]
    fn adjacent_items_share_one_list() {
        let html = render_blocks(&[bullet("a"), bullet("b"), bullet("c")]);
        assert_eq!(html, "<ul><li>a</li><li>b</li><li>c</li></ul>");
        assert_eq!(html.matches("<ul>").count(), 1);
    }

    #[test]
    fn switching_list_kind_closes_and_reopens() {
        let html = render_blocks(&[bullet("a"), number("1"), number("2"), bullet("b")]);
        assert_eq!(
            html,
            "<ul><li>a</li></ul><ol><li>1</li><li>2</li></ol><ul><li>b</li></ul>"
        );
    }

    #[test]
    fn non_list_block_closes_open_list_first() {
        let html = render_blocks(&[bullet("a"), paragraph("after"), bullet("b")]);
        assert_eq!(html, "<ul><li>a</li></ul><p>after</p><ul><li>b</li></ul>");
    }

    #[test]
    fn unsupported_block_still_splits_lists() {
        let html = render_blocks(&[
            number("1"),
            ContentBlock::Unsupported {
                kind: "table".to_string(),
            },
            number("2"),
        ]);
        assert_eq!(html, "<ol><li>1</li></ol><ol><li>2</li></ol>");
    }

    #[test]
    fn lists_are_balanced_for_mixed_sequences() {
        let alphabet = [bullet("b"), number("n"), paragraph("p"), ContentBlock::Divider];
        // Every sequence of length four over the alphabet.
        for i in 0..alphabet.len().pow(4) {
            let mut seq = Vec::new();
            let mut n = i;
            for _ in 0..4 {
                seq.push(alphabet[n % alphabet.len()].clone());
                n /= alphabet.len();
            }
            let html = render_blocks(&seq);
            assert_balanced_lists(&html);
            assert!(!html.contains("</ul><ul>"), "split bullet list in {html}");
            assert!(!html.contains("</ol><ol>"), "split number list in {html}");
        }
    }

    #[test]
    fn block_shapes() {
        assert_eq!(
            render_blocks(&[ContentBlock::Heading1(vec![TextSpan::plain("T")])]),
            "<h1>T</h1>"
        );
        assert_eq!(
            render_blocks(&[ContentBlock::Quote(vec![TextSpan::plain("q")])]),
            "<blockquote class=\"content-quote\">q</blockquote>"
        );
        assert_eq!(
            render_blocks(&[ContentBlock::Code(vec![TextSpan::plain("let x = 1;")])]),
            "<pre><code>let x = 1;</code></pre>"
        );
        assert_eq!(render_blocks(&[ContentBlock::Divider]), "<hr />");
        assert_eq!(
            render_blocks(&[ContentBlock::Callout {
                icon: "⚠️".to_string(),
                spans: vec![TextSpan::plain("Storm season")],
            }]),
            "<div class=\"content-callout\"><span class=\"content-callout-icon\">⚠️</span><div class=\"content-callout-body\">Storm season</div></div>"
        );
    }

    #[test]
    fn image_requires_url_and_captions_optionally() {
        assert_eq!(
            render_blocks(&[ContentBlock::Image {
                url: None,
                caption: vec![TextSpan::plain("ignored")],
            }]),
            ""
        );

        let bare = render_blocks(&[ContentBlock::Image {
            url: Some("/images/roof.png".to_string()),
            caption: Vec::new(),
        }]);
        assert_eq!(
            bare,
            "<figure class=\"content-image\"><img src=\"/images/roof.png\" alt=\"\" loading=\"lazy\" /></figure>"
        );

        let captioned = render_blocks(&[ContentBlock::Image {
            url: Some("/images/roof.png".to_string()),
            caption: vec![TextSpan::plain("New roof").with_annotations([Annotation::Italic])],
        }]);
        assert!(captioned.contains("alt=\"New roof\""));
        assert!(captioned.contains("<p class=\"content-image-caption\"><em>New roof</em></p>"));
    }

    #[test]
    fn raw_values_render_through_parser() {
        let values = vec![
            json!({"type": "heading_2", "heading_2": {"rich_text": [{"plain_text": "Why us"}]}}),
            json!({"type": "bulleted_list_item", "bulleted_list_item": {"rich_text": [{"plain_text": "Licensed"}]}}),
            json!({"type": "bulleted_list_item", "bulleted_list_item": {"rich_text": [{"plain_text": "Insured"}]}}),
            json!({"type": "synced_block", "synced_block": {}}),
        ];
        insta::assert_snapshot!(render_block_values(&values), @"<h2>Why us</h2><ul><li>Licensed</li><li>Insured</li></ul>");
    }
}
