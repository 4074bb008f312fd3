use serde_json::Value;

use crate::domain::content::{Annotation, TextSpan, spans_from_value};

use super::html::escape_attribute;

/// Render a span sequence into an inline HTML fragment.
///
/// Span text is emitted as-is: editors are allowed to put markup in the CMS.
/// Annotations always nest in [`Annotation::NESTING`] order so a given
/// annotation set produces the same markup however it was declared.
pub fn render_rich_text(spans: &[TextSpan]) -> String {
    let mut html = String::new();
    for span in spans {
        html.push_str(&render_span(span));
    }
    html
}

/// Render a raw CMS rich-text value. Non-array input renders to `""`.
pub fn render_rich_text_value(value: &Value) -> String {
    render_rich_text(&spans_from_value(value))
}

fn render_span(span: &TextSpan) -> String {
    let mut content = span.text.clone();

    for annotation in Annotation::NESTING {
        if span.annotations.contains(annotation) {
            let tag = annotation.tag();
            content = format!("<{tag}>{content}</{tag}>");
        }
    }

    if let Some(link) = span.link.as_deref() {
        content = format!(
            "<a href=\"{}\" target=\"_blank\">{content}</a>",
            escape_attribute(link)
        );
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_spans_concatenate_in_order() {
        let spans = vec![TextSpan::plain("Hello, "), TextSpan::plain("world")];
        assert_eq!(render_rich_text(&spans), "Hello, world");
    }

    #[test]
    fn nesting_order_is_fixed() {
        let all = TextSpan::plain("x").with_annotations([
            Annotation::Code,
            Annotation::Underline,
            Annotation::Bold,
            Annotation::Strikethrough,
            Annotation::Italic,
        ]);
        assert_eq!(
            render_rich_text(&[all]),
            "<code><s><u><em><strong>x</strong></em></u></s></code>"
        );
    }

    #[test]
    fn declaration_order_does_not_change_output() {
        let a = TextSpan::plain("t").with_annotations([Annotation::Italic, Annotation::Bold]);
        let b = TextSpan::plain("t").with_annotations([Annotation::Bold, Annotation::Italic]);
        assert_eq!(render_rich_text(&[a]), render_rich_text(&[b]));
    }

    #[test]
    fn every_annotation_combination_is_order_invariant() {
        for mask in 0u8..32 {
            let picked: Vec<Annotation> = Annotation::NESTING
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, annotation)| *annotation)
                .collect();
            let reversed: Vec<Annotation> = picked.iter().rev().copied().collect();

            let forward = TextSpan::plain("v").with_annotations(picked);
            let backward = TextSpan::plain("v").with_annotations(reversed);
            assert_eq!(
                render_rich_text(&[forward]),
                render_rich_text(&[backward]),
                "mask {mask:#07b}"
            );
        }
    }

    #[test]
    fn link_wraps_annotated_content_last() {
        let span = TextSpan::plain("call us")
            .with_annotations([Annotation::Bold])
            .with_link("tel:5133209436");
        assert_eq!(
            render_rich_text(&[span]),
            "<a href=\"tel:5133209436\" target=\"_blank\"><strong>call us</strong></a>"
        );
    }

    #[test]
    fn markup_in_text_is_preserved() {
        let span = TextSpan::plain("<br>line");
        assert_eq!(render_rich_text(&[span]), "<br>line");
    }

    #[test]
    fn empty_or_non_array_input_renders_nothing() {
        assert_eq!(render_rich_text(&[]), "");
        assert_eq!(render_rich_text_value(&json!("nope")), "");
        assert_eq!(render_rich_text_value(&Value::Null), "");
    }
}
