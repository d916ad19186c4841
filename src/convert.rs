// src/convert.rs
use once_cell::sync::OnceCell;
use regex::Regex;

/// Seam for the content normalization collaborator. Raw extracted body
/// content passes through here unless a source opts out with the
/// `skip_content_conversion` setting.
pub trait ContentConverter: Send + Sync {
    fn convert(&self, raw: &str) -> String;
}

/// Default converter: decodes HTML entities, strips markup, collapses
/// whitespace, and trims.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlScrubber;

impl ContentConverter for HtmlScrubber {
    fn convert(&self, raw: &str) -> String {
        let mut out = html_escape::decode_html_entities(raw).to_string();

        static RE_TAGS: OnceCell<Regex> = OnceCell::new();
        let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
        out = re_tags.replace_all(&out, "").to_string();

        static RE_WS: OnceCell<Regex> = OnceCell::new();
        let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
        out = re_ws.replace_all(&out, " ").to_string();

        out.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubber_strips_tags_and_entities() {
        let raw = "<p>Hello&nbsp;&amp;\n  <em>world</em></p>  ";
        assert_eq!(HtmlScrubber.convert(raw), "Hello & world");
    }

    #[test]
    fn plain_text_is_only_trimmed() {
        assert_eq!(HtmlScrubber.convert("  plain  "), "plain");
    }
}
