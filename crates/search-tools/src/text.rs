//! Text cleanup shared by the scrapers

/// Render width handed to html2text; lines are squashed afterwards
const RENDER_WIDTH: usize = 10_000;

/// Cut to at most `max` chars without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render an HTML fragment as plain text on a single line
pub fn html_to_text(fragment: &str) -> String {
    html2text::config::plain_no_decorate()
        .string_from_read(fragment.as_bytes(), RENDER_WIDTH)
        .map_or_else(|_| squash_whitespace(fragment), |text| squash_whitespace(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 200), "short");
        assert_eq!(truncate_chars("", 5), "");
        assert_eq!(truncate_chars("日本語テキスト", 3).chars().count(), 3);
    }

    #[test]
    fn test_html_to_text() {
        let html = "The <b>Rust</b> programming\n  language &amp; its <a href=\"x\">tools</a> &#x27;2024&#39;";
        assert_eq!(html_to_text(html), "The Rust programming language & its tools '2024'");
    }

    #[test]
    fn test_html_to_text_decodes_named_entities() {
        let html = "Caf&eacute; &mdash; it&rsquo;s r&eacute;sum&eacute;&hellip;";
        assert_eq!(html_to_text(html), "Café — it’s résumé…");
    }

    #[test]
    fn test_html_to_text_keeps_literal_ampersands() {
        assert_eq!(html_to_text("AT&amp;T &lt;ok&gt;&nbsp;done"), "AT&T <ok> done");
    }
}
