//! HTML escaping for text and attribute positions.

/// Escape HTML special characters in text content.
///
/// Escapes `&`, `<`, `>`, `"` and `'` so document content can never
/// introduce markup of its own.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value for a double-quoted attribute, encoding newlines as `&#10;`.
pub fn escape_attr(s: &str) -> String {
    escape_html(s).replace('\n', "&#10;")
}

/// Decode the entities this crate emits: the five from [`escape_html`] and
/// decimal character references. Anything else is left as written.
pub fn unescape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match decode_entity(candidate) {
            Some((c, len)) => {
                out.push(c);
                rest = &candidate[len..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(s: &str) -> Option<(char, usize)> {
    let end = s.find(';')?;
    let c = match &s[1..end] {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        name => {
            let digits = name.strip_prefix('#')?;
            if digits.is_empty() || digits.len() > 7 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            char::from_u32(digits.parse().ok()?)?
        }
    };
    Some((c, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<div>&</div>"), "&lt;div&gt;&amp;&lt;/div&gt;");
        assert_eq!(escape_html(r#"say "hi" it's"#), "say &quot;hi&quot; it&#39;s");
    }

    #[test]
    fn test_escape_html_leaves_plain_text() {
        assert_eq!(escape_html("plain text, ünïcode"), "plain text, ünïcode");
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("a &lt;b&gt; &amp;amp; &#39;c&#39; &#126;"), "a <b> &amp; 'c' ~");
        assert_eq!(unescape_html("AT&T &copy; &#; &"), "AT&T &copy; &#; &");
        assert_eq!(unescape_html(&escape_html(r#"<"x" & 'y'>"#)), r#"<"x" & 'y'>"#);
    }

    #[test]
    fn test_escape_attr_encodes_newlines() {
        assert_eq!(escape_attr("A -> B\nB -> C"), "A -&gt; B&#10;B -&gt; C");
    }
}
