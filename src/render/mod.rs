pub mod digest;
pub mod html;

use chrono::{DateTime, Utc};

/// Escape text for embedding in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for embedding in a single-quoted JS string literal inside
/// an HTML attribute. Hex escapes survive HTML entity decoding, which
/// plain quote entities do not.
pub fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\x27"),
            '"' => out.push_str("\\x22"),
            '<' => out.push_str("\\x3c"),
            '>' => out.push_str("\\x3e"),
            '&' => out.push_str("\\x26"),
            _ => out.push(c),
        }
    }
    out
}

/// Format a timestamp like "Feb 03, 2026 09:15"
pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%b %d, %Y %H:%M").to_string()
}

/// Relative age like "3d ago", "5h ago", "yesterday" or "just now"
pub fn days_ago(ts: &DateTime<Utc>) -> String {
    let delta = Utc::now() - *ts;
    let days = delta.num_days();
    match days {
        0 => {
            let hours = delta.num_hours();
            if hours > 0 {
                format!("{}h ago", hours)
            } else {
                "just now".to_string()
            }
        }
        1 => "yesterday".to_string(),
        _ => format!("{}d ago", days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js("o'brien@contoso.com"), "o\\x27brien@contoso.com");
        assert_eq!(escape_js(r"a\b"), r"a\\b");
        assert_eq!(escape_js(r#"<"&>"#), "\\x3c\\x22\\x26\\x3e");
        assert_eq!(escape_js("plain@contoso.com"), "plain@contoso.com");
    }

    #[test]
    fn test_days_ago() {
        assert_eq!(days_ago(&(Utc::now() - Duration::minutes(5))), "just now");
        assert_eq!(days_ago(&(Utc::now() - Duration::hours(6))), "6h ago");
        assert_eq!(days_ago(&(Utc::now() - Duration::days(1))), "yesterday");
        assert_eq!(days_ago(&(Utc::now() - Duration::days(4))), "4d ago");
    }
}
