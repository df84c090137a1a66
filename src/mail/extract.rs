//! Pattern-based reply extraction.
//!
//! Replies are assumed to be top-posted plain text. Nested quote levels,
//! non-English attribution lines and bottom-posting are not handled.

use regex::Regex;
use std::sync::LazyLock;

static BRACKETED_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>]*)>").expect("valid address pattern"));

// Start of quoted history: "On ..." attribution, "> quoted", or a "--" line.
static QUOTE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^On |^>|\r?\n--[ \t]?\r?$").expect("valid boundary pattern")
});

/// The customer address inside `<...>`, or the sender text as-is when there is none.
pub fn customer_address(sender: &str) -> String {
    BRACKETED_ADDRESS
        .captures(sender)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|a| !a.is_empty())
        .unwrap_or(sender)
        .to_string()
}

/// Text before the first quoted-history boundary, trimmed.
///
/// Boundaries, whichever comes first:
/// * a line starting with `On ` (reply attribution)
/// * a line starting with `>`
/// * a line that is exactly `--` (or `-- `), after a line break
pub fn reply_body(body: &str) -> String {
    let cut = QUOTE_BOUNDARY
        .find(body)
        .map(|m| m.start())
        .unwrap_or(body.len());
    body[..cut].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_from_display_form() {
        assert_eq!(customer_address("Jane Doe <jane@x.com>"), "jane@x.com");
        assert_eq!(customer_address("\"Doe, Jane\" < jane@x.com >"), "jane@x.com");
    }

    #[test]
    fn bare_address_is_kept_verbatim() {
        assert_eq!(customer_address("jane@x.com"), "jane@x.com");
        assert_eq!(customer_address("Unknown Sender"), "Unknown Sender");
        assert_eq!(customer_address("Empty <>"), "Empty <>");
    }

    #[test]
    fn cuts_at_attribution_line() {
        let body = "Thanks!\nOn Mon, Jan 1, someone wrote:\n> old text";
        assert_eq!(reply_body(body), "Thanks!");
    }

    #[test]
    fn cuts_at_quote_marker() {
        assert_eq!(reply_body("Sounds good.\n> previous message"), "Sounds good.");
        assert_eq!(reply_body("Yes\r\n\r\n>> nested\r\n"), "Yes");
    }

    #[test]
    fn cuts_at_signature_delimiter() {
        assert_eq!(reply_body("See you there!\n\n--\nBrian\nCEO"), "See you there!");
        assert_eq!(reply_body("Ok\r\n-- \r\nsent from phone"), "Ok");
    }

    #[test]
    fn first_boundary_wins() {
        let body = "Agreed.\n--\nSam\nOn Tue someone wrote:\n> x";
        assert_eq!(reply_body(body), "Agreed.");
    }

    #[test]
    fn on_inside_a_line_is_not_a_boundary() {
        let body = "Count me in. On second thought, Friday works better.";
        assert_eq!(reply_body(body), body);
        assert_eq!(reply_body("Ongoing is fine\nthanks"), "Ongoing is fine\nthanks");
    }

    #[test]
    fn dashes_with_text_are_not_a_boundary() {
        assert_eq!(reply_body("a\n-- b\nc"), "a\n-- b\nc");
        assert_eq!(reply_body("a\n---\nc"), "a\n---\nc");
    }

    #[test]
    fn no_boundary_returns_whole_trimmed_text() {
        assert_eq!(reply_body("  \n Just text.\n\n "), "Just text.");
    }

    #[test]
    fn boundary_on_first_line_gives_empty_reply() {
        assert_eq!(reply_body("> only quoted"), "");
    }
}
