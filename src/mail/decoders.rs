use anyhow::{Context, Result};
use mailparse::{MailHeaderMap, ParsedMail};

use crate::domain::message::{NO_CONTENT, ParsedMessage, UNKNOWN_SENDER};

/// Decode one raw RFC 822 message into sender text and the best text body.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    let parsed = mailparse::parse_mail(raw).context("malformed message")?;

    let sender = parsed
        .headers
        .get_first_value("From")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

    let body = match find_part(&parsed, "text/plain") {
        Some(p) => p.get_body().context("decoding text/plain part")?,
        None => match find_part(&parsed, "text/html") {
            Some(p) => html_to_text(&p.get_body().context("decoding text/html part")?)?,
            None => NO_CONTENT.to_string(),
        },
    };

    Ok(ParsedMessage { sender, body })
}

// Depth-first, first match wins. Attachments are skipped.
fn find_part<'a>(p: &'a ParsedMail<'a>, mimetype: &str) -> Option<&'a ParsedMail<'a>> {
    let is_attachment = matches!(
        p.get_content_disposition().disposition,
        mailparse::DispositionType::Attachment
    );
    if p.subparts.is_empty() && !is_attachment && p.ctype.mimetype.eq_ignore_ascii_case(mimetype)
    {
        return Some(p);
    }
    p.subparts.iter().find_map(|sp| find_part(sp, mimetype))
}

// Wide enough that paragraphs are never re-wrapped.
const HTML_TEXT_WIDTH: usize = 10_000;

fn html_to_text(html: &str) -> Result<String> {
    html2text::config::plain()
        .string_from_read(html.as_bytes(), HTML_TEXT_WIDTH)
        .context("rendering text/html part")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message() {
        let raw = b"From: Bob <bob@y.com>\r\nSubject: Re: offer\r\n\r\nSounds good.\r\n";
        let m = parse_message(raw).unwrap();
        assert_eq!(m.sender, "Bob <bob@y.com>");
        assert_eq!(m.body.trim(), "Sounds good.");
    }

    #[test]
    fn missing_from_uses_sentinel() {
        let raw = b"Subject: hello\r\n\r\nbody\r\n";
        let m = parse_message(raw).unwrap();
        assert_eq!(m.sender, UNKNOWN_SENDER);
    }

    #[test]
    fn encoded_from_is_decoded() {
        let raw = b"From: =?UTF-8?Q?J=C3=BCrgen?= <j@x.de>\r\n\r\nhallo\r\n";
        let m = parse_message(raw).unwrap();
        assert_eq!(m.sender, "J\u{fc}rgen <j@x.de>");
    }

    #[test]
    fn prefers_plain_over_html() {
        let raw = concat!(
            "From: a@b.com\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/alternative; boundary=\"XX\"\r\n",
            "\r\n",
            "--XX\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<p>html version</p>\r\n",
            "--XX\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "plain version\r\n",
            "--XX--\r\n",
        );
        let m = parse_message(raw.as_bytes()).unwrap();
        assert_eq!(m.body.trim(), "plain version");
    }

    #[test]
    fn falls_back_to_html() {
        let raw = concat!(
            "From: a@b.com\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<div>Yes please</div><blockquote>old &amp; quoted</blockquote>\r\n",
        );
        let m = parse_message(raw.as_bytes()).unwrap();
        assert!(m.body.contains("Yes please"));
        assert!(m.body.contains("old & quoted"));
        assert!(!m.body.contains('<'));
    }

    #[test]
    fn html_fallback_drops_styles_and_decodes_entities() {
        let raw = concat!(
            "From: a@b.com\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<style>p{color:red}</style><p>Let&#8217;s go &mdash; 5 &lt; 6</p>\r\n",
        );
        let m = parse_message(raw.as_bytes()).unwrap();
        assert!(!m.body.contains("color"), "{:?}", m.body);
        assert!(m.body.contains("Let\u{2019}s go \u{2014} 5 < 6"), "{:?}", m.body);
    }

    #[test]
    fn no_text_parts_uses_sentinel() {
        let raw = concat!(
            "From: a@b.com\r\n",
            "Content-Type: multipart/mixed; boundary=\"XX\"\r\n",
            "\r\n",
            "--XX\r\n",
            "Content-Type: application/pdf\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "JVBERi0=\r\n",
            "--XX--\r\n",
        );
        let m = parse_message(raw.as_bytes()).unwrap();
        assert_eq!(m.body, NO_CONTENT);
    }

    #[test]
    fn quoted_printable_body_is_decoded() {
        let raw = concat!(
            "From: a@b.com\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Caf=C3=A9 at noon?\r\n",
        );
        let m = parse_message(raw.as_bytes()).unwrap();
        assert_eq!(m.body.trim(), "Caf\u{e9} at noon?");
    }
}
