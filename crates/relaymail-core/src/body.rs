//! Body variant resolution.

use crate::model::Message;

/// Fills in whichever of `text_body` / `html_body` is missing.
///
/// Priority:
/// 1. a non-empty combined `body` becomes the HTML variant, and its
///    stripped text the plain variant;
/// 2. a lone HTML variant gets a stripped plain variant;
/// 3. a lone plain variant is reused verbatim (unescaped) as HTML.
///
/// When both or neither variant is present nothing changes.
pub fn resolve_bodies(message: &mut Message) {
    if !message.body.is_empty() {
        message.html_body.clone_from(&message.body);
        message.text_body = strip_tags(&message.body);
    } else if message.text_body.is_empty() && !message.html_body.is_empty() {
        message.text_body = strip_tags(&message.html_body);
    } else if message.html_body.is_empty() && !message.text_body.is_empty() {
        message.html_body.clone_from(&message.text_body);
    }
}

/// Converts HTML to readable plain text.
///
/// Tags are dropped, block-level tags become line breaks, `script` and
/// `style` content is skipped and common entities are decoded. Lines are
/// trimmed and blank runs collapse to one empty line, so text without markup
/// comes back unchanged apart from that whitespace cleanup.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(c) = rest.chars().next() {
        match c {
            '<' if starts_tag(&rest[1..]) => {
                let Some(end) = rest.find('>') else {
                    // Unterminated tag swallows the rest.
                    break;
                };
                let name = tag_name(&rest[1..end]);
                rest = &rest[end + 1..];

                if name == "script" || name == "style" {
                    rest = skip_past_closing(rest, &name);
                } else if is_block(&name)
                    && !text.trim_end_matches([' ', '\t']).ends_with('\n')
                {
                    text.push('\n');
                }
            }
            '&' => {
                let (decoded, consumed) = decode_entity(rest);
                text.push_str(&decoded);
                rest = &rest[consumed..];
            }
            _ => {
                text.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    tidy(&text)
}

fn starts_tag(after_lt: &str) -> bool {
    after_lt
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

/// Lowercased tag name, with a leading `/` kept for closing tags.
fn tag_name(inner: &str) -> String {
    let (slash, inner) = inner
        .strip_prefix('/')
        .map_or(("", inner), |rest| ("/", rest));
    let name: String = inner
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    format!("{slash}{}", name.to_ascii_lowercase())
}

fn is_block(name: &str) -> bool {
    let bare = name.trim_start_matches('/');
    matches!(
        bare,
        "br" | "p"
            | "div"
            | "tr"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "hr"
            | "blockquote"
            | "pre"
    )
}

fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    let lower = rest.to_ascii_lowercase();
    lower
        .find(&closing)
        .and_then(|start| rest[start..].find('>').map(|end| &rest[start + end + 1..]))
        .unwrap_or("")
}

/// Decodes the entity at the start of `input` (which begins with `&`).
///
/// Returns the replacement text and the number of bytes consumed.
fn decode_entity(input: &str) -> (String, usize) {
    let body = &input[1..];
    let Some(semi) = body.find(';').filter(|&i| i > 0 && i <= 10) else {
        return ("&".to_string(), 1);
    };
    let entity = &body[..semi];

    let decoded = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        "copy" => Some('\u{00A9}'),
        "reg" => Some('\u{00AE}'),
        "trade" => Some('\u{2122}'),
        _ => entity
            .strip_prefix("#x")
            .or_else(|| entity.strip_prefix("#X"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .or_else(|| entity.strip_prefix('#')?.parse::<u32>().ok())
            .and_then(char::from_u32),
    };

    match decoded {
        Some(ch) => (ch.to_string(), semi + 2),
        None => ("&".to_string(), 1),
    }
}

/// Collapses horizontal whitespace, trims lines and limits blank runs.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(&line);
    }

    out.trim_end().to_string()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn message(body: &str, html: &str, text: &str) -> Message {
        Message {
            body: body.into(),
            html_body: html.into(),
            text_body: text.into(),
            ..Message::default()
        }
    }

    #[test]
    fn combined_body_fills_both_variants() {
        let mut msg = message("<h1>Hi</h1>", "", "");
        resolve_bodies(&mut msg);
        assert_eq!(msg.html_body, "<h1>Hi</h1>");
        assert_eq!(msg.text_body, "Hi");
    }

    #[test]
    fn combined_body_overrides_variants() {
        let mut msg = message("<p>new</p>", "<p>old</p>", "old");
        resolve_bodies(&mut msg);
        assert_eq!(msg.html_body, "<p>new</p>");
        assert_eq!(msg.text_body, "new");
    }

    #[test]
    fn html_only_gets_text() {
        let mut msg = message("", "<p>One</p><p>Two &amp; three</p>", "");
        resolve_bodies(&mut msg);
        assert_eq!(msg.text_body, "One\nTwo & three");
    }

    #[test]
    fn text_only_is_reused_verbatim() {
        let mut msg = message("", "", "Hello <world> & co");
        resolve_bodies(&mut msg);
        assert_eq!(msg.html_body, "Hello <world> & co");
        assert_eq!(msg.text_body, "Hello <world> & co");
    }

    #[test]
    fn both_or_neither_unchanged() {
        let mut both = message("", "<b>h</b>", "t");
        resolve_bodies(&mut both);
        assert_eq!(both.html_body, "<b>h</b>");
        assert_eq!(both.text_body, "t");

        let mut neither = message("", "", "");
        resolve_bodies(&mut neither);
        assert!(neither.html_body.is_empty());
        assert!(neither.text_body.is_empty());
    }

    #[test]
    fn strip_tags_handles_blocks_and_breaks() {
        assert_eq!(
            strip_tags("<div>Line 1<br>Line 2</div><ul><li>a</li><li>b</li></ul>"),
            "Line 1\nLine 2\na\nb"
        );
    }

    #[test]
    fn strip_tags_skips_script_and_style() {
        assert_eq!(
            strip_tags("<style>p { color: red }</style><p>Shown</p><SCRIPT>alert(1)</SCRIPT>"),
            "Shown"
        );
    }

    #[test]
    fn strip_tags_decodes_entities() {
        assert_eq!(strip_tags("5 &lt; 6 &#38; &#x41; &copy;"), "5 < 6 & A \u{a9}");
        assert_eq!(strip_tags("AT&T &bogus; x"), "AT&T &bogus; x");
    }

    #[test]
    fn strip_tags_collapses_whitespace() {
        assert_eq!(
            strip_tags("<p>\n    Hello\n    <b>there</b>  friend\n</p>\n\n\n<p>Bye</p>"),
            "Hello\nthere friend\n\nBye"
        );
    }

    #[test]
    fn strip_tags_keeps_plain_text() {
        let plain = "Hello,\n\nYour code is 1234.\nThanks";
        assert_eq!(strip_tags(plain), plain);
        assert_eq!(strip_tags("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn strip_tags_is_idempotent() {
        let once = strip_tags("<h1>Title</h1><p>Body   text</p><br><br><br><p>End</p>");
        assert_eq!(strip_tags(&once), once);
    }
}
