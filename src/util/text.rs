use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Ellipsis appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Longest emoji sequence (in chars) tried when demojizing.
/// Covers ZWJ family sequences and flag/keycap combinations.
const MAX_EMOJI_CHARS: usize = 10;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[allow(clippy::expect_used)]
static COMMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

#[allow(clippy::expect_used)]
static PRESERVED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    // One arm per tag so each block only closes on its own end tag
    let arms: Vec<String> = ["pre", "textarea", "script", "style"]
        .iter()
        .map(|tag| format!(r"<{tag}(?:\s[^>]*)?>.*?</{tag}\s*>"))
        .collect();
    Regex::new(&format!("(?is){}", arms.join("|"))).expect("valid regex")
});

/// Collapses every whitespace run to a single space and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes anything that looks like a markup tag.
///
/// Works on the raw text, so fragments and broken markup are fine.
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    TAG_PATTERN.replace_all(s, "")
}

/// Truncates to `max_chars` characters, appending [`ELLIPSIS`] when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((byte_end, _)) => Cow::Owned(format!("{}{}", &s[..byte_end], ELLIPSIS)),
        None => Cow::Borrowed(s),
    }
}

/// Builds a plain-text excerpt from HTML or text content.
///
/// Tags are stripped, whitespace collapsed, and the result truncated to
/// `max_chars` characters plus [`ELLIPSIS`] when longer.
///
/// # Examples
///
/// ```
/// use rssify::util::summarize;
///
/// assert_eq!(summarize("<p>Hello   <b>world</b></p>", 200), "Hello world");
/// assert_eq!(summarize("abcdef", 3), "abc...");
/// ```
pub fn summarize(content: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(&strip_tags(content));
    truncate_chars(&text, max_chars).into_owned()
}

/// Decodes HTML character references (`&amp;`, `&#8217;`, ...).
///
/// Only references are touched; text that looks like markup (`Vec<T>`) is
/// kept as is. Returns `Cow::Borrowed` when there is nothing to decode.
pub fn unescape_html(s: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(s)
}

/// Replaces emoji with `:short_name:` codes so summaries stay plain ASCII-ish text.
///
/// Sequences are matched greedily, longest first, so a ZWJ family or a flag is
/// replaced as one unit rather than per code point.
pub fn demojize(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }

    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_ascii() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let longest = MAX_EMOJI_CHARS.min(chars.len() - i);
        let matched = (1..=longest).rev().find_map(|len| {
            let candidate: String = chars[i..i + len].iter().collect();
            emojis::get(&candidate).map(|emoji| (len, emoji))
        });

        match matched {
            Some((len, emoji)) => {
                let code = emoji
                    .shortcode()
                    .map(str::to_owned)
                    .unwrap_or_else(|| emoji.name().to_lowercase().replace(' ', "_"));
                out.push(':');
                out.push_str(&code);
                out.push(':');
                changed = true;
                i += len;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(s)
    }
}

/// Shrinks HTML for transport: comments removed, whitespace runs collapsed.
///
/// Contents of `pre`, `textarea`, `script` and `style` are left untouched.
pub fn minify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for block in PRESERVED_BLOCK.find_iter(html) {
        out.push_str(&squash(&html[last..block.start()]));
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&squash(&html[last..]));

    out.trim().to_string()
}

fn squash(segment: &str) -> String {
    let without_comments = COMMENT_PATTERN.replace_all(segment, "");
    let mut out = String::with_capacity(without_comments.len());
    let mut in_space = false;
    for c in without_comments.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Strip terminal control characters and ANSI escape sequences from text.
///
/// Feed metadata is attacker-controlled; anything that reaches logs or a
/// terminal client goes through here first.
///
/// Strips:
/// - ASCII control chars: 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL 0x07 or ST `\x1b\\`)
/// - Bare ESC (0x1b) not followed by `[` or `]`
///
/// Preserves: tab (0x09), newline (0x0A), carriage return (0x0D).
///
/// Returns `Cow::Borrowed` when the input contains no control characters (common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    let is_control =
        |b: u8| b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d);

    if !bytes.iter().any(|&b| is_control(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            if i + 1 < len && bytes[i + 1] == b'[' {
                // CSI: skip parameter/intermediate bytes through the final byte
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            } else if i + 1 < len && bytes[i + 1] == b']' {
                // OSC: runs until BEL or ST (\x1b\\)
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && i + 1 < len && bytes[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_control(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_control(bytes[i]) {
                i += 1;
            }
            // SAFETY: we only break on ASCII control bytes, which cannot appear
            // mid-codepoint in valid UTF-8, so s[start..i] is valid UTF-8.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}
