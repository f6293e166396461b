//! A forgiving tag/attribute stream over HTML text.
//!
//! This is not a DOM parser. It splits markup into the three events the extractors care about
//! (start tags with their attributes, end tags, and the text between tags) and gets out of the
//! way of everything else. Tag and attribute names are lower-cased, character references are
//! decoded in text and attribute values, and comments, doctypes and processing instructions are
//! dropped. Text between two tags is always reported as a single [MarkupEvent::Text].

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    Start {
        tag: String,
        attrs: Vec<(String, Option<String>)>,
    },
    End {
        tag: String,
    },
    Text(String),
}

impl MarkupEvent {
    pub fn is_start(&self, name: &str) -> bool {
        matches!(self, MarkupEvent::Start { tag, .. } if tag == name)
    }

    pub fn is_end(&self, name: &str) -> bool {
        matches!(self, MarkupEvent::End { tag } if tag == name)
    }

    /// The value of an attribute on a start tag. Valueless attributes yield `Some("")`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            MarkupEvent::Start { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_deref().unwrap_or("")),
            _ => None,
        }
    }

    /// Whether a start tag's `class` attribute contains `needle` as a substring.
    pub fn class_contains(&self, needle: &str) -> bool {
        self.attr("class").is_some_and(|class| class.contains(needle))
    }
}

impl Display for MarkupEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkupEvent::Start { tag, attrs } => {
                write!(f, "<{tag}")?;
                for (key, value) in attrs {
                    match value {
                        Some(value) => write!(f, " {key}=\"{value}\"")?,
                        None => write!(f, " {key}")?,
                    }
                }
                write!(f, ">")
            }
            MarkupEvent::End { tag } => write!(f, "</{tag}>"),
            MarkupEvent::Text(text) => write!(f, "{text:?}"),
        }
    }
}

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Splits `markup` into a sequence of [MarkupEvent]s.
pub fn tokenize(markup: &str) -> Vec<MarkupEvent> {
    let mut events = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;
    let bytes = markup.as_bytes();

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &markup[pos..];
        let consumed = if rest.starts_with("<!--") {
            // Comments run to the next "-->", or swallow the remainder when unterminated.
            push_text(&mut events, &markup[text_start..pos]);
            rest.find("-->").map(|end| end + 3).unwrap_or(rest.len())
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            push_text(&mut events, &markup[text_start..pos]);
            rest.find('>').map(|end| end + 1).unwrap_or(rest.len())
        } else if let Some((event, len)) = parse_tag(rest) {
            push_text(&mut events, &markup[text_start..pos]);
            let mut len = len;
            if let MarkupEvent::Start { tag, .. } = &event {
                let self_closing = rest[..len].trim_end_matches('>').ends_with('/');
                let tag = tag.clone();
                events.push(event);
                if self_closing {
                    events.push(MarkupEvent::End { tag });
                } else if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                    len += consume_raw_text(&rest[len..], &tag, &mut events);
                }
            } else {
                events.push(event);
            }
            len
        } else {
            // A '<' that does not open a tag is ordinary text.
            pos += 1;
            continue;
        };
        pos += consumed;
        text_start = pos;
    }
    push_text(&mut events, &markup[text_start..]);
    events
}

fn push_text(events: &mut Vec<MarkupEvent>, raw: &str) {
    if !raw.is_empty() {
        events.push(MarkupEvent::Text(decode_entities(raw)));
    }
}

/// Reads the body of a raw text element up to and including its end tag. Returns the number of
/// bytes consumed.
fn consume_raw_text(rest: &str, tag: &str, events: &mut Vec<MarkupEvent>) -> usize {
    let lower = rest.to_ascii_lowercase();
    let close = format!("</{tag}");
    match lower.find(&close) {
        Some(end) => {
            if end > 0 {
                events.push(MarkupEvent::Text(rest[..end].to_string()));
            }
            let tail = rest[end..].find('>').map(|gt| gt + 1).unwrap_or(rest.len() - end);
            events.push(MarkupEvent::End {
                tag: tag.to_string(),
            });
            end + tail
        }
        None => {
            if !rest.is_empty() {
                events.push(MarkupEvent::Text(rest.to_string()));
            }
            rest.len()
        }
    }
}

/// Parses a start or end tag at the beginning of `s`. Returns the event and its byte length.
fn parse_tag(s: &str) -> Option<(MarkupEvent, usize)> {
    let bytes = s.as_bytes();
    let is_end = bytes.get(1) == Some(&b'/');
    let name_start = if is_end { 2 } else { 1 };
    if !bytes.get(name_start)?.is_ascii_alphabetic() {
        return None;
    }
    let name_end = s[name_start..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .map(|i| i + name_start)
        .unwrap_or(s.len());
    let tag = s[name_start..name_end].to_ascii_lowercase();

    let (attrs, len) = parse_attrs(s, name_end)?;
    if is_end {
        Some((MarkupEvent::End { tag }, len))
    } else {
        Some((MarkupEvent::Start { tag, attrs }, len))
    }
}

/// Parses attributes from `from` up to the closing '>', honouring quoted values that may contain
/// '>'. Returns `None` for a tag that never closes.
#[allow(clippy::type_complexity)]
fn parse_attrs(s: &str, from: usize) -> Option<(Vec<(String, Option<String>)>, usize)> {
    let bytes = s.as_bytes();
    let mut attrs = Vec::new();
    let mut i = from;
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if *bytes.get(i)? == b'>' {
            return Some((attrs, i + 1));
        }
        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = s[key_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            attrs.push((key, None));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let value = match bytes.get(i)? {
            quote @ (b'"' | b'\'') => {
                let close = s[i + 1..].find(*quote as char)? + i + 1;
                let value = &s[i + 1..close];
                i = close + 1;
                value
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &s[value_start..i]
            }
        };
        attrs.push((key, Some(decode_entities(value))));
    }
}

/// Decodes character references the way an HTML5 parser does in text: the full named reference
/// table plus numeric references. Unknown references are left as written.
pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
