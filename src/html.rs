use super::dom::is_void_tag;
use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptSource {
    Inline(String),
    /// Raw `src` attribute value, unresolved.
    External(String),
}

#[derive(Debug, Clone)]
pub(crate) struct DiscoveredScript {
    pub(crate) source: ScriptSource,
}

#[derive(Debug)]
pub(crate) struct ParseOutput {
    pub(crate) dom: Dom,
    pub(crate) scripts: Vec<DiscoveredScript>,
}

pub(crate) fn parse_html(html: &str) -> Result<ParseOutput> {
    let mut dom = Dom::new();
    let root = dom.root;
    let scripts = parse_into(&mut dom, root, html)?;
    Ok(ParseOutput { dom, scripts })
}

/// Parses markup for `innerHTML`. Scripts found in it are inert.
pub(crate) fn parse_fragment(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let root = dom.root;
    parse_into(&mut dom, root, html)?;
    Ok(dom)
}

fn parse_into(dom: &mut Dom, root: NodeId, html: &str) -> Result<Vec<DiscoveredScript>> {
    let mut scripts = Vec::new();
    let mut stack = vec![root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->")
                .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
            i = end + 3;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| *b == b'/') {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;
            let open = innermost_open(dom, &stack, |open_tag| open_tag.eq_ignore_ascii_case(&tag));
            if let Some(index) = open {
                stack.truncate(index);
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| *b == b'!' || *b == b'?') {
            i = find_subslice(bytes, i, b">")
                .map(|end| end + 1)
                .ok_or_else(|| Error::HtmlParse("unclosed declaration".into()))?;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;
            close_optional_start_tags(dom, &mut stack, &tag);

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let executable_script = tag == "script"
                && is_executable_script_type(
                    attrs
                        .iter()
                        .find(|(name, _)| name == "type")
                        .map(|(_, value)| value.as_str()),
                );
            let src = attrs
                .iter()
                .find(|(name, _)| name == "src")
                .map(|(_, value)| value.clone());
            let node = dom.create_element(Some(parent), &tag, attrs);

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                let body = html.get(i..close).unwrap_or_default();
                if !body.is_empty() {
                    let text = if tag == "script" || tag == "style" {
                        body.to_string()
                    } else {
                        decode_html_character_references(body)
                    };
                    if tag == "textarea" {
                        if let Some(element) = dom.element_mut(node) {
                            element.value = text.clone();
                        }
                    }
                    dom.create_text(Some(node), &text);
                }
                if executable_script {
                    let source = match src {
                        Some(src) => ScriptSource::External(src),
                        None => ScriptSource::Inline(body.to_string()),
                    };
                    scripts.push(DiscoveredScript { source });
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if executable_script {
                if let Some(src) = src {
                    scripts.push(DiscoveredScript {
                        source: ScriptSource::External(src),
                    });
                }
            }
            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        if let Some(text) = html.get(text_start..i) {
            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let decoded = decode_html_character_references(text);
            if !decoded.is_empty() {
                dom.create_text(Some(parent), &decoded);
            }
        }
    }

    Ok(scripts)
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "title" | "textarea")
}

fn close_optional_start_tags(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    let (closes, boundaries): (&[&str], &[&str]) = match tag {
        "li" => (&["li"], &["ul", "ol", "menu"]),
        "dt" | "dd" => (&["dt", "dd"], &["dl"]),
        "option" => (&["option"], &["select", "datalist", "optgroup"]),
        "tr" => (&["tr"], &["table", "tbody", "thead", "tfoot"]),
        "td" | "th" => (&["td", "th"], &["tr", "table"]),
        _ if is_paragraph_terminator(tag) => (&["p"], &["button", "table"]),
        _ => return,
    };
    let found = innermost_open(dom, stack, |open_tag| {
        closes.contains(&open_tag) || boundaries.contains(&open_tag)
    });
    if let Some(index) = found {
        if dom.tag_name(stack[index]).is_some_and(|open_tag| closes.contains(&open_tag)) {
            stack.truncate(index);
        }
    }
}

/// Open elements further than this from the insertion point are never
/// closed implicitly or by a stray end tag, which keeps deep trees linear.
const OPEN_ELEMENT_SCAN_LIMIT: usize = 256;

fn innermost_open(dom: &Dom, stack: &[NodeId], matches: impl Fn(&str) -> bool) -> Option<usize> {
    let floor = stack.len().saturating_sub(OPEN_ELEMENT_SCAN_LIMIT).max(1);
    (floor..stack.len())
        .rev()
        .find(|index| dom.tag_name(stack[*index]).is_some_and(&matches))
}

fn is_paragraph_terminator(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "div"
            | "dl"
            | "fieldset"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

fn is_executable_script_type(raw_type: Option<&str>) -> bool {
    let Some(raw_type) = raw_type else {
        return true;
    };
    let media_type = raw_type
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    media_type.is_empty()
        || matches!(
            media_type.as_str(),
            "text/javascript" | "application/javascript" | "application/ecmascript" | "text/ecmascript"
        )
}

fn parse_start_tag(html: &str, at: usize) -> Result<(String, Vec<(String, String)>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at + 1;
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}>")));
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            if bytes.get(i) == Some(&b'>') {
                self_closing = true;
                i += 1;
                break;
            }
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        if name_start == i {
            // Junk byte inside a tag: skip it like browsers do.
            i += 1;
            continue;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    let start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();
    let close = find_subslice(bytes, i, b">")
        .ok_or_else(|| Error::HtmlParse(format!("unclosed end tag </{tag}>")))?;
    Ok((tag, close + 1))
}

fn parse_attr_value(html: &str, i: &mut usize) -> Result<String> {
    let bytes = html.as_bytes();
    let Some(&quote) = bytes.get(*i) else {
        return Err(Error::HtmlParse("missing attribute value".into()));
    };
    if quote == b'"' || quote == b'\'' {
        let start = *i + 1;
        let end = bytes[start..]
            .iter()
            .position(|b| *b == quote)
            .map(|offset| start + offset)
            .ok_or_else(|| Error::HtmlParse("unclosed attribute value".into()))?;
        *i = end + 1;
        let raw = html.get(start..end).unwrap_or_default();
        return Ok(decode_html_character_references(raw));
    }
    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    let raw = html.get(start..*i).unwrap_or_default();
    Ok(decode_html_character_references(raw))
}

pub(crate) fn decode_html_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint = if let Some(hex) = value.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            value.parse::<u32>().ok()?
        };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "copy" => Some('©'),
            "reg" => Some('®'),
            "hellip" => Some('…'),
            "mdash" => Some('\u{2014}'),
            "ndash" => Some('\u{2013}'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let decoded = tail.find(';').and_then(|semicolon| {
            let raw = &tail[..semicolon];
            let ch = match raw.strip_prefix('#') {
                Some(numeric) => decode_numeric(numeric),
                None => decode_named(raw),
            }?;
            Some((ch, semicolon + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window == needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            let after = bytes.get(i + 2 + tag.len()).copied();
            if after.is_none_or(|b| b == b'>' || b.is_ascii_whitespace()) {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
