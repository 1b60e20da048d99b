#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawTemplatePart {
    Text(String),
    /// Embedded expression source and its byte offset in the script.
    Expr(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Num(f64),
    Str(String),
    Template(Vec<RawTemplatePart>),
    Regex { pattern: String, flags: String },
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) tok: Tok,
    pub(crate) offset: usize,
    pub(crate) newline_before: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub(crate) message: String,
    pub(crate) offset: usize,
}

impl SyntaxError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

const PUNCTUATORS: &[&str] = &[
    "===", "!==", "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "{", "}", "(", ")", "[", "]", ";", ",", ".", "?", ":", "=", "+", "-", "*", "/", "%", "!", "<",
    ">",
];

const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "in", "of", "new", "delete", "void", "throw", "else", "do",
];

pub(crate) fn tokenize(src: &str) -> std::result::Result<Vec<Token>, SyntaxError> {
    let bytes = src.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0usize;
    let mut newline_before = false;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\n' {
            newline_before = true;
            i += 1;
            continue;
        }
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b >= 0x80 {
            let ch = src[i..].chars().next().unwrap_or_default();
            if ch.is_whitespace() {
                newline_before |= matches!(ch, '\u{2028}' | '\u{2029}');
                i += ch.len_utf8();
                continue;
            }
        }
        if src[i..].starts_with("//") || src[i..].starts_with("<!--") {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if src[i..].starts_with("/*") {
            let end = src[i + 2..]
                .find("*/")
                .ok_or_else(|| SyntaxError::new("unterminated comment", i))?;
            if src[i..i + 2 + end].contains('\n') {
                newline_before = true;
            }
            i += end + 4;
            continue;
        }

        let start = i;
        let tok = if b == b'"' || b == b'\'' {
            let (value, next) = read_string(src, i)?;
            i = next;
            Tok::Str(value)
        } else if b == b'`' {
            let (parts, next) = read_template(src, i)?;
            i = next;
            Tok::Template(parts)
        } else if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let (value, next) = read_number(src, i)?;
            i = next;
            Tok::Num(value)
        } else if is_ident_start(b) || b >= 0x80 {
            let next = scan_identifier(src, i);
            if next == i {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(SyntaxError::new(format!("unexpected character '{ch}'"), i));
            }
            let word = src[i..next].to_string();
            i = next;
            Tok::Ident(word)
        } else if b == b'/' && regex_allowed(tokens.last()) {
            let (pattern, flags, next) = read_regex(src, i)?;
            i = next;
            Tok::Regex { pattern, flags }
        } else if src[i..].starts_with("-->") && (newline_before || tokens.is_empty()) {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        } else {
            let punct = PUNCTUATORS
                .iter()
                .find(|punct| src[i..].starts_with(**punct))
                .ok_or_else(|| {
                    let ch = src[i..].chars().next().unwrap_or('?');
                    SyntaxError::new(format!("unexpected character '{ch}'"), i)
                })?;
            i += punct.len();
            Tok::Punct(punct)
        };
        tokens.push(Token {
            tok,
            offset: start,
            newline_before,
        });
        newline_before = false;
    }

    tokens.push(Token {
        tok: Tok::Eof,
        offset: src.len(),
        newline_before: true,
    });
    Ok(tokens)
}

fn regex_allowed(previous: Option<&Token>) -> bool {
    match previous.map(|token| &token.tok) {
        None => true,
        Some(Tok::Punct(punct)) => !matches!(*punct, ")" | "]" | "}"),
        Some(Tok::Ident(word)) => REGEX_PRECEDING_KEYWORDS.contains(&word.as_str()),
        Some(_) => false,
    }
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b == b'$' || b.is_ascii_alphabetic()
}

fn scan_identifier(src: &str, from: usize) -> usize {
    let mut end = from;
    for (offset, ch) in src[from..].char_indices() {
        if ch == '_' || ch == '$' || ch.is_alphanumeric() {
            end = from + offset + ch.len_utf8();
        } else {
            break;
        }
    }
    end
}

fn read_number(src: &str, from: usize) -> std::result::Result<(f64, usize), SyntaxError> {
    let bytes = src.as_bytes();
    let mut i = from;
    if src[i..].starts_with("0x") || src[i..].starts_with("0X") {
        i += 2;
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        let value = u64::from_str_radix(&src[digits_start..i], 16)
            .map_err(|_| SyntaxError::new("invalid hex literal", from))?;
        return Ok((value as f64, i));
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    if bytes.get(i).is_some_and(|b| is_ident_start(*b)) {
        return Err(SyntaxError::new("identifier starts immediately after numeric literal", i));
    }
    let value = src[from..i]
        .parse::<f64>()
        .map_err(|_| SyntaxError::new("invalid numeric literal", from))?;
    Ok((value, i))
}

fn read_escape(src: &str, i: usize, out: &mut String) -> usize {
    let rest = &src[i + 1..];
    let Some(ch) = rest.chars().next() else {
        return i + 1;
    };
    match ch {
        'n' => out.push('\n'),
        'r' => out.push('\r'),
        't' => out.push('\t'),
        'b' => out.push('\u{0008}'),
        'f' => out.push('\u{000C}'),
        'v' => out.push('\u{000B}'),
        '0' => out.push('\0'),
        'u' => {
            if let Some(hex) = rest.get(1..5) {
                if let Some(decoded) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                    return i + 6;
                }
            }
            out.push('u');
        }
        'x' => {
            if let Some(hex) = rest.get(1..3) {
                if let Some(decoded) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                    return i + 4;
                }
            }
            out.push('x');
        }
        '\n' => {}
        other => out.push(other),
    }
    i + 1 + ch.len_utf8()
}

fn read_string(src: &str, from: usize) -> std::result::Result<(String, usize), SyntaxError> {
    let quote = src.as_bytes()[from];
    let mut out = String::new();
    let mut i = from + 1;
    while i < src.len() {
        let b = src.as_bytes()[i];
        if b == quote {
            return Ok((out, i + 1));
        }
        if b == b'\n' {
            break;
        }
        if b == b'\\' {
            i = read_escape(src, i, &mut out);
            continue;
        }
        let ch = src[i..].chars().next().unwrap_or_default();
        out.push(ch);
        i += ch.len_utf8();
    }
    Err(SyntaxError::new("unterminated string literal", from))
}

fn read_template(
    src: &str,
    from: usize,
) -> std::result::Result<(Vec<RawTemplatePart>, usize), SyntaxError> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut i = from + 1;
    while i < src.len() {
        let b = src.as_bytes()[i];
        if b == b'`' {
            if !text.is_empty() {
                parts.push(RawTemplatePart::Text(text));
            }
            return Ok((parts, i + 1));
        }
        if b == b'\\' {
            i = read_escape(src, i, &mut text);
            continue;
        }
        if src[i..].starts_with("${") {
            if !text.is_empty() {
                parts.push(RawTemplatePart::Text(std::mem::take(&mut text)));
            }
            let expr_start = i + 2;
            let expr_end = find_template_expr_end(src, expr_start)
                .ok_or_else(|| SyntaxError::new("unterminated template expression", i))?;
            parts.push(RawTemplatePart::Expr(
                src[expr_start..expr_end].to_string(),
                expr_start,
            ));
            i = expr_end + 1;
            continue;
        }
        let ch = src[i..].chars().next().unwrap_or_default();
        text.push(ch);
        i += ch.len_utf8();
    }
    Err(SyntaxError::new("unterminated template literal", from))
}

fn find_template_expr_end(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                let (_, next) = read_string(src, i).ok()?;
                i = next;
                continue;
            }
            b'`' => {
                let (_, next) = read_template(src, i).ok()?;
                i = next;
                continue;
            }
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

fn read_regex(src: &str, from: usize) -> std::result::Result<(String, String, usize), SyntaxError> {
    let bytes = src.as_bytes();
    let mut i = from + 1;
    let mut in_class = false;
    loop {
        let Some(&b) = bytes.get(i) else {
            return Err(SyntaxError::new("unterminated regular expression", from));
        };
        match b {
            b'\n' => return Err(SyntaxError::new("unterminated regular expression", from)),
            b'\\' => {
                i += 2;
                continue;
            }
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => break,
            _ => {}
        }
        i += 1;
    }
    let pattern = src[from + 1..i].to_string();
    i += 1;
    let flags_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    Ok((pattern, src[flags_start..i].to_string(), i))
}
