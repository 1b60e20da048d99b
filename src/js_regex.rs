use std::fmt;

/// A compiled regular expression literal (`/pattern/flags`).
#[derive(Debug, Clone)]
pub(crate) struct JsRegex {
    backend: fancy_regex::Regex,
    source: String,
    flags: String,
}

impl JsRegex {
    pub(crate) fn new(pattern: &str, flags: &str) -> Result<Self, RegexError> {
        let mut builder = fancy_regex::RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'g' | 'u' | 'y' => {}
                other => {
                    return Err(RegexError {
                        message: format!("invalid regular expression flag '{other}'"),
                    });
                }
            }
        }
        let backend = builder.build().map_err(RegexError::from)?;
        Ok(Self {
            backend,
            source: pattern.to_string(),
            flags: flags.to_string(),
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn flags(&self) -> &str {
        &self.flags
    }

    pub(crate) fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    pub(crate) fn is_match(&self, input: &str) -> Result<bool, RegexError> {
        self.backend.is_match(input).map_err(RegexError::from)
    }

    /// Group 0 first; unmatched groups are `None`.
    pub(crate) fn captures(&self, input: &str) -> Result<Option<Vec<Option<String>>>, RegexError> {
        let Some(captures) = self.backend.captures(input).map_err(RegexError::from)? else {
            return Ok(None);
        };
        Ok(Some(
            (0..captures.len())
                .map(|idx| captures.get(idx).map(|m| m.as_str().to_string()))
                .collect(),
        ))
    }

    pub(crate) fn find_all(&self, input: &str) -> Result<Vec<String>, RegexError> {
        let mut out = Vec::new();
        for matched in self.backend.find_iter(input) {
            out.push(matched.map_err(RegexError::from)?.as_str().to_string());
        }
        Ok(out)
    }

    /// Replaces the first match, or every match for a global regex. `$&` and
    /// `$1`..`$9` in the replacement are expanded.
    pub(crate) fn replace(&self, input: &str, replacement: &str) -> Result<String, RegexError> {
        let mut out = String::new();
        let mut last = 0usize;
        for captures in self.backend.captures_iter(input) {
            let captures = captures.map_err(RegexError::from)?;
            let Some(whole) = captures.get(0) else {
                continue;
            };
            out.push_str(&input[last..whole.start()]);
            expand_replacement(replacement, &captures, &mut out);
            last = whole.end();
            if !self.is_global() {
                break;
            }
        }
        out.push_str(&input[last..]);
        Ok(out)
    }

    pub(crate) fn split(&self, input: &str) -> Result<Vec<String>, RegexError> {
        let mut out = Vec::new();
        for part in self.backend.split(input) {
            out.push(part.map_err(RegexError::from)?.to_string());
        }
        Ok(out)
    }
}

fn expand_replacement(replacement: &str, captures: &fancy_regex::Captures<'_>, out: &mut String) {
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('&') => {
                chars.next();
                if let Some(m) = captures.get(0) {
                    out.push_str(m.as_str());
                }
            }
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(digit @ '1'..='9') => {
                chars.next();
                let idx = digit as usize - '0' as usize;
                if let Some(m) = captures.get(idx) {
                    out.push_str(m.as_str());
                }
            }
            _ => out.push('$'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegexError {
    message: String,
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RegexError {}

impl From<fancy_regex::Error> for RegexError {
    fn from(value: fancy_regex::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}
