use super::*;

/// Why a resource could not be used: it was fetched but rejected, or it could
/// not be fetched at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Status {
        status_code: u16,
        status_message: String,
    },
    Io {
        message: String,
    },
}

impl FetchFailure {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            Self::Io { .. } => None,
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        match self {
            Self::Status { status_message, .. } => Some(status_message),
            Self::Io { .. } => None,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status {
                status_code,
                status_message,
            } => write!(f, "{status_code} {status_message}"),
            Self::Io { message } => write!(f, "i/o failure: {message}"),
        }
    }
}

impl StdError for FetchFailure {}

impl From<FetchIoError> for FetchFailure {
    fn from(value: FetchIoError) -> Self {
        Self::Io {
            message: value.message().to_string(),
        }
    }
}

/// The page resource itself could not be loaded. No DOM exists for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    url: String,
    cause: FetchFailure,
}

impl LoadError {
    pub(crate) fn new(url: &Url, cause: FetchFailure) -> Self {
        Self {
            url: url.to_string(),
            cause,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cause(&self) -> &FetchFailure {
        &self.cause
    }

    pub fn status_code(&self) -> Option<u16> {
        self.cause.status_code()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {}: {}", self.url, self.cause)
    }
}

impl StdError for LoadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Syntax,
    Reference,
    Type,
    Range,
    /// A value thrown by the script that is not one of the error types above.
    Thrown,
    /// A host operation this runtime deliberately does not model.
    Unsupported,
}

impl FaultKind {
    pub(crate) fn from_error_name(name: &str) -> Self {
        match name {
            "SyntaxError" => Self::Syntax,
            "ReferenceError" => Self::Reference,
            "TypeError" => Self::Type,
            "RangeError" => Self::Range,
            _ => Self::Thrown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "SyntaxError",
            Self::Reference => "ReferenceError",
            Self::Type => "TypeError",
            Self::Range => "RangeError",
            Self::Thrown => "uncaught exception",
            Self::Unsupported => "unsupported operation",
        }
    }
}

/// 1-based position inside the script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub(crate) fn at(src: &str, offset: usize) -> Self {
        let offset = offset.min(src.len());
        let before = src.get(..offset).unwrap_or(src);
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An unhandled error raised while evaluating script source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFault {
    kind: FaultKind,
    message: String,
    location: Option<SourceLocation>,
}

impl RuntimeFault {
    pub(crate) fn new(
        kind: FaultKind,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    pub fn is_unsupported(&self) -> bool {
        self.kind == FaultKind::Unsupported
    }
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if let Some(location) = self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}

impl StdError for RuntimeFault {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFailureCause {
    Fetch(FetchFailure),
    Runtime(RuntimeFault),
}

impl fmt::Display for ScriptFailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(failure) => write!(f, "script fetch failed: {failure}"),
            Self::Runtime(fault) => write!(f, "{fault}"),
        }
    }
}

impl From<FetchFailure> for ScriptFailureCause {
    fn from(value: FetchFailure) -> Self {
        Self::Fetch(value)
    }
}

impl From<RuntimeFault> for ScriptFailureCause {
    fn from(value: RuntimeFault) -> Self {
        Self::Runtime(value)
    }
}

/// A script task failed, either while its source was fetched or while it ran.
///
/// `url` is the external script's own URL when the failing task came from a
/// `src` reference, and the page URL for inline scripts and handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptExecutionError {
    url: String,
    cause: ScriptFailureCause,
}

impl ScriptExecutionError {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cause(&self) -> &ScriptFailureCause {
        &self.cause
    }

    pub fn fetch_failure(&self) -> Option<&FetchFailure> {
        match &self.cause {
            ScriptFailureCause::Fetch(failure) => Some(failure),
            ScriptFailureCause::Runtime(_) => None,
        }
    }

    pub fn runtime_fault(&self) -> Option<&RuntimeFault> {
        match &self.cause {
            ScriptFailureCause::Runtime(fault) => Some(fault),
            ScriptFailureCause::Fetch(_) => None,
        }
    }
}

impl fmt::Display for ScriptExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script error in {}: {}", self.url, self.cause)
    }
}

impl StdError for ScriptExecutionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            ScriptFailureCause::Fetch(failure) => Some(failure),
            ScriptFailureCause::Runtime(fault) => Some(fault),
        }
    }
}

pub fn wrap_script_error(url: &str, cause: impl Into<ScriptFailureCause>) -> ScriptExecutionError {
    ScriptExecutionError {
        url: url.to_string(),
        cause: cause.into(),
    }
}
