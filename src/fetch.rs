use std::sync::Mutex;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("post") {
            Self::Post
        } else {
            Self::Get
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub form_data: Vec<(String, String)>,
}

impl WebRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            form_data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResponse {
    pub status_code: u16,
    pub status_message: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl WebResponse {
    pub fn ok(body: &str) -> Self {
        Self::new(body, 200, "OK", "text/html")
    }

    pub fn new(body: &str, status_code: u16, status_message: &str, content_type: &str) -> Self {
        Self {
            status_code,
            status_message: status_message.to_string(),
            body: body.to_string(),
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code, 301 | 302 | 303 | 307 | 308) && self.header("location").is_some()
    }
}

/// The resource could not be fetched at all (as opposed to a non-2xx reply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchIoError {
    message: String,
}

impl FetchIoError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FetchIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for FetchIoError {}

/// Resolves a request to a response. Non-2xx statuses are responses, not
/// errors.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, request: &WebRequest) -> std::result::Result<WebResponse, FetchIoError>;
}

#[derive(Debug, Clone)]
enum MockEntry {
    Response(WebResponse),
    IoFailure(String),
}

/// In-memory connection keyed by absolute URL (query and fragment ignored).
#[derive(Debug, Default)]
pub struct MockConnection {
    entries: HashMap<String, MockEntry>,
    default_response: Option<WebResponse>,
    requests: Mutex<Vec<WebRequest>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_response(&mut self, url: &str, html: &str) {
        self.set_web_response(url, WebResponse::ok(html));
    }

    pub fn set_response_full(
        &mut self,
        url: &str,
        body: &str,
        status_code: u16,
        status_message: &str,
        content_type: &str,
    ) {
        self.set_web_response(
            url,
            WebResponse::new(body, status_code, status_message, content_type),
        );
    }

    pub fn set_web_response(&mut self, url: &str, response: WebResponse) {
        self.entries
            .insert(Self::key_for(url), MockEntry::Response(response));
    }

    pub fn set_redirect(&mut self, from: &str, to: &str, status_code: u16) {
        let mut response = WebResponse::new("", status_code, "Moved", "text/html");
        response
            .headers
            .push(("Location".to_string(), to.to_string()));
        self.set_web_response(from, response);
    }

    pub fn set_io_failure(&mut self, url: &str, message: &str) {
        self.entries
            .insert(Self::key_for(url), MockEntry::IoFailure(message.to_string()));
    }

    pub fn set_default_html(&mut self, html: &str) {
        self.default_response = Some(WebResponse::ok(html));
    }

    pub fn set_default_response(
        &mut self,
        body: &str,
        status_code: u16,
        status_message: &str,
        content_type: &str,
    ) {
        self.default_response = Some(WebResponse::new(
            body,
            status_code,
            status_message,
            content_type,
        ));
    }

    pub fn requests(&self) -> Vec<WebRequest> {
        self.lock_requests().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.lock_requests()
            .iter()
            .map(|request| request.url.to_string())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.lock_requests().len()
    }

    pub fn last_request(&self) -> Option<WebRequest> {
        self.lock_requests().last().cloned()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<WebRequest>> {
        // The log only ever holds completed pushes, so a poisoned guard is still usable.
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn key_for(url: &str) -> String {
        match Url::parse(url) {
            Ok(parsed) => Self::key_for_url(&parsed),
            Err(_) => url.to_string(),
        }
    }

    fn key_for_url(url: &Url) -> String {
        let mut key = url.clone();
        key.set_query(None);
        key.set_fragment(None);
        key.to_string()
    }
}

impl ResourceFetcher for MockConnection {
    fn fetch(&self, request: &WebRequest) -> std::result::Result<WebResponse, FetchIoError> {
        self.lock_requests().push(request.clone());
        match self.entries.get(&Self::key_for_url(&request.url)) {
            Some(MockEntry::Response(response)) => Ok(response.clone()),
            Some(MockEntry::IoFailure(message)) => Err(FetchIoError::new(message.clone())),
            None => Ok(self
                .default_response
                .clone()
                .unwrap_or_else(|| WebResponse::new("", 404, "Not Found", "text/html"))),
        }
    }
}
