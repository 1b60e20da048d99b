use std::sync::Arc;

use super::*;

#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub(crate) max_navigations: usize,
    pub(crate) max_redirects: usize,
    pub(crate) throw_on_script_error: bool,
    pub(crate) call_depth_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_navigations: 20,
            max_redirects: 10,
            throw_on_script_error: true,
            call_depth_limit: 256,
        }
    }
}

/// Entry point for loading and driving pages.
///
/// A client is `Send`, so each thread can own one; the pages it hands out are
/// not, which keeps every page session on the thread that created it. Several
/// clients may share one fetcher through an `Arc`.
pub struct WebClient {
    pub(crate) fetcher: Arc<dyn ResourceFetcher>,
    pub(crate) config: ClientConfig,
    pub(crate) trace: TraceState,
    pub(crate) alerts: Vec<String>,
    pub(crate) next_session_id: u64,
}

impl fmt::Debug for WebClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebClient")
            .field("config", &self.config)
            .field("alerts", &self.alerts)
            .field("next_session_id", &self.next_session_id)
            .finish_non_exhaustive()
    }
}

impl WebClient {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            config: ClientConfig::default(),
            trace: TraceState::default(),
            alerts: Vec::new(),
            next_session_id: 0,
        }
    }

    pub fn with_connection(connection: MockConnection) -> Self {
        Self::new(Arc::new(connection))
    }

    pub fn set_max_navigations(&mut self, max_navigations: usize) {
        self.config.max_navigations = max_navigations;
    }

    pub fn set_max_redirects(&mut self, max_redirects: usize) {
        self.config.max_redirects = max_redirects;
    }

    /// With `false`, script faults are recorded on the page and the remaining
    /// tasks still run. Script fetch failures abort either way.
    pub fn set_throw_on_script_error(&mut self, enabled: bool) {
        self.config.throw_on_script_error = enabled;
    }

    pub fn set_call_depth_limit(&mut self, max_depth: usize) -> Result<()> {
        if max_depth == 0 {
            return Err(Error::InvalidConfig(
                "set_call_depth_limit requires at least 1 frame".into(),
            ));
        }
        self.config.call_depth_limit = max_depth;
        Ok(())
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace.to_stderr = enabled;
    }

    pub fn set_trace_lifecycle(&mut self, enabled: bool) {
        self.trace.lifecycle = enabled;
    }

    pub fn set_trace_fetch(&mut self, enabled: bool) {
        self.trace.fetch = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if !self.trace.set_log_limit(max_entries) {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }

    /// Alerts raised by scripts on any page of this client, oldest first.
    pub fn take_alert_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// Loads `url` on a new page session and drains its scripts.
    pub fn load_page(&mut self, url: &str) -> PageResult {
        match parse_url(url) {
            Ok(url) => self.navigate(WebRequest::get(url)),
            Err(error) => PageResult::failed(url.to_string(), None, error),
        }
    }

    pub fn load_request(&mut self, request: WebRequest) -> PageResult {
        self.navigate(request)
    }

    /// [`load_page`](Self::load_page) for callers that only want the settled
    /// page.
    pub fn get_page(&mut self, url: &str) -> Result<Page> {
        self.load_page(url).into_result()
    }

    /// Clicks the element with `element_id` as a user would.
    pub fn click(&mut self, page: Page, element_id: &str) -> PageResult {
        self.dispatch_on(page, element_id, "click")
    }

    /// Submits the form with `form_id`, running its `onsubmit` first.
    pub fn submit(&mut self, page: Page, form_id: &str) -> PageResult {
        self.dispatch_on(page, form_id, "submit")
    }

    pub fn focus(&mut self, page: Page, element_id: &str) -> PageResult {
        self.dispatch_on(page, element_id, "focus")
    }

    pub fn blur(&mut self, page: Page, element_id: &str) -> PageResult {
        self.dispatch_on(page, element_id, "blur")
    }

    /// Runs `source` as one more inline script on `page`.
    pub fn execute_script(&mut self, page: Page, source: &str) -> PageResult {
        let task = ScriptTask::Inline {
            source: source.to_string(),
        };
        self.run_on_page(page, ScriptTaskQueue::single(task))
    }

    fn dispatch_on(&mut self, page: Page, element_id: &str, event: &str) -> PageResult {
        let target = match page.element_by_id(element_id) {
            Ok(target) => target,
            Err(error) => return PageResult::failed(page.url().to_string(), Some(page), error),
        };
        let task = ScriptTask::Dispatch {
            target,
            event: event.to_string(),
        };
        self.run_on_page(page, ScriptTaskQueue::single(task))
    }
}
