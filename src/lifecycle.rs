//! The page lifecycle state machine.
//!
//! `Loading -> RunningScripts -> Idle`, `Loading -> Failed`, or
//! `RunningScripts -> Navigated`, after which a fresh session is loaded for
//! the requested URL. Navigation is only observed between tasks.

use super::*;
use loader::LoadedDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Loading,
    RunningScripts,
    Idle,
    /// Superseded by a navigation; no further tasks run on this session.
    Navigated,
    Failed,
}

/// Terminal outcome of one caller action (`load_page`, `click`, ...).
///
/// A failed result still carries the page when a DOM exists, so mutations
/// made before the fault stay observable.
#[derive(Debug)]
pub struct PageResult {
    final_url: String,
    status: PageStatus,
    page: Option<Page>,
    error: Option<Error>,
}

impl PageResult {
    fn idle(page: Page) -> Self {
        Self {
            final_url: page.url().to_string(),
            status: PageStatus::Idle,
            page: Some(page),
            error: None,
        }
    }

    pub(crate) fn failed(final_url: String, page: Option<Page>, error: Error) -> Self {
        Self {
            final_url,
            status: PageStatus::Failed,
            page,
            error: Some(error),
        }
    }

    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn status(&self) -> PageStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == PageStatus::Idle
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    pub fn into_page(self) -> Option<Page> {
        self.page
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<Error> {
        self.error
    }

    /// The page when it settled, the error otherwise.
    pub fn into_result(self) -> Result<Page> {
        match (self.error, self.page) {
            (Some(error), _) => Err(error),
            (None, Some(page)) => Ok(page),
            (None, None) => Err(Error::InvalidUrl(self.final_url)),
        }
    }
}

enum Drained {
    Idle,
    Navigate(NavigationRequest),
    Failed(Error),
}

impl WebClient {
    /// Loads `request` on a new session and runs its scripts, following any
    /// navigation the scripts request.
    pub(crate) fn navigate(&mut self, request: WebRequest) -> PageResult {
        match self.open_session(request) {
            Ok((session, tasks)) => self.drive(session, tasks, true),
            Err((url, error)) => PageResult::failed(url, None, error),
        }
    }

    /// Runs `tasks` on an existing page, e.g. a caller-initiated click.
    pub(crate) fn run_on_page(&mut self, page: Page, tasks: ScriptTaskQueue) -> PageResult {
        self.drive(page.session, tasks, false)
    }

    fn open_session(
        &mut self,
        request: WebRequest,
    ) -> std::result::Result<(PageSession, ScriptTaskQueue), (String, Error)> {
        let requested = request.url.to_string();
        self.trace
            .lifecycle_line(format!("[lifecycle] Loading {requested}"));
        let LoadedDocument {
            final_url,
            dom,
            tasks,
        } = loader::load_document(
            self.fetcher.as_ref(),
            request,
            self.config.max_redirects,
            &mut self.trace,
        )
        .map_err(|error| {
            self.trace
                .lifecycle_line(format!("[lifecycle] Failed {requested}: {error}"));
            (requested.clone(), error)
        })?;
        self.next_session_id += 1;
        let session = PageSession::new(
            self.next_session_id,
            final_url,
            dom,
            self.config.call_depth_limit,
        );
        Ok((session, tasks))
    }

    fn drive(
        &mut self,
        mut session: PageSession,
        mut tasks: ScriptTaskQueue,
        mut fresh_load: bool,
    ) -> PageResult {
        let mut hops = 0;
        loop {
            match self.drain(&mut session, &mut tasks, fresh_load) {
                Drained::Idle => {
                    session.status = PageStatus::Idle;
                    self.trace.lifecycle_line(format!(
                        "[lifecycle] Idle {} (session {})",
                        session.url, session.id
                    ));
                    return PageResult::idle(Page::new(session));
                }
                Drained::Failed(error) => {
                    session.status = PageStatus::Failed;
                    self.trace.lifecycle_line(format!(
                        "[lifecycle] Failed {} (session {}): {error}",
                        session.url, session.id
                    ));
                    let url = session.url.to_string();
                    return PageResult::failed(url, Some(Page::new(session)), error);
                }
                Drained::Navigate(NavigationRequest { request, kind }) => {
                    session.status = PageStatus::Navigated;
                    hops += 1;
                    if hops > self.config.max_navigations {
                        let url = request.url.to_string();
                        let error = Error::NavigationLimit {
                            url: url.clone(),
                            limit: self.config.max_navigations,
                        };
                        return PageResult::failed(url, Some(Page::new(session)), error);
                    }
                    self.trace.lifecycle_line(format!(
                        "[lifecycle] Navigated ({kind:?}) {} -> {}",
                        session.url, request.url
                    ));
                    match self.open_session(request) {
                        Ok((next_session, next_tasks)) => {
                            session = next_session;
                            tasks = next_tasks;
                            fresh_load = true;
                        }
                        Err((url, error)) => return PageResult::failed(url, None, error),
                    }
                }
            }
        }
    }

    /// Runs tasks one at a time, checking the navigation gate at each task
    /// boundary.
    fn drain(
        &mut self,
        session: &mut PageSession,
        tasks: &mut ScriptTaskQueue,
        fresh_load: bool,
    ) -> Drained {
        session.status = PageStatus::RunningScripts;
        let mut load_fired = false;
        while let Some(task) = tasks.next_task() {
            self.trace.line(format!(
                "[script] session {}: running {}",
                session.id,
                task.describe()
            ));
            let page_url = session.url.to_string();
            let (origin, outcome) = match task {
                ScriptTask::Inline { source } => (
                    page_url,
                    session.execute(&source, &mut self.alerts, &mut self.trace),
                ),
                ScriptTask::External { url } => {
                    let source = match self.fetch_script(&url) {
                        Ok(source) => source,
                        Err(failure) => {
                            return Drained::Failed(wrap_script_error(url.as_str(), failure).into());
                        }
                    };
                    (
                        url.to_string(),
                        session.execute(&source, &mut self.alerts, &mut self.trace),
                    )
                }
                ScriptTask::OnLoad { handler_source } => {
                    load_fired = true;
                    session.loaded = true;
                    (
                        page_url,
                        session.fire_load(Some(&handler_source), &mut self.alerts, &mut self.trace),
                    )
                }
                ScriptTask::Dispatch { target, event } => (
                    page_url,
                    session.dispatch(target, &event, &mut self.alerts, &mut self.trace),
                ),
            };
            if let Err(fault) = outcome {
                if let Some(error) = self.report_fault(session, &origin, fault) {
                    return Drained::Failed(error);
                }
            }
            if let Some(request) = self.take_navigation(session, tasks) {
                return Drained::Navigate(request);
            }
        }

        session.loaded = true;
        if fresh_load && !load_fired && session.has_load_handlers() {
            let page_url = session.url.to_string();
            if let Err(fault) = session.fire_load(None, &mut self.alerts, &mut self.trace) {
                if let Some(error) = self.report_fault(session, &page_url, fault) {
                    return Drained::Failed(error);
                }
            }
            if let Some(request) = self.take_navigation(session, tasks) {
                return Drained::Navigate(request);
            }
        }
        Drained::Idle
    }

    fn take_navigation(
        &mut self,
        session: &mut PageSession,
        tasks: &mut ScriptTaskQueue,
    ) -> Option<NavigationRequest> {
        let request = session.gate.consume_pending()?;
        let skipped = tasks.truncate();
        self.trace.lifecycle_line(format!(
            "[lifecycle] navigation to {} consumed; {skipped} pending task(s) dropped",
            request.request.url
        ));
        Some(request)
    }

    /// Returns the error that ends the script phase, or `None` when the
    /// fault is only recorded.
    fn report_fault(
        &mut self,
        session: &mut PageSession,
        origin: &str,
        fault: RuntimeFault,
    ) -> Option<Error> {
        self.trace
            .line(format!("[script] fault in {origin}: {fault}"));
        let error = wrap_script_error(origin, fault);
        if self.config.throw_on_script_error {
            return Some(error.into());
        }
        session.script_errors.push(error);
        None
    }

    fn fetch_script(&mut self, url: &Url) -> std::result::Result<String, FetchFailure> {
        let (_, response) = loader::fetch_following_redirects(
            self.fetcher.as_ref(),
            WebRequest::get(url.clone()),
            self.config.max_redirects,
            &mut self.trace,
        )?;
        loader::check_status(&response)?;
        Ok(response.body)
    }
}
