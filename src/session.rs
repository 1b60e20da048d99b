use super::*;

/// One loaded document plus the runtime state scripts see. Never shared
/// between sessions: every load, including a navigation hop, builds a new one.
#[derive(Debug)]
pub(crate) struct PageSession {
    pub(crate) id: u64,
    pub(crate) url: Url,
    pub(crate) dom: Dom,
    pub(crate) runtime: ScriptRuntime,
    pub(crate) gate: NavigationGate,
    pub(crate) focused: Option<NodeId>,
    pub(crate) status: PageStatus,
    /// Set once the document's own scripts have drained.
    pub(crate) loaded: bool,
    /// Faults recorded instead of raised when `throw_on_script_error` is off.
    pub(crate) script_errors: Vec<ScriptExecutionError>,
}

impl PageSession {
    pub(crate) fn new(id: u64, url: Url, dom: Dom, call_depth_limit: usize) -> Self {
        Self {
            id,
            url,
            dom,
            runtime: ScriptRuntime::new(call_depth_limit),
            gate: NavigationGate::default(),
            focused: None,
            status: PageStatus::Loading,
            loaded: false,
            script_errors: Vec::new(),
        }
    }

    pub(crate) fn ready_state(&self) -> &'static str {
        if self.loaded { "complete" } else { "loading" }
    }

    fn element_by_id(&self, element_id: &str) -> Result<NodeId> {
        self.dom
            .by_id(element_id)
            .ok_or_else(|| Error::ElementNotFound(element_id.to_string()))
    }
}

/// A page handed back to the caller. Owns its session; dropping it discards
/// the DOM and the scripting runtime together.
#[derive(Debug)]
pub struct Page {
    pub(crate) session: PageSession,
}

impl Page {
    pub(crate) fn new(session: PageSession) -> Self {
        Self { session }
    }

    pub fn url(&self) -> &str {
        self.session.url.as_str()
    }

    pub fn status(&self) -> PageStatus {
        self.session.status
    }

    pub fn session_id(&self) -> u64 {
        self.session.id
    }

    pub fn title_text(&self) -> String {
        self.session.dom.title_text()
    }

    pub fn element_exists(&self, element_id: &str) -> bool {
        self.session.dom.by_id(element_id).is_some()
    }

    pub fn text_content(&self, element_id: &str) -> Result<String> {
        let node = self.session.element_by_id(element_id)?;
        Ok(self.session.dom.text_content(node))
    }

    pub fn attribute(&self, element_id: &str, name: &str) -> Result<Option<String>> {
        let node = self.session.element_by_id(element_id)?;
        Ok(self.session.dom.attr(node, name))
    }

    /// Current value of a form control (`select` reports its chosen option).
    pub fn value(&self, element_id: &str) -> Result<String> {
        let node = self.session.element_by_id(element_id)?;
        Ok(host::control_value(&self.session.dom, node))
    }

    pub fn is_checked(&self, element_id: &str) -> Result<bool> {
        let node = self.session.element_by_id(element_id)?;
        Ok(self
            .session
            .dom
            .element(node)
            .is_some_and(|element| element.checked))
    }

    /// `id` of the focused element, if it has one.
    pub fn focused_element(&self) -> Option<String> {
        let focused = self.session.focused?;
        self.session.dom.attr(focused, "id")
    }

    pub fn to_html(&self) -> String {
        self.session.dom.dump_node(self.session.dom.root)
    }

    pub fn script_errors(&self) -> &[ScriptExecutionError] {
        &self.session.script_errors
    }

    /// Number of node wrappers scripts have created on this page.
    pub fn host_object_count(&self) -> usize {
        self.session.runtime.wrappers.len()
    }

    pub(crate) fn element_by_id(&self, element_id: &str) -> Result<NodeId> {
        self.session.element_by_id(element_id)
    }
}
