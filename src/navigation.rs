use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// `location = ...`, `location.href = ...`, `location.assign(...)`.
    Assign,
    Replace,
    Reload,
    FormSubmit,
    Link,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NavigationRequest {
    pub(crate) request: WebRequest,
    pub(crate) kind: NavigationKind,
}

/// Records "navigate away" intent raised by host objects. The lifecycle
/// controller reads it only between tasks.
#[derive(Debug, Default)]
pub(crate) struct NavigationGate {
    pending: Option<NavigationRequest>,
    armed: bool,
    consumed: bool,
}

impl NavigationGate {
    pub(crate) fn arm(&mut self) {
        self.armed = true;
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }

    /// Last write wins. Returns `false` when no script execution is active or
    /// the session has already navigated away.
    pub(crate) fn request_navigation(&mut self, request: NavigationRequest) -> bool {
        if !self.armed || self.consumed {
            return false;
        }
        self.pending = Some(request);
        true
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn consume_pending(&mut self) -> Option<NavigationRequest> {
        let pending = self.pending.take();
        if pending.is_some() {
            self.consumed = true;
        }
        pending
    }

    #[cfg(test)]
    pub(crate) fn is_consumed(&self) -> bool {
        self.consumed
    }
}
