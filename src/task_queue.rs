use super::*;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptTask {
    Inline {
        source: String,
    },
    /// Source is fetched right before execution.
    External {
        url: Url,
    },
    /// Synthetic trailing task for the body `onload` handler.
    OnLoad {
        handler_source: String,
    },
    /// Caller-initiated event dispatch (`click`, `submit`).
    Dispatch {
        target: NodeId,
        event: String,
    },
}

impl ScriptTask {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Inline { .. } => "inline script".to_string(),
            Self::External { url } => format!("external script {url}"),
            Self::OnLoad { .. } => "onload handler".to_string(),
            Self::Dispatch { event, .. } => format!("{event} dispatch"),
        }
    }
}

/// Pending script work for one page session, in document order.
#[derive(Debug, Default)]
pub(crate) struct ScriptTaskQueue {
    tasks: VecDeque<ScriptTask>,
}

impl ScriptTaskQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn single(task: ScriptTask) -> Self {
        let mut queue = Self::new();
        queue.push(task);
        queue
    }

    pub(crate) fn push(&mut self, task: ScriptTask) {
        if let Some(ScriptTask::OnLoad { .. }) = self.tasks.back() {
            // onload stays last
            let onload = self.tasks.pop_back();
            self.tasks.push_back(task);
            self.tasks.extend(onload);
            return;
        }
        self.tasks.push_back(task);
    }

    pub(crate) fn next_task(&mut self) -> Option<ScriptTask> {
        self.tasks.pop_front()
    }

    #[cfg(test)]
    pub(crate) fn has_onload(&self) -> bool {
        self.tasks
            .iter()
            .any(|task| matches!(task, ScriptTask::OnLoad { .. }))
    }

    /// Drops everything still queued and returns how many tasks were cut.
    pub(crate) fn truncate(&mut self) -> usize {
        let skipped = self.tasks.len();
        self.tasks.clear();
        skipped
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
