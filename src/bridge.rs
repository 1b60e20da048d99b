//! Entry points from the lifecycle controller into a session's script
//! runtime. Each one arms the navigation gate for exactly its own execution.

use super::*;

const SCRIPT_STACK_SIZE: usize = 32 * 1024 * 1024;

impl PageSession {
    fn with_interpreter<T>(
        &mut self,
        alerts: &mut Vec<String>,
        trace: &mut TraceState,
        run: impl FnOnce(&mut Interpreter<'_>) -> Flow<T>,
    ) -> std::result::Result<T, RuntimeFault> {
        self.gate.arm();
        let outcome = stacker::grow(SCRIPT_STACK_SIZE, || {
            let mut it = Interpreter::new(self, alerts, trace);
            run(&mut it).map_err(|interrupt| it.into_fault(interrupt))
        });
        self.gate.disarm();
        outcome
    }

    /// Runs one classic script in the session's global scope.
    pub(crate) fn execute(
        &mut self,
        source: &str,
        alerts: &mut Vec<String>,
        trace: &mut TraceState,
    ) -> std::result::Result<(), RuntimeFault> {
        self.with_interpreter(alerts, trace, |it| it.eval_source(source))
    }

    /// Fires the window `load` event: the script-assigned `window.onload`
    /// (or else the body attribute handler), then `load` listeners.
    pub(crate) fn fire_load(
        &mut self,
        attribute_handler: Option<&str>,
        alerts: &mut Vec<String>,
        trace: &mut TraceState,
    ) -> std::result::Result<(), RuntimeFault> {
        self.with_interpreter(alerts, trace, |it| {
            let window = Value::Host(HostRef::Window);
            let event = new_object(
                ObjectClass::Event,
                vec![
                    ("type", Value::String("load".to_string())),
                    ("target", Value::Host(HostRef::Document)),
                    ("defaultPrevented", Value::Bool(false)),
                ],
            );
            let assigned = it
                .session
                .runtime
                .global("onload")
                .filter(Value::is_callable);
            let handler = match (assigned, attribute_handler) {
                (Some(handler), _) => Some(handler),
                (None, Some(source)) => Some(it.compile_handler(source)?),
                (None, None) => None,
            };
            if let Some(handler) = handler {
                it.call_function(&handler, window.clone(), vec![event.clone()])?;
            }
            for listener in window_load_listeners(it) {
                it.call_function(&listener, window.clone(), vec![event.clone()])?;
            }
            Ok(())
        })
    }

    /// True when scripts left something for the window `load` event to run.
    pub(crate) fn has_load_handlers(&self) -> bool {
        let assigned = self
            .runtime
            .global("onload")
            .is_some_and(|handler| handler.is_callable());
        let listening = self
            .runtime
            .listeners
            .get(&HostRef::Window)
            .is_some_and(|listeners| listeners.iter().any(|(kind, _)| kind == "load"));
        assigned || listening
    }

    /// Caller-initiated `click` or `submit` on `target`, with default actions.
    pub(crate) fn dispatch(
        &mut self,
        target: NodeId,
        event: &str,
        alerts: &mut Vec<String>,
        trace: &mut TraceState,
    ) -> std::result::Result<(), RuntimeFault> {
        self.with_interpreter(alerts, trace, |it| match event {
            "submit" => host::submit_form(it, target, true),
            "focus" => host::focus(it, target),
            "blur" => host::blur(it, target),
            _ => host::click(it, target),
        })
    }
}

fn window_load_listeners(it: &Interpreter<'_>) -> Vec<Value> {
    it.session
        .runtime
        .listeners
        .get(&HostRef::Window)
        .map(|listeners| {
            listeners
                .iter()
                .filter(|(kind, _)| kind == "load")
                .map(|(_, listener)| listener.clone())
                .collect()
        })
        .unwrap_or_default()
}
