//! A compact JavaScript-subset runtime, one instance per page session.

use super::*;

mod ast;
mod builtins;
mod interp;
mod lexer;
mod parser;
mod value;

use ast::*;
use lexer::SyntaxError;

pub(crate) use interp::{Flow, Interpreter, make_error};
pub(crate) use value::{
    AssignOutcome, Builtin, FunctionValue, ObjectClass, ObjectValue, Scope, Value, assign_existing,
    declare, lookup, new_array, new_object, new_scope, number_to_string,
};

#[cfg(test)]
pub(crate) use lexer::{Tok, tokenize};
#[cfg(test)]
pub(crate) use parser::{parse_handler_body, parse_program};

/// Script-visible state owned by one page session: the global scope plus
/// everything scripts attach to host objects.
#[derive(Debug)]
pub(crate) struct ScriptRuntime {
    pub(crate) globals: Scope,
    pub(crate) wrappers: WrapperRegistry,
    /// Script-assigned properties on document, location and node wrappers.
    pub(crate) expandos: HashMap<HostRef, ObjectValue>,
    /// `addEventListener` registrations per host object, in registration order.
    pub(crate) listeners: HashMap<HostRef, Vec<(String, Value)>>,
    pub(crate) call_depth_limit: usize,
}

impl ScriptRuntime {
    pub(crate) fn new(call_depth_limit: usize) -> Self {
        let globals = new_scope(None);
        builtins::install_globals(&globals);
        Self {
            globals,
            wrappers: WrapperRegistry::default(),
            expandos: HashMap::new(),
            listeners: HashMap::new(),
            call_depth_limit,
        }
    }

    pub(crate) fn expando(&self, host: HostRef, name: &str) -> Option<Value> {
        self.expandos.get(&host)?.get(name).cloned()
    }

    pub(crate) fn set_expando(&mut self, host: HostRef, name: &str, value: Value) {
        self.expandos
            .entry(host)
            .or_insert_with(|| ObjectValue::new(ObjectClass::Plain))
            .set(name, value);
    }

    pub(crate) fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().vars.get(name).map(|b| b.value.clone())
    }

    pub(crate) fn set_global(&mut self, name: &str, value: Value) {
        if let AssignOutcome::Unbound = assign_existing(&self.globals, name, value.clone()) {
            declare(&self.globals, name, value, false);
        }
    }
}
