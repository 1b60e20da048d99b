use std::cmp::Ordering;

use super::parser::{parse_handler_body, parse_program};
use super::*;
use crate::host;
use crate::js_regex::JsRegex;

/// Abrupt completion that unwinds past statements.
#[derive(Debug, Clone)]
pub(crate) enum Interrupt {
    /// Catchable by `try`/`catch`.
    Throw {
        value: Value,
        location: SourceLocation,
    },
    /// Not catchable by script code.
    Fault(RuntimeFault),
}

pub(crate) type Flow<T> = std::result::Result<T, Interrupt>;

/// Largest `length` a script may assign, as in JS (2^32 - 1).
const MAX_ARRAY_LENGTH: f64 = 4_294_967_295.0;
const MAX_DENSE_ELEMENTS: usize = 1 << 20;
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

#[derive(Debug)]
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

enum Reference {
    Binding(String),
    Property(Value, String),
    Element(Rc<RefCell<Vec<Value>>>, usize),
}

/// Evaluates script source against one page session.
pub(crate) struct Interpreter<'a> {
    pub(crate) session: &'a mut PageSession,
    pub(crate) alerts: &'a mut Vec<String>,
    pub(crate) trace: &'a mut TraceState,
    source: Rc<str>,
    offset: usize,
    depth: usize,
    this: Value,
}

fn syntax_fault(source: &str, err: &SyntaxError) -> RuntimeFault {
    RuntimeFault::new(
        FaultKind::Syntax,
        err.message.clone(),
        Some(SourceLocation::at(source, err.offset)),
    )
}

fn is_string_like(value: &Value) -> bool {
    !matches!(
        value,
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
    )
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        session: &'a mut PageSession,
        alerts: &'a mut Vec<String>,
        trace: &'a mut TraceState,
    ) -> Self {
        Self {
            session,
            alerts,
            trace,
            source: Rc::from(""),
            offset: 0,
            depth: 0,
            this: Value::Host(HostRef::Window),
        }
    }

    /// Evaluates source in the global scope from inside a running script,
    /// e.g. for `javascript:` links.
    pub(crate) fn eval_source(&mut self, source: &str) -> Flow<()> {
        let source: Rc<str> = Rc::from(source);
        let program = parse_program(&source)
            .map_err(|err| Interrupt::Fault(syntax_fault(&source, &err)))?;
        let previous = std::mem::replace(&mut self.source, source);
        let saved_offset = self.offset;
        let saved_this = std::mem::replace(&mut self.this, Value::Host(HostRef::Window));
        let globals = self.session.runtime.globals.clone();
        self.hoist_vars(&program, &globals);
        let result = self.exec_block_in(&program, &globals);
        self.this = saved_this;
        self.offset = saved_offset;
        self.source = previous;
        result.map(|_| ())
    }

    /// Compiles an inline `on<type>` attribute body into a function taking
    /// `event`.
    pub(crate) fn compile_handler(&mut self, source: &str) -> Flow<Value> {
        let source: Rc<str> = Rc::from(source);
        let body = parse_handler_body(&source)
            .map_err(|err| Interrupt::Fault(syntax_fault(&source, &err)))?;
        Ok(Value::Function(Rc::new(FunctionValue {
            def: Rc::new(FunctionDef {
                name: None,
                params: vec!["event".to_string()],
                body: FunctionBody::Block(body),
                is_arrow: false,
                source,
            }),
            closure: self.session.runtime.globals.clone(),
            lexical_this: None,
        })))
    }

    pub(crate) fn into_fault(&self, interrupt: Interrupt) -> RuntimeFault {
        match interrupt {
            Interrupt::Fault(fault) => fault,
            Interrupt::Throw { value, location } => {
                if let Value::Object(object) = &value {
                    let object = object.borrow();
                    if object.class == ObjectClass::Error {
                        let name = object
                            .get("name")
                            .map(Value::to_js_string)
                            .unwrap_or_default();
                        let message = object
                            .get("message")
                            .map(Value::to_js_string)
                            .unwrap_or_default();
                        return RuntimeFault::new(
                            FaultKind::from_error_name(&name),
                            message,
                            Some(location),
                        );
                    }
                }
                RuntimeFault::new(FaultKind::Thrown, self.stringify(&value), Some(location))
            }
        }
    }

    pub(crate) fn location(&self) -> SourceLocation {
        SourceLocation::at(&self.source, self.offset)
    }

    pub(crate) fn throw_error(&self, name: &'static str, message: impl Into<String>) -> Interrupt {
        Interrupt::Throw {
            value: make_error(name, message.into()),
            location: self.location(),
        }
    }

    pub(crate) fn unsupported(&self, operation: &str) -> Interrupt {
        Interrupt::Fault(RuntimeFault::new(
            FaultKind::Unsupported,
            format!("{operation} is not supported"),
            Some(self.location()),
        ))
    }

    /// Host-aware string conversion.
    pub(crate) fn stringify(&self, value: &Value) -> String {
        match value {
            Value::Host(host_ref) => host::host_to_string(self, *host_ref),
            other => other.to_js_string(),
        }
    }

    fn hoist_vars(&self, stmts: &[Stmt], scope: &Scope) {
        for stmt in stmts {
            self.hoist_vars_in(stmt, scope);
        }
    }

    fn hoist_vars_in(&self, stmt: &Stmt, scope: &Scope) {
        match &stmt.kind {
            StmtKind::VarDecl {
                kind: DeclKind::Var,
                decls,
            } => {
                for (name, _) in decls {
                    if !scope.borrow().vars.contains_key(name) {
                        declare(scope, name, Value::Undefined, false);
                    }
                }
            }
            StmtKind::If {
                then, otherwise, ..
            } => {
                self.hoist_vars_in(then, scope);
                if let Some(otherwise) = otherwise {
                    self.hoist_vars_in(otherwise, scope);
                }
            }
            StmtKind::While { body, .. } => self.hoist_vars_in(body, scope),
            StmtKind::For { init, body, .. } => {
                if let Some(init) = init {
                    self.hoist_vars_in(init, scope);
                }
                self.hoist_vars_in(body, scope);
            }
            StmtKind::Try {
                block,
                catch,
                finally,
            } => {
                self.hoist_vars(block, scope);
                if let Some((_, body)) = catch {
                    self.hoist_vars(body, scope);
                }
                if let Some(finally) = finally {
                    self.hoist_vars(finally, scope);
                }
            }
            StmtKind::Block(stmts) => self.hoist_vars(stmts, scope),
            _ => {}
        }
    }

    fn make_closure(&self, def: &Rc<FunctionDef>, scope: &Scope) -> Value {
        Value::Function(Rc::new(FunctionValue {
            def: def.clone(),
            closure: scope.clone(),
            lexical_this: def.is_arrow.then(|| self.this.clone()),
        }))
    }

    fn exec_block_in(&mut self, stmts: &[Stmt], scope: &Scope) -> Flow<Completion> {
        for stmt in stmts {
            if let StmtKind::FunctionDecl(def) = &stmt.kind {
                if let Some(name) = &def.name {
                    declare(scope, name, self.make_closure(def, scope), false);
                }
            }
        }
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Scope) -> Flow<Completion> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.exec_stmt_inner(stmt, scope)
        })
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt, scope: &Scope) -> Flow<Completion> {
        self.offset = stmt.offset;
        match &stmt.kind {
            StmtKind::VarDecl { kind, decls } => {
                for (name, init) in decls {
                    match kind {
                        DeclKind::Var => {
                            let Some(init) = init else {
                                continue;
                            };
                            let value = self.eval(init, scope)?;
                            if let AssignOutcome::Unbound = assign_existing(scope, name, value.clone())
                            {
                                declare(scope, name, value, false);
                            }
                        }
                        DeclKind::Let | DeclKind::Const => {
                            let value = match init {
                                Some(init) => self.eval(init, scope)?,
                                None => Value::Undefined,
                            };
                            declare(scope, name, value, *kind == DeclKind::Const);
                        }
                    }
                }
                Ok(Completion::Normal)
            }
            StmtKind::FunctionDecl(_) | StmtKind::Empty => Ok(Completion::Normal),
            StmtKind::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Completion::Normal)
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, scope)?.truthy() {
                    self.exec_stmt(then, scope)
                } else if let Some(otherwise) = otherwise {
                    self.exec_stmt(otherwise, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(cond, scope)?.truthy() {
                    match self.exec_stmt(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let loop_scope = new_scope(Some(scope));
                if let Some(init) = init {
                    self.exec_stmt(init, &loop_scope)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval(cond, &loop_scope)?.truthy() {
                            break;
                        }
                    }
                    match self.exec_stmt(body, &loop_scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Completion::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            StmtKind::Break => Ok(Completion::Break),
            StmtKind::Continue => Ok(Completion::Continue),
            StmtKind::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                self.offset = stmt.offset;
                Err(Interrupt::Throw {
                    value,
                    location: self.location(),
                })
            }
            StmtKind::Try {
                block,
                catch,
                finally,
            } => {
                let mut outcome = self.exec_block_in(block, &new_scope(Some(scope)));
                if let (Err(Interrupt::Throw { value, .. }), Some((binding, body))) =
                    (&outcome, catch)
                {
                    let catch_scope = new_scope(Some(scope));
                    if let Some(binding) = binding {
                        declare(&catch_scope, binding, value.clone(), false);
                    }
                    outcome = self.exec_block_in(body, &catch_scope);
                }
                if let Some(finally) = finally {
                    match self.exec_block_in(finally, &new_scope(Some(scope)))? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                outcome
            }
            StmtKind::Block(stmts) => self.exec_block_in(stmts, &new_scope(Some(scope))),
        }
    }

    /// Nesting is bounded by the parser, but calls multiply it, so evaluation
    /// grows the stack on demand.
    pub(crate) fn eval(&mut self, expr: &Expr, scope: &Scope) -> Flow<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.eval_inner(expr, scope))
    }

    fn eval_inner(&mut self, expr: &Expr, scope: &Scope) -> Flow<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::This => Ok(self.this.clone()),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            let value = self.eval(expr, scope)?;
                            out.push_str(&self.stringify(&value));
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Regex { pattern, flags } => JsRegex::new(pattern, flags)
                .map(|regex| Value::RegExp(Rc::new(regex)))
                .map_err(|err| {
                    self.throw_error(
                        "SyntaxError",
                        format!("invalid regular expression /{pattern}/: {err}"),
                    )
                }),
            Expr::Var(name) => self.read_variable(name, scope),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?);
                }
                Ok(new_array(values))
            }
            Expr::Object(entries) => {
                let mut object = ObjectValue::new(ObjectClass::Plain);
                for (key, value) in entries {
                    let value = self.eval(value, scope)?;
                    object.set(key, value);
                }
                Ok(Value::Object(Rc::new(RefCell::new(object))))
            }
            Expr::Function(def) => Ok(self.make_closure(def, scope)),
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                self.get_property(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                if let (Value::Array(items), Value::Number(n)) = (&object, &index) {
                    if *n >= 0.0 && n.fract() == 0.0 {
                        return Ok(items
                            .borrow()
                            .get(*n as usize)
                            .cloned()
                            .unwrap_or(Value::Undefined));
                    }
                }
                let key = self.stringify(&index);
                self.get_property(&object, &key)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, scope),
            Expr::New { callee, args } => {
                let callee = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                self.construct(&callee, args)
            }
            Expr::Assign { target, op, value } => {
                let reference = self.resolve_reference(target, scope)?;
                let value = match op {
                    AssignOp::Assign => self.eval(value, scope)?,
                    op => {
                        let current = self.read_reference(&reference, scope)?;
                        let rhs = self.eval(value, scope)?;
                        let binary = match op {
                            AssignOp::Add => BinaryOp::Add,
                            AssignOp::Sub => BinaryOp::Sub,
                            AssignOp::Mul => BinaryOp::Mul,
                            AssignOp::Div | AssignOp::Assign => BinaryOp::Div,
                        };
                        self.binary(binary, &current, &rhs)
                    }
                };
                self.write_reference(reference, value.clone(), scope)?;
                Ok(value)
            }
            Expr::Update {
                target,
                delta,
                prefix,
            } => {
                let reference = self.resolve_reference(target, scope)?;
                let old = self.read_reference(&reference, scope)?.to_number();
                let new = old + delta;
                self.write_reference(reference, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Unary { op, operand } => {
                if let (UnaryOp::TypeOf, Expr::Var(name)) = (op, operand.as_ref()) {
                    return match self.lookup_variable(name, scope)? {
                        Some(value) => Ok(Value::String(value.type_of().to_string())),
                        None => Ok(Value::String("undefined".to_string())),
                    };
                }
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::String(value.type_of().to_string()),
                    UnaryOp::Void => Value::Undefined,
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Ok(self.binary(*op, &left, &right))
            }
            Expr::Logical { and, left, right } => {
                let left = self.eval(left, scope)?;
                if left.truthy() == *and {
                    self.eval(right, scope)
                } else {
                    Ok(left)
                }
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Sequence(items) => {
                let mut last = Value::Undefined;
                for item in items {
                    last = self.eval(item, scope)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Scope) -> Flow<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.eval(arg, scope)?);
        }
        Ok(out)
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], scope: &Scope) -> Flow<Value> {
        let (this, function, label) = match callee {
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                let function = self.get_property(&object, property)?;
                (object, function, property.clone())
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let key = self.eval(index, scope)?;
                let key = self.stringify(&key);
                let function = self.get_property(&object, &key)?;
                (object, function, key)
            }
            Expr::Var(name) => (
                Value::Host(HostRef::Window),
                self.read_variable(name, scope)?,
                name.clone(),
            ),
            other => (
                Value::Host(HostRef::Window),
                self.eval(other, scope)?,
                "expression".to_string(),
            ),
        };
        let args = self.eval_args(args, scope)?;
        if !function.is_callable() {
            return Err(self.throw_error("TypeError", format!("{label} is not a function")));
        }
        self.call_function(&function, this, args)
    }

    pub(crate) fn call_function(
        &mut self,
        function: &Value,
        this: Value,
        args: Vec<Value>,
    ) -> Flow<Value> {
        match function {
            Value::Function(function) => self.call_closure(function, this, args),
            Value::Builtin(builtin) => builtins::call_builtin(self, *builtin, args),
            Value::Method { this, name } => {
                let receiver = this.as_ref().clone();
                match receiver {
                    Value::Host(host_ref) => host::host_invoke(self, host_ref, name, args),
                    other => builtins::call_method(self, other, name, args),
                }
            }
            other => Err(self.throw_error(
                "TypeError",
                format!("{} is not a function", other.type_of()),
            )),
        }
    }

    fn call_closure(
        &mut self,
        function: &Rc<FunctionValue>,
        this: Value,
        args: Vec<Value>,
    ) -> Flow<Value> {
        if self.depth >= self.session.runtime.call_depth_limit {
            return Err(self.throw_error("RangeError", "Maximum call stack size exceeded"));
        }
        let def = &function.def;
        let scope = new_scope(Some(&function.closure));
        if let (Some(name), false) = (&def.name, def.is_arrow) {
            declare(&scope, name, Value::Function(function.clone()), false);
        }
        if !def.is_arrow {
            declare(&scope, "arguments", new_array(args.clone()), false);
        }
        let mut args = args.into_iter();
        for param in &def.params {
            declare(&scope, param, args.next().unwrap_or(Value::Undefined), false);
        }

        let saved_this = std::mem::replace(
            &mut self.this,
            function.lexical_this.clone().unwrap_or(this),
        );
        let saved_source = std::mem::replace(&mut self.source, def.source.clone());
        let saved_offset = self.offset;
        self.depth += 1;

        let result = match &def.body {
            FunctionBody::Block(body) => {
                self.hoist_vars(body, &scope);
                self.exec_block_in(body, &scope).map(|completion| match completion {
                    Completion::Return(value) => value,
                    _ => Value::Undefined,
                })
            }
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
        };

        self.depth -= 1;
        self.offset = saved_offset;
        self.source = saved_source;
        self.this = saved_this;
        result
    }

    fn construct(&mut self, callee: &Value, args: Vec<Value>) -> Flow<Value> {
        match callee {
            Value::Builtin(Builtin::ErrorCtor(name)) => {
                let message = args.first().map(|v| self.stringify(v)).unwrap_or_default();
                Ok(make_error(name, message))
            }
            Value::Builtin(builtin) => builtins::call_builtin(self, *builtin, args),
            Value::Function(function) if !function.def.is_arrow => {
                let instance = new_object(ObjectClass::Plain, Vec::new());
                let returned = self.call_closure(function, instance.clone(), args)?;
                Ok(match returned {
                    Value::Object(_) | Value::Array(_) => returned,
                    _ => instance,
                })
            }
            other => Err(self.throw_error(
                "TypeError",
                format!("{} is not a constructor", self.stringify(other)),
            )),
        }
    }

    /// Scope chain first, then window properties.
    fn lookup_variable(&mut self, name: &str, scope: &Scope) -> Flow<Option<Value>> {
        if let Some(value) = lookup(scope, name) {
            return Ok(Some(value));
        }
        host::window_lookup(self, name)
    }

    fn read_variable(&mut self, name: &str, scope: &Scope) -> Flow<Value> {
        match self.lookup_variable(name, scope)? {
            Some(value) => Ok(value),
            None => Err(self.throw_error("ReferenceError", format!("{name} is not defined"))),
        }
    }

    fn resolve_reference(&mut self, target: &Expr, scope: &Scope) -> Flow<Reference> {
        match target {
            Expr::Var(name) => Ok(Reference::Binding(name.clone())),
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                Ok(Reference::Property(object, property.clone()))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                if let (Value::Array(items), Value::Number(n)) = (&object, &index) {
                    if *n >= 0.0 && n.fract() == 0.0 {
                        return Ok(Reference::Element(items.clone(), *n as usize));
                    }
                }
                let key = self.stringify(&index);
                Ok(Reference::Property(object, key))
            }
            _ => Err(self.throw_error("SyntaxError", "invalid assignment target")),
        }
    }

    fn read_reference(&mut self, reference: &Reference, scope: &Scope) -> Flow<Value> {
        match reference {
            Reference::Binding(name) => self.read_variable(name, scope),
            Reference::Property(object, key) => self.get_property(object, key),
            Reference::Element(items, index) => Ok(items
                .borrow()
                .get(*index)
                .cloned()
                .unwrap_or(Value::Undefined)),
        }
    }

    fn write_reference(&mut self, reference: Reference, value: Value, scope: &Scope) -> Flow<()> {
        match reference {
            Reference::Binding(name) => match assign_existing(scope, &name, value.clone()) {
                AssignOutcome::Assigned => Ok(()),
                AssignOutcome::Constant => {
                    Err(self.throw_error("TypeError", "Assignment to constant variable."))
                }
                // Undeclared names land on window.
                AssignOutcome::Unbound => host::host_set(self, HostRef::Window, &name, value),
            },
            Reference::Property(object, key) => self.set_property(&object, &key, value),
            Reference::Element(items, index) => self.write_element(&items, index, value),
        }
    }

    /// Arrays are dense, so growth past `MAX_DENSE_ELEMENTS` is refused.
    fn dense_length(&self, len: usize) -> Flow<usize> {
        if len > MAX_DENSE_ELEMENTS {
            return Err(self.throw_error(
                "RangeError",
                format!("array length {len} exceeds the supported {MAX_DENSE_ELEMENTS} elements"),
            ));
        }
        Ok(len)
    }

    fn write_element(
        &self,
        items: &Rc<RefCell<Vec<Value>>>,
        index: usize,
        value: Value,
    ) -> Flow<()> {
        let mut items = items.borrow_mut();
        if index >= items.len() {
            let len = self.dense_length(index.saturating_add(1))?;
            items.resize(len, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }

    pub(crate) fn get_property(&mut self, object: &Value, name: &str) -> Flow<Value> {
        match object {
            Value::Undefined | Value::Null => Err(self.throw_error(
                "TypeError",
                format!(
                    "Cannot read properties of {} (reading '{name}')",
                    object.to_js_string()
                ),
            )),
            Value::Host(host_ref) => host::host_get(self, *host_ref, name),
            Value::Object(obj) => {
                if let Some(value) = obj.borrow().get(name) {
                    return Ok(value.clone());
                }
                Ok(builtins::method_value(object, name).unwrap_or(Value::Undefined))
            }
            other => Ok(builtins::property_of(other, name)
                .or_else(|| builtins::method_value(other, name))
                .unwrap_or(Value::Undefined)),
        }
    }

    pub(crate) fn set_property(&mut self, object: &Value, name: &str, value: Value) -> Flow<()> {
        match object {
            Value::Undefined | Value::Null => Err(self.throw_error(
                "TypeError",
                format!(
                    "Cannot set properties of {} (setting '{name}')",
                    object.to_js_string()
                ),
            )),
            Value::Host(host_ref) => host::host_set(self, *host_ref, name, value),
            Value::Object(obj) => {
                obj.borrow_mut().set(name, value);
                Ok(())
            }
            Value::Array(items) => {
                if name == "length" {
                    let len = value.to_number();
                    if !(0.0..=MAX_ARRAY_LENGTH).contains(&len) || len.fract() != 0.0 {
                        return Err(self.throw_error("RangeError", "Invalid array length"));
                    }
                    let len = self.dense_length(len as usize)?;
                    items.borrow_mut().resize(len, Value::Undefined);
                } else if let Ok(index) = name.parse::<usize>() {
                    self.write_element(items, index, value)?;
                }
                Ok(())
            }
            // Writes to primitives are dropped.
            _ => Ok(()),
        }
    }

    pub(crate) fn loose_equals(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Host(_), Value::String(s)) | (Value::String(s), Value::Host(_)) => {
                let host = if matches!(left, Value::Host(_)) { left } else { right };
                self.stringify(host) == *s
            }
            _ => left.loose_equals(right),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Value {
        match op {
            BinaryOp::Add => {
                if is_string_like(left) || is_string_like(right) {
                    let mut out = self.stringify(left);
                    out.push_str(&self.stringify(right));
                    Value::String(out)
                } else {
                    Value::Number(left.to_number() + right.to_number())
                }
            }
            BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
            BinaryOp::Eq => Value::Bool(self.loose_equals(left, right)),
            BinaryOp::NotEq => Value::Bool(!self.loose_equals(left, right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
            BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
                let ordering = match (left, right) {
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => left.to_number().partial_cmp(&right.to_number()),
                };
                Value::Bool(match (op, ordering) {
                    (_, None) => false,
                    (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                    (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                    (BinaryOp::LtEq, Some(o)) => o != Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                })
            }
        }
    }
}

pub(crate) fn make_error(name: &str, message: String) -> Value {
    new_object(
        ObjectClass::Error,
        vec![
            ("name", Value::String(name.to_string())),
            ("message", Value::String(message)),
        ],
    )
}
