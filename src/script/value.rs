use super::*;
use crate::js_regex::JsRegex;

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Rc<RefCell<ObjectValue>>),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Host(HostRef),
    /// A method read off a receiver, e.g. `document.getElementById`.
    Method { this: Box<Value>, name: Rc<str> },
    RegExp(Rc<JsRegex>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectClass {
    Plain,
    Error,
    Event,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectValue {
    pub(crate) class: ObjectClass,
    props: Vec<(String, Value)>,
}

impl ObjectValue {
    pub(crate) fn new(class: ObjectClass) -> Self {
        Self {
            class,
            props: Vec::new(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub(crate) fn set(&mut self, key: &str, value: Value) {
        if let Some(slot) = self.props.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.props.push((key.to_string(), value));
        }
    }
}

#[derive(Debug)]
pub(crate) struct FunctionValue {
    pub(crate) def: Rc<FunctionDef>,
    pub(crate) closure: Scope,
    /// Arrow functions capture `this` where they are created.
    pub(crate) lexical_this: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    StringCtor,
    NumberCtor,
    BooleanCtor,
    ParseInt,
    ParseFloat,
    IsNaN,
    ErrorCtor(&'static str),
    MathFloor,
    MathCeil,
    MathRound,
    MathAbs,
    MathMax,
    MathMin,
}

impl Builtin {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::StringCtor => "String",
            Self::NumberCtor => "Number",
            Self::BooleanCtor => "Boolean",
            Self::ParseInt => "parseInt",
            Self::ParseFloat => "parseFloat",
            Self::IsNaN => "isNaN",
            Self::ErrorCtor(name) => name,
            Self::MathFloor => "floor",
            Self::MathCeil => "ceil",
            Self::MathRound => "round",
            Self::MathAbs => "abs",
            Self::MathMax => "max",
            Self::MathMin => "min",
        }
    }
}

pub(crate) type Scope = Rc<RefCell<ScopeFrame>>;

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) value: Value,
    pub(crate) constant: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ScopeFrame {
    pub(crate) vars: HashMap<String, Binding>,
    pub(crate) parent: Option<Scope>,
}

pub(crate) fn new_scope(parent: Option<&Scope>) -> Scope {
    Rc::new(RefCell::new(ScopeFrame {
        vars: HashMap::new(),
        parent: parent.cloned(),
    }))
}

pub(crate) fn declare(scope: &Scope, name: &str, value: Value, constant: bool) {
    scope
        .borrow_mut()
        .vars
        .insert(name.to_string(), Binding { value, constant });
}

pub(crate) fn lookup(scope: &Scope, name: &str) -> Option<Value> {
    let mut current = scope.clone();
    loop {
        let parent = {
            let frame = current.borrow();
            if let Some(binding) = frame.vars.get(name) {
                return Some(binding.value.clone());
            }
            frame.parent.clone()
        };
        current = parent?;
    }
}

pub(crate) enum AssignOutcome {
    Assigned,
    Constant,
    Unbound,
}

pub(crate) fn assign_existing(scope: &Scope, name: &str, value: Value) -> AssignOutcome {
    let mut current = scope.clone();
    loop {
        let parent = {
            let mut frame = current.borrow_mut();
            if let Some(binding) = frame.vars.get_mut(name) {
                if binding.constant {
                    return AssignOutcome::Constant;
                }
                binding.value = value;
                return AssignOutcome::Assigned;
            }
            frame.parent.clone()
        };
        match parent {
            Some(parent) => current = parent,
            None => return AssignOutcome::Unbound,
        }
    }
}

pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    // `{:e}` yields the shortest round-trip digits; place the point the way JS does.
    let sci = format!("{:e}", n.abs());
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return format!("{n}");
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let Ok(exponent) = exponent.parse::<i32>() else {
        return format!("{n}");
    };
    let k = digits.len() as i32;
    let point = exponent + 1;
    let sign = if n < 0.0 { "-" } else { "" };
    let body = if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{exp_sign}{}", exponent.abs())
        } else {
            format!("{lead}.{rest}e{exp_sign}{}", exponent.abs())
        }
    };
    format!("{sign}{body}")
}

pub(crate) fn string_to_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) => {
            trimmed.parse::<f64>().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

impl Value {
    pub(crate) fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub(crate) fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Array(items) => {
                let items = items.borrow();
                match items.as_slice() {
                    [] => 0.0,
                    [single] => single.to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// String conversion for values that need no host lookup.
    pub(crate) fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::String(s) => s.clone(),
            Self::Object(object) => {
                let object = object.borrow();
                match object.class {
                    ObjectClass::Error => {
                        let name = object
                            .get("name")
                            .map_or_else(|| "Error".to_string(), Value::to_js_string);
                        let message = object
                            .get("message")
                            .map(Value::to_js_string)
                            .unwrap_or_default();
                        if message.is_empty() {
                            name
                        } else {
                            format!("{name}: {message}")
                        }
                    }
                    ObjectClass::Event => "[object Event]".to_string(),
                    ObjectClass::Plain => "[object Object]".to_string(),
                }
            }
            Self::Array(items) => items
                .borrow()
                .iter()
                .map(|item| match item {
                    Self::Undefined | Self::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Function(function) => {
                let name = function.def.name.as_deref().unwrap_or("");
                format!("function {name}() {{ [code] }}")
            }
            Self::Builtin(builtin) => format!("function {}() {{ [native code] }}", builtin.name()),
            Self::Method { name, .. } => format!("function {name}() {{ [native code] }}"),
            Self::RegExp(regex) => format!("/{}/{}", regex.source(), regex.flags()),
            Self::Host(host) => host.object_tag().to_string(),
        }
    }

    pub(crate) fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) | Self::Builtin(_) | Self::Method { .. } => "function",
            Self::Object(_) | Self::Array(_) | Self::RegExp(_) | Self::Host(_) => "object",
        }
    }

    pub(crate) fn is_callable(&self) -> bool {
        self.type_of() == "function"
    }

    pub(crate) fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::RegExp(a), Self::RegExp(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Host(a), Self::Host(b)) => a == b,
            (
                Self::Method { this: a, name: an },
                Self::Method { this: b, name: bn },
            ) => an == bn && a.strict_equals(b),
            _ => false,
        }
    }

    pub(crate) fn loose_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined | Self::Null, Self::Undefined | Self::Null) => true,
            (Self::Undefined | Self::Null, _) | (_, Self::Undefined | Self::Null) => false,
            (Self::Number(_) | Self::String(_) | Self::Bool(_), Self::Number(_) | Self::Bool(_))
            | (Self::Number(_) | Self::Bool(_), Self::String(_)) => {
                self.to_number() == other.to_number()
            }
            (Self::String(_), Self::Object(_) | Self::Array(_))
            | (Self::Object(_) | Self::Array(_), Self::String(_)) => {
                self.to_js_string() == other.to_js_string()
            }
            _ => self.strict_equals(other),
        }
    }
}

pub(crate) fn new_array(items: Vec<Value>) -> Value {
    Value::Array(Rc::new(RefCell::new(items)))
}

pub(crate) fn new_object(class: ObjectClass, props: Vec<(&str, Value)>) -> Value {
    let mut object = ObjectValue::new(class);
    for (key, value) in props {
        object.set(key, value);
    }
    Value::Object(Rc::new(RefCell::new(object)))
}
