use unicode_normalization::UnicodeNormalization;

use super::*;
use crate::js_regex::JsRegex;

const ERROR_CONSTRUCTORS: &[&str] = &[
    "Error",
    "TypeError",
    "ReferenceError",
    "RangeError",
    "SyntaxError",
];

const STRING_METHODS: &[&str] = &[
    "indexOf",
    "includes",
    "startsWith",
    "endsWith",
    "slice",
    "substring",
    "charAt",
    "trim",
    "toUpperCase",
    "toLowerCase",
    "split",
    "replace",
    "match",
    "normalize",
    "toString",
];

const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "join", "indexOf", "includes", "forEach", "map", "filter", "slice", "toString",
];

pub(crate) fn install_globals(globals: &Scope) {
    let entries = [
        ("String", Builtin::StringCtor),
        ("Number", Builtin::NumberCtor),
        ("Boolean", Builtin::BooleanCtor),
        ("parseInt", Builtin::ParseInt),
        ("parseFloat", Builtin::ParseFloat),
        ("isNaN", Builtin::IsNaN),
    ];
    for (name, builtin) in entries {
        declare(globals, name, Value::Builtin(builtin), false);
    }
    for name in ERROR_CONSTRUCTORS {
        declare(globals, name, Value::Builtin(Builtin::ErrorCtor(name)), false);
    }
    let math = new_object(
        ObjectClass::Plain,
        vec![
            ("floor", Value::Builtin(Builtin::MathFloor)),
            ("ceil", Value::Builtin(Builtin::MathCeil)),
            ("round", Value::Builtin(Builtin::MathRound)),
            ("abs", Value::Builtin(Builtin::MathAbs)),
            ("max", Value::Builtin(Builtin::MathMax)),
            ("min", Value::Builtin(Builtin::MathMin)),
            ("PI", Value::Number(std::f64::consts::PI)),
        ],
    );
    declare(globals, "Math", math, false);
    declare(globals, "NaN", Value::Number(f64::NAN), true);
    declare(globals, "Infinity", Value::Number(f64::INFINITY), true);
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

pub(crate) fn call_builtin(it: &mut Interpreter<'_>, builtin: Builtin, args: Vec<Value>) -> Flow<Value> {
    let first = arg(&args, 0);
    Ok(match builtin {
        Builtin::StringCtor => match first {
            Value::Undefined if args.is_empty() => Value::String(String::new()),
            value => Value::String(it.stringify(&value)),
        },
        Builtin::NumberCtor => {
            if args.is_empty() {
                Value::Number(0.0)
            } else {
                Value::Number(first.to_number())
            }
        }
        Builtin::BooleanCtor => Value::Bool(first.truthy()),
        Builtin::ParseInt => {
            let radix = arg(&args, 1).to_number();
            let radix = if radix.is_nan() || radix == 0.0 {
                None
            } else {
                Some(radix as u32)
            };
            Value::Number(parse_int(&it.stringify(&first), radix))
        }
        Builtin::ParseFloat => Value::Number(parse_float(&it.stringify(&first))),
        Builtin::IsNaN => Value::Bool(first.to_number().is_nan()),
        Builtin::ErrorCtor(name) => {
            let message = match first {
                Value::Undefined => String::new(),
                value => it.stringify(&value),
            };
            make_error(name, message)
        }
        Builtin::MathFloor => Value::Number(first.to_number().floor()),
        Builtin::MathCeil => Value::Number(first.to_number().ceil()),
        Builtin::MathRound => Value::Number((first.to_number() + 0.5).floor()),
        Builtin::MathAbs => Value::Number(first.to_number().abs()),
        Builtin::MathMax => Value::Number(fold_numbers(&args, f64::NEG_INFINITY, f64::max)),
        Builtin::MathMin => Value::Number(fold_numbers(&args, f64::INFINITY, f64::min)),
    })
}

fn fold_numbers(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = pick(acc, n);
    }
    acc
}

pub(crate) fn parse_int(raw: &str, radix: Option<u32>) -> f64 {
    let mut text = raw.trim_start();
    let negative = text.starts_with('-');
    if negative || text.starts_with('+') {
        text = &text[1..];
    }
    let mut radix = radix.unwrap_or(0);
    if matches!(radix, 0 | 16) && (text.starts_with("0x") || text.starts_with("0X")) {
        radix = 16;
        text = &text[2..];
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = text.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    // Decimal digits go through the correctly rounded float parser.
    let value = if radix == 10 {
        digits.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits.chars().fold(0f64, |value, c| {
            value * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
        })
    };
    if negative { -value } else { value }
}

pub(crate) fn parse_float(raw: &str) -> f64 {
    let text = raw.trim_start();
    let mut end = 0usize;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = text.as_bytes();
    while end < bytes.len() {
        let b = bytes[end];
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 || matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    if text[end..].starts_with("Infinity") && !seen_digit {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    // Trim dangling exponent or sign characters.
    let mut candidate = &text[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return value;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    f64::NAN
}

/// Non-method properties of primitives, arrays, regexes and functions.
pub(crate) fn property_of(value: &Value, name: &str) -> Option<Value> {
    match value {
        Value::String(s) => {
            if name == "length" {
                return Some(Value::Number(s.chars().count() as f64));
            }
            let index = name.parse::<usize>().ok()?;
            s.chars().nth(index).map(|c| Value::String(c.to_string()))
        }
        Value::Array(items) => {
            if name == "length" {
                return Some(Value::Number(items.borrow().len() as f64));
            }
            let index = name.parse::<usize>().ok()?;
            items.borrow().get(index).cloned()
        }
        Value::RegExp(regex) => match name {
            "source" => Some(Value::String(regex.source().to_string())),
            "flags" => Some(Value::String(regex.flags().to_string())),
            "global" => Some(Value::Bool(regex.is_global())),
            _ => None,
        },
        Value::Function(function) => match name {
            "name" => Some(Value::String(function.def.name.clone().unwrap_or_default())),
            "length" => Some(Value::Number(function.def.params.len() as f64)),
            _ => None,
        },
        Value::Builtin(builtin) if name == "name" => Some(Value::String(builtin.name().to_string())),
        _ => None,
    }
}

/// Bound method values for receivers that carry builtin methods.
pub(crate) fn method_value(receiver: &Value, name: &str) -> Option<Value> {
    let known = match receiver {
        Value::String(_) => STRING_METHODS.contains(&name),
        Value::Array(_) => ARRAY_METHODS.contains(&name),
        Value::Number(_) => matches!(name, "toString" | "toFixed"),
        Value::Bool(_) => name == "toString",
        Value::RegExp(_) => matches!(name, "test" | "exec" | "toString"),
        Value::Object(object) => match object.borrow().class {
            ObjectClass::Event => matches!(name, "preventDefault" | "stopPropagation"),
            ObjectClass::Error | ObjectClass::Plain => name == "toString",
        },
        _ => false,
    };
    known.then(|| Value::Method {
        this: Box::new(receiver.clone()),
        name: Rc::from(name),
    })
}

pub(crate) fn call_method(
    it: &mut Interpreter<'_>,
    receiver: Value,
    name: &str,
    args: Vec<Value>,
) -> Flow<Value> {
    if name == "toString" && !matches!(receiver, Value::Number(_)) {
        return Ok(Value::String(it.stringify(&receiver)));
    }
    match &receiver {
        Value::String(s) => string_method(it, s, name, &args),
        Value::Array(items) => array_method(it, &receiver, items, name, args),
        Value::Number(n) => number_method(it, *n, name, &args),
        Value::RegExp(regex) => {
            let input = it.stringify(&arg(&args, 0));
            match name {
                "test" => regex
                    .is_match(&input)
                    .map(Value::Bool)
                    .map_err(|err| it.throw_error("SyntaxError", err.to_string())),
                _ => captures_value(it, regex, &input),
            }
        }
        Value::Object(object) => {
            if name == "preventDefault" {
                object.borrow_mut().set("defaultPrevented", Value::Bool(true));
            }
            Ok(Value::Undefined)
        }
        other => Err(it.throw_error(
            "TypeError",
            format!("{name} is not a function on {}", other.type_of()),
        )),
    }
}

fn captures_value(it: &Interpreter<'_>, regex: &JsRegex, input: &str) -> Flow<Value> {
    let captures = regex
        .captures(input)
        .map_err(|err| it.throw_error("SyntaxError", err.to_string()))?;
    Ok(match captures {
        Some(groups) => new_array(
            groups
                .into_iter()
                .map(|group| group.map_or(Value::Undefined, Value::String))
                .collect(),
        ),
        None => Value::Null,
    })
}

fn char_index(len: usize, raw: &Value, default: usize) -> usize {
    match raw {
        Value::Undefined => default,
        value => {
            let n = value.to_number();
            if n.is_nan() {
                0
            } else if n < 0.0 {
                len.saturating_sub((-n) as usize)
            } else {
                (n as usize).min(len)
            }
        }
    }
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn to_regex(it: &Interpreter<'_>, value: &Value) -> Flow<Rc<JsRegex>> {
    match value {
        Value::RegExp(regex) => Ok(regex.clone()),
        other => {
            let pattern = it.stringify(other);
            JsRegex::new(&pattern, "")
                .map(Rc::new)
                .map_err(|err| it.throw_error("SyntaxError", err.to_string()))
        }
    }
}

fn string_method(it: &mut Interpreter<'_>, s: &str, name: &str, args: &[Value]) -> Flow<Value> {
    let len = s.chars().count();
    let text_arg = |it: &Interpreter<'_>, index: usize| it.stringify(&arg(args, index));
    Ok(match name {
        "indexOf" => {
            let needle = text_arg(it, 0);
            Value::Number(match s.find(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            })
        }
        "includes" => Value::Bool(s.contains(&text_arg(it, 0))),
        "startsWith" => Value::Bool(s.starts_with(&text_arg(it, 0))),
        "endsWith" => Value::Bool(s.ends_with(&text_arg(it, 0))),
        "slice" => {
            let start = char_index(len, &arg(args, 0), 0);
            let end = char_index(len, &arg(args, 1), len);
            Value::String(char_slice(s, start, end))
        }
        "substring" => {
            let clamp = |value: Value, default: usize| match value {
                Value::Undefined => default,
                value => {
                    let n = value.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(len)
                    }
                }
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), len);
            Value::String(char_slice(s, a.min(b), a.max(b)))
        }
        "charAt" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index };
            Value::String(if index < 0.0 {
                String::new()
            } else {
                s.chars()
                    .nth(index as usize)
                    .map(String::from)
                    .unwrap_or_default()
            })
        }
        "trim" => Value::String(s.trim().to_string()),
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "split" => {
            let parts: Vec<String> = match arg(args, 0) {
                Value::Undefined => vec![s.to_string()],
                Value::RegExp(regex) => regex
                    .split(s)
                    .map_err(|err| it.throw_error("SyntaxError", err.to_string()))?,
                separator => {
                    let separator = it.stringify(&separator);
                    if separator.is_empty() {
                        s.chars().map(String::from).collect()
                    } else {
                        s.split(separator.as_str()).map(String::from).collect()
                    }
                }
            };
            new_array(parts.into_iter().map(Value::String).collect())
        }
        "replace" => {
            let replacement = arg(args, 1);
            match arg(args, 0) {
                Value::RegExp(regex) => {
                    let replacement = it.stringify(&replacement);
                    Value::String(
                        regex
                            .replace(s, &replacement)
                            .map_err(|err| it.throw_error("SyntaxError", err.to_string()))?,
                    )
                }
                pattern => {
                    let pattern = it.stringify(&pattern);
                    let Some(byte) = s.find(&pattern) else {
                        return Ok(Value::String(s.to_string()));
                    };
                    let inserted = if replacement.is_callable() {
                        let result = it.call_function(
                            &replacement,
                            Value::Undefined,
                            vec![Value::String(pattern.clone())],
                        )?;
                        it.stringify(&result)
                    } else {
                        it.stringify(&replacement)
                    };
                    let mut out = String::with_capacity(s.len());
                    out.push_str(&s[..byte]);
                    out.push_str(&inserted);
                    out.push_str(&s[byte + pattern.len()..]);
                    Value::String(out)
                }
            }
        }
        "match" => {
            let regex = to_regex(it, &arg(args, 0))?;
            if regex.is_global() {
                let all = regex
                    .find_all(s)
                    .map_err(|err| it.throw_error("SyntaxError", err.to_string()))?;
                if all.is_empty() {
                    Value::Null
                } else {
                    new_array(all.into_iter().map(Value::String).collect())
                }
            } else {
                captures_value(it, &regex, s)?
            }
        }
        "normalize" => {
            let form = match arg(args, 0) {
                Value::Undefined => "NFC".to_string(),
                value => it.stringify(&value),
            };
            Value::String(match form.as_str() {
                "NFC" => s.nfc().collect(),
                "NFD" => s.nfd().collect(),
                "NFKC" => s.nfkc().collect(),
                "NFKD" => s.nfkd().collect(),
                _ => {
                    return Err(it.throw_error(
                        "RangeError",
                        format!("The normalization form should be one of NFC, NFD, NFKC, NFKD. Got {form}"),
                    ));
                }
            })
        }
        _ => Value::Undefined,
    })
}

fn number_method(it: &mut Interpreter<'_>, n: f64, name: &str, args: &[Value]) -> Flow<Value> {
    match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits };
            if !(0.0..=100.0).contains(&digits) {
                return Err(it.throw_error("RangeError", "toFixed() digits argument must be between 0 and 100"));
            }
            Ok(Value::String(format!("{n:.*}", digits as usize)))
        }
        _ => {
            let radix = arg(args, 0).to_number();
            if radix.is_nan() || radix == 10.0 || n.fract() != 0.0 {
                return Ok(Value::String(number_to_string(n)));
            }
            if !(2.0..=36.0).contains(&radix) {
                return Err(it.throw_error("RangeError", "toString() radix must be between 2 and 36"));
            }
            Ok(Value::String(integer_to_radix(n, radix as u32)))
        }
    }
}

fn integer_to_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let mut value = n.abs() as u64;
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % u64::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        value /= u64::from(radix);
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn array_method(
    it: &mut Interpreter<'_>,
    receiver: &Value,
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    args: Vec<Value>,
) -> Flow<Value> {
    Ok(match name {
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args);
            Value::Number(items.len() as f64)
        }
        "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
        "join" => {
            let separator = match arg(&args, 0) {
                Value::Undefined => ",".to_string(),
                value => it.stringify(&value),
            };
            let snapshot = items.borrow().clone();
            let parts: Vec<String> = snapshot
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => it.stringify(other),
                })
                .collect();
            Value::String(parts.join(&separator))
        }
        "indexOf" => {
            let needle = arg(&args, 0);
            let position = items.borrow().iter().position(|item| item.strict_equals(&needle));
            Value::Number(position.map_or(-1.0, |p| p as f64))
        }
        "includes" => {
            let needle = arg(&args, 0);
            Value::Bool(items.borrow().iter().any(|item| {
                item.strict_equals(&needle)
                    || matches!((item, &needle), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
            }))
        }
        "slice" => {
            let snapshot = items.borrow().clone();
            let len = snapshot.len();
            let start = char_index(len, &arg(&args, 0), 0);
            let end = char_index(len, &arg(&args, 1), len);
            new_array(snapshot.get(start..end.max(start)).unwrap_or_default().to_vec())
        }
        "forEach" | "map" | "filter" => {
            let callback = arg(&args, 0);
            if !callback.is_callable() {
                return Err(it.throw_error(
                    "TypeError",
                    format!("{} is not a function", it.stringify(&callback)),
                ));
            }
            let snapshot = items.borrow().clone();
            let mut out = Vec::new();
            for (index, item) in snapshot.into_iter().enumerate() {
                let result = it.call_function(
                    &callback,
                    Value::Undefined,
                    vec![item.clone(), Value::Number(index as f64), receiver.clone()],
                )?;
                match name {
                    "map" => out.push(result),
                    "filter" if result.truthy() => out.push(item),
                    _ => {}
                }
            }
            if name == "forEach" {
                Value::Undefined
            } else {
                new_array(out)
            }
        }
        _ => Value::Undefined,
    })
}
