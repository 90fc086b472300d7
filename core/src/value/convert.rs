//! Conversion between generic application values and protocol variables.
//!
//! Generic values are `serde_json::Value`: numbers for the numeric
//! syntaxes, strings for octet strings, identifiers and addresses, `null` for
//! the Null syntax. Conversion is stateless and never truncates: a value that
//! does not fit its syntax is a [`ConversionError`].

use std::net::Ipv4Addr;

use serde_json::Value;
use thiserror::Error;

use super::syntax::Syntax;
use super::variable::Variable;
use crate::namespace::ObjectId;

/// A value that could not be converted to the requested syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {input} to {syntax}: {reason}")]
pub struct ConversionError {
    pub syntax: Syntax,
    pub input: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(syntax: Syntax, input: impl Into<String>, reason: impl Into<String>) -> Self {
        ConversionError {
            syntax,
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Input accepted by [`to_variable`]: an already-typed variable or a
/// generic value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueInput {
    Typed(Variable),
    Generic(Value),
}

impl From<Variable> for ValueInput {
    fn from(v: Variable) -> Self {
        ValueInput::Typed(v)
    }
}

impl From<Value> for ValueInput {
    fn from(v: Value) -> Self {
        ValueInput::Generic(v)
    }
}

impl From<&Value> for ValueInput {
    fn from(v: &Value) -> Self {
        ValueInput::Generic(v.clone())
    }
}

impl From<&str> for ValueInput {
    fn from(v: &str) -> Self {
        ValueInput::Generic(Value::String(v.to_string()))
    }
}

impl From<String> for ValueInput {
    fn from(v: String) -> Self {
        ValueInput::Generic(Value::String(v))
    }
}

macro_rules! numeric_input {
    ($($t:ty),*) => {
        $(impl From<$t> for ValueInput {
            fn from(v: $t) -> Self {
                ValueInput::Generic(Value::from(v))
            }
        })*
    };
}

numeric_input!(i32, i64, u32, u64);

// ---------------------------------------------------------------------------
// Protocol -> generic
// ---------------------------------------------------------------------------

/// Application-facing form of a protocol variable.
///
/// Octet strings and opaque values that are not valid UTF-8 become arrays of
/// byte numbers so that they convert back losslessly.
pub fn to_generic(variable: &Variable) -> Value {
    match variable {
        Variable::Integer32(v) => Value::from(*v),
        Variable::Counter32(v) | Variable::Gauge32(v) | Variable::TimeTicks(v) => Value::from(*v),
        Variable::Counter64(v) => Value::from(*v),
        Variable::OctetString(bytes) | Variable::Opaque(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        },
        Variable::Null => Value::Null,
        Variable::ObjectIdentifier(id) => Value::String(id.to_string()),
        Variable::IpAddress(ip) => Value::String(ip.to_string()),
    }
}

/// Zero value of a syntax in protocol form.
pub fn default_variable(syntax: Syntax) -> Variable {
    match syntax {
        Syntax::Integer32 => Variable::Integer32(0),
        Syntax::OctetString => Variable::OctetString(Vec::new()),
        Syntax::Null => Variable::Null,
        Syntax::ObjectIdentifier => Variable::ObjectIdentifier(ObjectId::from_arcs(&[])),
        Syntax::IpAddress => Variable::IpAddress(Ipv4Addr::UNSPECIFIED),
        Syntax::Counter32 => Variable::Counter32(0),
        Syntax::Gauge32 => Variable::Gauge32(0),
        Syntax::TimeTicks => Variable::TimeTicks(0),
        Syntax::Opaque => Variable::Opaque(Vec::new()),
        Syntax::Counter64 => Variable::Counter64(0),
    }
}

/// Zero value of a syntax in generic form: `0`, `""`, `"0.0.0.0"` or `null`.
pub fn default_generic(syntax: Syntax) -> Value {
    to_generic(&default_variable(syntax))
}

// ---------------------------------------------------------------------------
// Generic -> protocol
// ---------------------------------------------------------------------------

/// Convert `input` to a variable of `syntax`.
///
/// Typed input is returned unchanged; the caller asserts its syntax. A
/// generic `null` yields the syntax's zero value.
pub fn to_variable(input: impl Into<ValueInput>, syntax: Syntax) -> Result<Variable, ConversionError> {
    let value = match input.into() {
        ValueInput::Typed(v) => return Ok(v),
        ValueInput::Generic(v) => v,
    };
    if value.is_null() {
        return Ok(default_variable(syntax));
    }
    match syntax {
        Syntax::Integer32 => Ok(Variable::Integer32(parse_integer(&value, syntax)?)),
        Syntax::Counter32 => Ok(Variable::Counter32(parse_integer(&value, syntax)?)),
        Syntax::Gauge32 => Ok(Variable::Gauge32(parse_integer(&value, syntax)?)),
        Syntax::TimeTicks => Ok(Variable::TimeTicks(parse_integer(&value, syntax)?)),
        Syntax::Counter64 => Ok(Variable::Counter64(parse_integer(&value, syntax)?)),
        Syntax::OctetString => Ok(Variable::OctetString(parse_octets(&value))),
        Syntax::Opaque => Ok(Variable::Opaque(parse_octets(&value))),
        Syntax::ObjectIdentifier => Ok(Variable::ObjectIdentifier(parse_oid(&value)?)),
        Syntax::IpAddress => {
            let text = value
                .as_str()
                .ok_or_else(|| ConversionError::new(syntax, value.to_string(), "expected dotted address text"))?;
            let ip = text
                .trim()
                .parse::<Ipv4Addr>()
                .map_err(|e| ConversionError::new(syntax, text, e.to_string()))?;
            Ok(Variable::IpAddress(ip))
        }
        Syntax::Null => Err(ConversionError::new(syntax, value.to_string(), "Null takes no value")),
    }
}

/// Range-checked integer from a JSON number or its decimal text.
fn parse_integer<T>(value: &Value, syntax: Syntax) -> Result<T, ConversionError>
where
    T: TryFrom<i128>,
{
    let wide: i128 = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i128::from(i)
            } else if let Some(u) = n.as_u64() {
                i128::from(u)
            } else {
                return Err(ConversionError::new(syntax, n.to_string(), "not an integer"));
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| ConversionError::new(syntax, s.as_str(), e.to_string()))?,
        other => {
            return Err(ConversionError::new(syntax, other.to_string(), "expected a number"));
        }
    };
    T::try_from(wide).map_err(|_| ConversionError::new(syntax, wide.to_string(), "out of range"))
}

/// Octets from a string, an array of byte numbers, or the value's text.
fn parse_octets(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            bytes.unwrap_or_else(|| value.to_string().into_bytes())
        }
        other => other.to_string().into_bytes(),
    }
}

fn parse_oid(value: &Value) -> Result<ObjectId, ConversionError> {
    let syntax = Syntax::ObjectIdentifier;
    match value {
        Value::String(s) => {
            ObjectId::parse(s).map_err(|e| ConversionError::new(syntax, s.as_str(), e.reason))
        }
        Value::Array(items) => {
            let mut arcs = Vec::with_capacity(items.len());
            for item in items {
                let arc = item
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ConversionError::new(syntax, value.to_string(), "arcs must be u32"))?;
                arcs.push(arc);
            }
            Ok(ObjectId::from_arcs(&arcs))
        }
        other => Err(ConversionError::new(syntax, other.to_string(), "expected dotted text or arc array")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
