//! Conversions between raw source values and declared field types.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// A raw value read from one request source.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Header, query or path text; `None` when the key is absent.
    Text(Option<String>),
    /// A member of the JSON body; `None` when the key is absent.
    Json(Option<Value>),
    /// The raw request body.
    Body(Bytes),
}

/// A value produced by one output field, ready for its response channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    Value(Value),
    Body(Bytes),
}

/// A value could not be converted to or from its declared field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    field: Option<&'static str>,
    reason: String,
}

impl BindError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }

    /// Attribute the error to a field, unless it already names one.
    pub fn in_field(mut self, field: &'static str) -> Self {
        self.field.get_or_insert(field);
        self
    }

    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "invalid value for field `{}`: {}", field, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for BindError {}

/// Conversion from a raw source value into an input field's type.
///
/// Absent header, query and JSON values convert to the type's default
/// (`""`, `0`, `false`, `None`).
pub trait FromBound: Sized {
    fn from_bound(bound: Bound) -> Result<Self, BindError>;
}

/// Conversion from an output field's value into its wire form.
pub trait IntoEmit {
    fn into_emit(self) -> Result<Emit, BindError>;
}

/// Take the next positional value and convert it for `field`.
pub fn next_field<T: FromBound>(
    values: &mut impl Iterator<Item = Bound>,
    field: &'static str,
) -> Result<T, BindError> {
    let bound = values
        .next()
        .ok_or_else(|| BindError::new("no value was bound").in_field(field))?;
    T::from_bound(bound).map_err(|err| err.in_field(field))
}

/// Convert one output field, attributing failures to `field`.
pub fn emit_field<T: IntoEmit>(value: T, field: &'static str) -> Result<Emit, BindError> {
    value.into_emit().map_err(|err| err.in_field(field))
}

/// JSON (de)serialization of an arbitrary serde type.
///
/// As an input field it deserializes a JSON member, a header/query text, or
/// the whole body; as an output field it serializes into the JSON object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> FromBound for Json<T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        let parsed = match bound {
            Bound::Text(Some(text)) => serde_json::from_str(&text),
            Bound::Text(None) | Bound::Json(None) => serde_json::from_value(Value::Null),
            Bound::Json(Some(value)) => serde_json::from_value(value),
            Bound::Body(bytes) => serde_json::from_slice(&bytes),
        };
        parsed
            .map(Json)
            .map_err(|err| BindError::new(err.to_string()))
    }
}

impl<T: Serialize> IntoEmit for Json<T> {
    fn into_emit(self) -> Result<Emit, BindError> {
        serde_json::to_value(&self.0)
            .map(Emit::Value)
            .map_err(|err| BindError::new(err.to_string()))
    }
}

impl FromBound for String {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Text(text) => Ok(text.unwrap_or_default()),
            Bound::Json(None | Some(Value::Null)) => Ok(String::new()),
            Bound::Json(Some(Value::String(text))) => Ok(text),
            Bound::Json(Some(_)) => Err(BindError::new("expected a string")),
            Bound::Body(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|_| BindError::new("body is not valid UTF-8")),
        }
    }
}

fn parse_text<T: FromStr>(text: &str, expected: &str) -> Result<T, BindError> {
    text.trim()
        .parse()
        .map_err(|_| BindError::new(format!("expected {}", expected)))
}

fn scalar<T>(bound: Bound, expected: &str) -> Result<T, BindError>
where
    T: FromStr + DeserializeOwned + Default,
{
    match bound {
        Bound::Text(None) | Bound::Json(None | Some(Value::Null)) => Ok(T::default()),
        Bound::Text(Some(text)) => parse_text(&text, expected),
        Bound::Json(Some(value)) => serde_json::from_value(value)
            .map_err(|_| BindError::new(format!("expected {}", expected))),
        Bound::Body(bytes) => {
            let text = std::str::from_utf8(&bytes)
                .map_err(|_| BindError::new("body is not valid UTF-8"))?;
            parse_text(text, expected)
        }
    }
}

macro_rules! scalar_bindings {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromBound for $ty {
                fn from_bound(bound: Bound) -> Result<Self, BindError> {
                    scalar(bound, stringify!($ty))
                }
            }

            impl IntoEmit for $ty {
                fn into_emit(self) -> Result<Emit, BindError> {
                    Ok(Emit::Value(Value::from(self)))
                }
            }
        )*
    };
}

scalar_bindings!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: FromBound> FromBound for Option<T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Text(None) | Bound::Json(None | Some(Value::Null)) => Ok(None),
            bound => T::from_bound(bound).map(Some),
        }
    }
}

impl<T: IntoEmit> IntoEmit for Option<T> {
    fn into_emit(self) -> Result<Emit, BindError> {
        match self {
            Some(value) => value.into_emit(),
            None => Ok(Emit::Value(Value::Null)),
        }
    }
}

impl FromBound for Value {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        Ok(match bound {
            Bound::Text(text) => text.map(Value::String).unwrap_or(Value::Null),
            Bound::Json(value) => value.unwrap_or(Value::Null),
            Bound::Body(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        })
    }
}

impl IntoEmit for Value {
    fn into_emit(self) -> Result<Emit, BindError> {
        Ok(Emit::Value(self))
    }
}

impl FromBound for Bytes {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Body(bytes) => Ok(bytes),
            Bound::Text(text) => Ok(text.map(Bytes::from).unwrap_or_default()),
            Bound::Json(None) => Ok(Bytes::new()),
            Bound::Json(Some(value)) => serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|err| BindError::new(err.to_string())),
        }
    }
}

impl IntoEmit for Bytes {
    fn into_emit(self) -> Result<Emit, BindError> {
        Ok(Emit::Body(self))
    }
}

impl FromBound for Vec<u8> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        Bytes::from_bound(bound).map(|bytes| bytes.to_vec())
    }
}

impl IntoEmit for Vec<u8> {
    fn into_emit(self) -> Result<Emit, BindError> {
        Ok(Emit::Body(Bytes::from(self)))
    }
}

impl IntoEmit for String {
    fn into_emit(self) -> Result<Emit, BindError> {
        Ok(Emit::Value(Value::String(self)))
    }
}

impl IntoEmit for &'static str {
    fn into_emit(self) -> Result<Emit, BindError> {
        Ok(Emit::Value(Value::String(self.to_string())))
    }
}
