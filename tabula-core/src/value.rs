use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Serialize, Serializer};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
};
use time::{Date, PrimitiveDateTime, Time, macros::format_description};
use uuid::Uuid;

/// Dynamically typed value carried by bound parameters, row cells and entity attributes.
///
/// Every variant wraps an `Option` so that a NULL of a known type can be represented,
/// `Value::Null` is the untyped NULL.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt64(Option<u64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
}

impl PartialEq for Value {
    /// Agrees with [`PartialOrd`]: NULLs of any type are equal, numbers compare by value across
    /// variants (`Int32(30) == Int64(30)`), everything else compares within its variant.
    fn eq(&self, other: &Self) -> bool {
        match (self.is_null(), other.is_null()) {
            (true, true) => return true,
            (true, false) | (false, true) => return false,
            _ => {}
        }
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => match (self.as_integer(), other.as_integer()) {
                (Some(l), Some(r)) => l == r,
                _ => match (self.as_f64(), other.as_f64()) {
                    (Some(l), Some(r)) => l == r,
                    _ => false,
                },
            },
        }
    }
}

impl PartialOrd for Value {
    /// Values of the same variant compare naturally, numbers compare across variants.
    /// NULLs sort first, anything else is unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Some(Ordering::Equal),
            (true, false) => return Some(Ordering::Less),
            (false, true) => return Some(Ordering::Greater),
            _ => {}
        }
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l.partial_cmp(r),
            (Self::Varchar(l), Self::Varchar(r)) => l.partial_cmp(r),
            (Self::Blob(l), Self::Blob(r)) => l.partial_cmp(r),
            (Self::Date(l), Self::Date(r)) => l.partial_cmp(r),
            (Self::Time(l), Self::Time(r)) => l.partial_cmp(r),
            (Self::Timestamp(l), Self::Timestamp(r)) => l.partial_cmp(r),
            (Self::Uuid(l), Self::Uuid(r)) => l.partial_cmp(r),
            (Self::Decimal(l), Self::Decimal(r)) => l.partial_cmp(r),
            _ => match (self.as_integer(), other.as_integer()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
            },
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Boolean(None)
                | Value::Int32(None)
                | Value::Int64(None)
                | Value::UInt64(None)
                | Value::Float64(None)
                | Value::Decimal(None)
                | Value::Varchar(None)
                | Value::Blob(None)
                | Value::Date(None)
                | Value::Time(None)
                | Value::Timestamp(None)
                | Value::Uuid(None)
        )
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Integer content of the value, if it holds one.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Int32(Some(v)) => Some(*v as i128),
            Value::Int64(Some(v)) => Some(*v as i128),
            Value::UInt64(Some(v)) => Some(*v as i128),
            _ => None,
        }
    }

    /// Numeric content of the value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(Some(v)) => Some(*v),
            Value::Decimal(Some(v)) => v.to_f64(),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(Some(v)) => Some(v),
            _ => None,
        }
    }

    /// Converts a JSON document into a value. Arrays and objects are kept as their JSON text.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Boolean(Some(v)),
            serde_json::Value::Number(v) => {
                if let Some(v) = v.as_i64() {
                    Value::Int64(Some(v))
                } else if let Some(v) = v.as_u64() {
                    Value::UInt64(Some(v))
                } else {
                    Value::Float64(v.as_f64())
                }
            }
            serde_json::Value::String(v) => Value::Varchar(Some(v)),
            v @ (serde_json::Value::Array(..) | serde_json::Value::Object(..)) => {
                Value::Varchar(Some(v.to_string()))
            }
        }
    }

    /// Textual form used when a backend stores temporal types as text.
    pub fn to_text(&self) -> Option<String> {
        let date = format_description!("[year]-[month]-[day]");
        let time = format_description!("[hour]:[minute]:[second].[subsecond]");
        let timestamp =
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
        match self {
            Value::Varchar(Some(v)) => Some(v.clone()),
            Value::Date(Some(v)) => v.format(&date).ok(),
            Value::Time(Some(v)) => v.format(&time).ok(),
            Value::Timestamp(Some(v)) => v.format(&timestamp).ok(),
            Value::Uuid(Some(v)) => Some(v.to_string()),
            Value::Decimal(Some(v)) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("NULL");
        }
        match self {
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Int32(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::UInt64(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Decimal(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Blob(Some(v)) => {
                f.write_str("X'")?;
                for b in v.iter() {
                    write!(f, "{:02X}", b)?;
                }
                f.write_str("'")
            }
            _ => write!(f, "'{}'", self.to_text().unwrap_or_default()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Boolean(Some(v)) => serializer.serialize_bool(*v),
            Value::Int32(Some(v)) => serializer.serialize_i32(*v),
            Value::Int64(Some(v)) => serializer.serialize_i64(*v),
            Value::UInt64(Some(v)) => serializer.serialize_u64(*v),
            Value::Float64(Some(v)) => serializer.serialize_f64(*v),
            Value::Blob(Some(v)) => serializer.serialize_bytes(v),
            v if v.is_null() => serializer.serialize_none(),
            v => serializer.serialize_str(&v.to_text().unwrap_or_default()),
        }
    }
}
