use crate::{Error, Result, Value, truncate_long};
use rust_decimal::{
    Decimal,
    prelude::FromPrimitive,
};
use std::any;
use time::{Date, PrimitiveDateTime, Time, macros::format_description};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Implementations accept the canonical variant for the type and, where it makes sense,
/// the representations a backend is likely to hand back: SQLite for example returns every
/// integer as `Int64`, booleans as integers and temporal types as text. Integer conversions
/// are range checked.
///
/// ```rust
/// use tabula_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The NULL of the variant this type maps to.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::invalid_argument(format!(
        "Cannot convert {:?} to {}",
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self as _))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let Some(v) = value.as_integer() else {
                    return match &value {
                        Value::Varchar(Some(v)) => v.trim().parse::<$source>().map_err(|e| {
                            Error::invalid_argument(format!(
                                "Cannot parse `{}` as {}: {}",
                                truncate_long!(v),
                                any::type_name::<Self>(),
                                e
                            ))
                        }),
                        _ => Err(mismatch::<Self>(&value)),
                    };
                };
                <$source>::try_from(v).map_err(|_| {
                    Error::invalid_argument(format!(
                        "Value {v} is out of range for {}",
                        any::type_name::<Self>(),
                    ))
                })
            }
        }
    };
}

impl_as_integer!(i8, Value::Int32);
impl_as_integer!(i16, Value::Int32);
impl_as_integer!(i32, Value::Int32);
impl_as_integer!(i64, Value::Int64);
impl_as_integer!(u8, Value::Int32);
impl_as_integer!(u16, Value::Int32);
impl_as_integer!(u32, Value::Int64);
impl_as_integer!(u64, Value::UInt64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            ref v => match v.as_integer() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(mismatch::<Self>(&value)),
            },
        }
    }
}

impl AsValue for f64 {
    fn as_empty_value() -> Value {
        Value::Float64(None)
    }
    fn as_value(self) -> Value {
        Value::Float64(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl AsValue for f32 {
    fn as_empty_value() -> Value {
        Value::Float64(None)
    }
    fn as_value(self) -> Value {
        Value::Float64(Some(self as f64))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        f64::try_from_value(value).map(|v| v as f32)
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Decimal(Some(v)) => Ok(*v),
            Value::Float64(Some(v)) => Decimal::from_f64(*v).ok_or_else(|| mismatch::<Self>(&value)),
            Value::Varchar(Some(v)) => v.trim().parse().map_err(|_| mismatch::<Self>(&value)),
            v => v
                .as_integer()
                .and_then(Decimal::from_i128)
                .ok_or_else(|| mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::invalid_argument(format!("Blob is not valid UTF-8: {e}"))),
            ref v if v.is_null() => Err(mismatch::<Self>(v)),
            v => v.to_text().ok_or_else(|| mismatch::<Self>(&v)),
        }
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => Ok(v.into_bytes().into_boxed_slice()),
            v => Err(mismatch::<Self>(&v)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Box::<[u8]>::try_from_value(value).map(Into::into)
    }
}

macro_rules! impl_as_temporal {
    ($source:ty, $destination:path, $format:expr) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    Value::Varchar(Some(ref v)) => {
                        let format = $format;
                        <$source>::parse(v.trim(), &format).map_err(|e| {
                            Error::invalid_argument(format!(
                                "Cannot parse `{}` as {}: {}",
                                truncate_long!(v),
                                any::type_name::<Self>(),
                                e
                            ))
                        })
                    }
                    v => Err(mismatch::<Self>(&v)),
                }
            }
        }
    };
}

impl_as_temporal!(
    Date,
    Value::Date,
    format_description!("[year]-[month]-[day]")
);
impl_as_temporal!(
    Time,
    Value::Time,
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]")
);
impl_as_temporal!(
    PrimitiveDateTime,
    Value::Timestamp,
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]")
);

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => Uuid::parse_str(v.trim())
                .map_err(|e| Error::invalid_argument(format!("Cannot parse `{v}` as Uuid: {e}"))),
            Value::Blob(Some(ref v)) => Uuid::from_slice(v)
                .map_err(|e| Error::invalid_argument(format!("Cannot read Uuid from blob: {e}"))),
            v => Err(mismatch::<Self>(&v)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}

impl<T: AsValue> AsValue for Box<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        (*self).as_value()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        T::try_from_value(value).map(Box::new)
    }
}
