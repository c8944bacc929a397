use anyhow::{Error, Result};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    slice,
};
use tabula_core::Value;

/// Value of the column `index` of the current row.
///
/// SQLite only has five storage classes: integers come back as `Int64` (or `Boolean` when the
/// column is declared `BOOL`/`BOOLEAN`), reals as `Float64`, everything textual (dates, uuids,
/// decimals included) as `Varchar`.
pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => {
                let value = sqlite3_column_int64(statement, index);
                if declared_boolean(statement, index) {
                    Value::Boolean(Some(value != 0))
                } else {
                    Value::Int64(Some(value))
                }
            }
            SQLITE_FLOAT => Value::Float64(Some(sqlite3_column_double(statement, index))),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                let bytes = if ptr.is_null() || len == 0 {
                    Box::default()
                } else {
                    slice::from_raw_parts(ptr, len).into()
                };
                Value::Blob(Some(bytes))
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                let bytes = if ptr.is_null() || len == 0 {
                    Vec::new()
                } else {
                    slice::from_raw_parts(ptr, len).to_vec()
                };
                Value::Varchar(Some(String::from_utf8(bytes)?))
            }
            _ => {
                return Err(Error::msg(format!(
                    "Unexpected column type {}",
                    column_type
                )));
            }
        })
    }
}

/// Whether the column is a table column declared as a boolean. Expressions have no declared type.
fn declared_boolean(statement: *mut sqlite3_stmt, index: c_int) -> bool {
    let decltype = unsafe { sqlite3_column_decltype(statement, index) };
    if decltype.is_null() {
        return false;
    }
    let decltype = unsafe { CStr::from_ptr(decltype) };
    decltype
        .to_str()
        .map(|t| matches!(t.trim().to_ascii_uppercase().as_str(), "BOOL" | "BOOLEAN"))
        .unwrap_or(false)
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            return Err(Error::msg(format!("Column {} has no name", index)));
        }
        Ok(CStr::from_ptr(name).to_str()?.into())
    }
}
