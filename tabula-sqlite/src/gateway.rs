use crate::{
    CBox, SqliteSqlWriter,
    bind::bind_value,
    error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use anyhow::{Context, Error, Result};
use async_stream::try_stream;
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, CString, c_char, c_int, c_void},
    pin::pin,
    ptr,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};
use tabula_core::{
    Gateway, Query, RowLabeled, RowsAffected, SqlWriter, Value,
    stream::{Stream, TryStreamExt},
    truncate_long,
};
use tokio::task::spawn_blocking;

/// [`Gateway`] over a SQLite database.
///
/// ```rust,ignore
/// let mut gateway = SqliteGateway::connect("sqlite://data/app.sqlite?mode=rwc&prefix=app_").await?;
/// ```
pub struct SqliteGateway {
    pub(crate) connection: CBox<*mut sqlite3>,
    prefix: String,
}

impl SqliteGateway {
    pub const PROTOCOL: &'static str = "sqlite";
    pub const MEMORY: &'static str = "sqlite::memory:";

    /// Opens the database described by `url`.
    ///
    /// Accepts `sqlite::memory:` or `sqlite://<path>`, both optionally followed by the query
    /// parameters `mode` (`ro`, `rw` or `rwc`, the default) and `prefix` (prepended to every
    /// table name).
    pub async fn connect(url: impl AsRef<str>) -> Result<SqliteGateway> {
        let url = url.as_ref();
        let context = || format!("While decoding the connection URL: `{}`", url);
        let (location, parameters) = url.split_once('?').unwrap_or((url, ""));
        let path = if location == Self::MEMORY {
            ":memory:".to_string()
        } else if let Some(path) = location.strip_prefix("sqlite://") {
            urlencoding::decode(path).with_context(context)?.into_owned()
        } else {
            let error = Error::msg(format!(
                "Expected the sqlite connection URL to start with `{}://` or to be `{}`",
                Self::PROTOCOL,
                Self::MEMORY
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        };
        let mut flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE;
        let mut prefix = String::new();
        for (key, value) in url::form_urlencoded::parse(parameters.as_bytes()) {
            match key.as_ref() {
                "mode" => {
                    flags = match value.as_ref() {
                        "ro" => SQLITE_OPEN_READONLY,
                        "rw" => SQLITE_OPEN_READWRITE,
                        "rwc" => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                        mode => {
                            let error = Error::msg(format!(
                                "Unknown mode `{}`, expected one of `ro`, `rw`, `rwc`",
                                mode
                            ))
                            .context(context());
                            log::error!("{:#}", error);
                            return Err(error);
                        }
                    }
                }
                "prefix" => prefix = value.into_owned(),
                other => log::warn!("Ignoring the unknown sqlite URL parameter `{}`", other),
            }
        }
        let filename = CString::new(path).with_context(context)?;
        let mut connection = CBox::new(ptr::null_mut::<sqlite3>(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe {
            sqlite3_open_v2(filename.as_ptr(), &mut *connection, flags, ptr::null())
        };
        if rc != SQLITE_OK {
            let message =
                error_message_from_ptr(&unsafe { sqlite3_errmsg(*connection) }).to_string();
            let error = Error::msg(message).context(format!("Could not open `{}`", url));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(Self { connection, prefix })
    }

    /// Runs one or more `;` separated statements without parameters, typically schema setup.
    pub async fn execute_batch(&mut self, sql: impl Into<String>) -> Result<()> {
        let sql = sql.into();
        let connection = AtomicPtr::new(*self.connection);
        let context = format!("While executing the batch:\n{}", truncate_long!(sql));
        spawn_blocking(move || unsafe {
            let connection = connection.load(Ordering::Relaxed);
            let sql = CString::new(sql).with_context(|| context.clone())?;
            let mut message: *mut c_char = ptr::null_mut();
            let rc = sqlite3_exec(connection, sql.as_ptr(), None, ptr::null_mut(), &mut message);
            if rc != SQLITE_OK {
                let error = Error::msg(
                    error_message_from_ptr(&(message as *const c_char)).to_string(),
                )
                .context(context);
                sqlite3_free(message as *mut c_void);
                log::error!("{:#}", error);
                return Err(error);
            }
            Ok(())
        })
        .await?
    }

    async fn prepare(&mut self, query: Query) -> Result<CBox<*mut sqlite3_stmt>> {
        let connection = AtomicPtr::new(*self.connection);
        let context = format!("While preparing the query:\n{}", truncate_long!(query.sql));
        spawn_blocking(move || unsafe {
            let connection = connection.load(Ordering::Relaxed);
            let sql = match CString::new(query.sql.as_bytes()) {
                Ok(sql) => sql,
                Err(e) => {
                    let error = Error::new(e)
                        .context("Could not create a CString from the query String")
                        .context(context);
                    log::error!("{:#}", error);
                    return Err(error);
                }
            };
            let mut statement = CBox::new(ptr::null_mut::<sqlite3_stmt>(), |p| {
                sqlite3_finalize(p);
            });
            let mut tail: *const c_char = ptr::null();
            let rc = sqlite3_prepare_v2(
                connection,
                sql.as_ptr(),
                sql.as_bytes().len() as c_int,
                &mut *statement,
                &mut tail,
            );
            if rc != SQLITE_OK {
                let error =
                    Error::msg(error_message_from_ptr(&sqlite3_errmsg(connection)).to_string())
                        .context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
            if statement.is_null() {
                let error = Error::msg("The query has no statement").context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
            if !tail.is_null() && !CStr::from_ptr(tail).to_string_lossy().trim().is_empty() {
                let error =
                    Error::msg("Cannot prepare more than one statement at a time").context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
            let expected = sqlite3_bind_parameter_count(*statement) as usize;
            if expected != query.params.len() {
                let error = Error::msg(format!(
                    "The query expects {} parameters but {} were provided",
                    expected,
                    query.params.len()
                ))
                .context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
            for (i, value) in query.params.iter().enumerate() {
                bind_value(*statement, i as c_int + 1, value).with_context(|| context.clone())?;
            }
            Ok(statement)
        })
        .await?
    }
}

fn run_prepared(statement: CBox<*mut sqlite3_stmt>) -> impl Stream<Item = Result<RowLabeled>> + Send {
    try_stream! {
        let count = unsafe { sqlite3_column_count(*statement) };
        let labels = (0..count)
            .map(|i| extract_name(*statement, i))
            .collect::<Result<Arc<[_]>>>()?;
        loop {
            let rc = unsafe { sqlite3_step(*statement) };
            match rc {
                SQLITE_BUSY => {
                    tokio::task::yield_now().await;
                    continue;
                }
                SQLITE_DONE => {
                    break;
                }
                SQLITE_ROW => {
                    let values = (0..count)
                        .map(|i| extract_value(*statement, i))
                        .collect::<Result<Box<[_]>>>()?;
                    yield RowLabeled::new(labels.clone(), values);
                }
                _ => {
                    let message = unsafe {
                        error_message_from_ptr(&sqlite3_errmsg(sqlite3_db_handle(*statement)))
                            .to_string()
                    };
                    let error = Error::msg(message);
                    log::error!("{:#}", error);
                    Err::<(), Error>(error)?;
                }
            }
        }
    }
}

impl Gateway for SqliteGateway {
    type SqlWriter = SqliteSqlWriter;

    fn sql_writer(&self) -> SqliteSqlWriter {
        SqliteSqlWriter {}
    }

    fn table_prefix(&self) -> &str {
        &self.prefix
    }

    async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        let statement = self.prepare(query).await?;
        {
            let mut rows = pin!(run_prepared(statement));
            while rows.try_next().await?.is_some() {}
        }
        let (changes, last) = unsafe {
            (
                sqlite3_changes64(*self.connection),
                sqlite3_last_insert_rowid(*self.connection),
            )
        };
        Ok(RowsAffected {
            rows_affected: changes.max(0) as u64,
            last_affected_id: (changes > 0 && last != 0).then_some(last),
        })
    }

    fn fetch(&mut self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send {
        try_stream! {
            let statement = self.prepare(query).await?;
            let mut rows = pin!(run_prepared(statement));
            while let Some(row) = rows.try_next().await? {
                yield row;
            }
        }
    }

    async fn columns_of(&mut self, table: &str) -> Result<Vec<String>> {
        let mut sql = String::from("PRAGMA table_info(");
        self.sql_writer().write_identifier_quoted(&mut sql, table);
        sql.push_str(");");
        let rows = self.fetch(Query::new(sql)).try_collect::<Vec<_>>().await?;
        rows.iter()
            .map(|row| {
                row.get_column("name")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| Error::msg("`PRAGMA table_info` returned a row without name"))
            })
            .collect()
    }
}
