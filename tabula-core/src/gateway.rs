use crate::{
    Error, Query, Result, RowLabeled, RowsAffected, SqlWriter,
    stream::{Stream, TryStreamExt},
    truncate_long,
};
use std::{future::Future, pin::pin};

/// Capability set the data layer needs from a database.
///
/// A gateway executes parameterized statements, returns rows, reports the last inserted id
/// and introspects table columns. Errors are reported as [`anyhow::Error`] and turned into
/// [`Error::DatabaseFailure`] by the caller, together with the statement that failed.
pub trait Gateway: Send {
    type SqlWriter: SqlWriter;

    /// Dialect used to render the statements sent to this gateway.
    fn sql_writer(&self) -> Self::SqlWriter;

    /// Prefix prepended to every logical table name.
    fn table_prefix(&self) -> &str {
        ""
    }

    /// Execute the statement and return the number of rows affected.
    fn execute(
        &mut self,
        query: Query,
    ) -> impl Future<Output = anyhow::Result<RowsAffected>> + Send;

    /// Execute the statement and return the rows.
    fn fetch(&mut self, query: Query) -> impl Stream<Item = anyhow::Result<RowLabeled>> + Send;

    /// Execute the statement and return the first row, if any.
    fn fetch_one(
        &mut self,
        query: Query,
    ) -> impl Future<Output = anyhow::Result<Option<RowLabeled>>> + Send {
        async move {
            let mut stream = pin!(self.fetch(query));
            stream.try_next().await
        }
    }

    /// Column names of `table` in declaration order. The name already carries the prefix.
    fn columns_of(
        &mut self,
        table: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;
}

fn database_failure(error: anyhow::Error, query: &Query) -> Error {
    let error = error.context(format!("While running the query:\n{}", query));
    log::error!("{:#}", error);
    Error::DatabaseFailure(error)
}

pub(crate) async fn execute<G: Gateway>(gateway: &mut G, query: Query) -> Result<RowsAffected> {
    log::debug!("{}", query);
    match gateway.execute(query.clone()).await {
        Ok(v) => Ok(v),
        Err(e) => Err(database_failure(e, &query)),
    }
}

pub(crate) async fn fetch_all<G: Gateway>(
    gateway: &mut G,
    query: Query,
) -> Result<Vec<RowLabeled>> {
    log::debug!("{}", query);
    let result = gateway.fetch(query.clone()).try_collect::<Vec<_>>().await;
    result.map_err(|e| database_failure(e, &query))
}

pub(crate) async fn fetch_one<G: Gateway>(
    gateway: &mut G,
    query: Query,
) -> Result<Option<RowLabeled>> {
    log::debug!("{}", query);
    let result = gateway.fetch_one(query.clone()).await;
    result.map_err(|e| database_failure(e, &query))
}

pub(crate) async fn columns_of<G: Gateway>(gateway: &mut G, table: &str) -> Result<Vec<String>> {
    log::debug!("Introspecting the columns of `{}`", truncate_long!(table));
    gateway.columns_of(table).await.map_err(|e| {
        let error = e.context(format!("While reading the columns of `{}`", table));
        log::error!("{:#}", error);
        Error::DatabaseFailure(error)
    })
}
