use std::collections::{HashMap, VecDeque};
use tabula::{
    Gateway, GenericSqlWriter, Query, RowLabeled, RowsAffected, Value,
    stream::{self, Stream},
};

/// Gateway that records every statement and answers with scripted results.
///
/// Fetches pop the next entry of `rows` (no rows once exhausted), executes report
/// `rows_affected` and `last_id`. Columns are served from `tables`.
#[derive(Default)]
pub struct MockGateway {
    pub prefix: String,
    pub tables: HashMap<String, Vec<String>>,
    pub rows: VecDeque<Vec<RowLabeled>>,
    pub rows_affected: u64,
    pub last_id: Option<i64>,
    pub queries: Vec<Query>,
    pub introspections: usize,
}

impl MockGateway {
    /// Each test uses its own prefix, schemas are memoized per process.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.into(),
            rows_affected: 1,
            ..Default::default()
        }
    }
    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.tables.insert(
            format!("{}{}", self.prefix, table),
            columns.iter().map(|&v| v.to_owned()).collect(),
        );
        self
    }
    pub fn script(&mut self, rows: Vec<RowLabeled>) -> &mut Self {
        self.rows.push_back(rows);
        self
    }
    pub fn sql(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.sql.as_str()).collect()
    }
}

pub fn row(cells: &[(&str, Value)]) -> RowLabeled {
    RowLabeled::new(
        cells.iter().map(|(k, _)| k.to_string()).collect(),
        cells.iter().map(|(_, v)| v.clone()).collect(),
    )
}

impl Gateway for MockGateway {
    type SqlWriter = GenericSqlWriter;

    fn sql_writer(&self) -> GenericSqlWriter {
        GenericSqlWriter::new()
    }

    fn table_prefix(&self) -> &str {
        &self.prefix
    }

    async fn execute(&mut self, query: Query) -> anyhow::Result<RowsAffected> {
        self.queries.push(query);
        Ok(RowsAffected {
            rows_affected: self.rows_affected,
            last_affected_id: self.last_id,
        })
    }

    fn fetch(&mut self, query: Query) -> impl Stream<Item = anyhow::Result<RowLabeled>> + Send {
        self.queries.push(query);
        let rows = self.rows.pop_front().unwrap_or_default();
        stream::iter(rows.into_iter().map(Ok))
    }

    async fn columns_of(&mut self, table: &str) -> anyhow::Result<Vec<String>> {
        self.introspections += 1;
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}
