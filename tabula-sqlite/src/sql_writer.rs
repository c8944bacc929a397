use tabula_core::SqlWriter;

/// SQLite dialect: inserts replace the row with the same key instead of an `ON CONFLICT` clause.
#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_insert_keyword(&self, out: &mut String) {
        out.push_str("INSERT OR REPLACE INTO ");
    }

    fn write_insert_update_fragment(&self, _out: &mut String, _primary_key: &str, _columns: &[&str]) {
        // Handled by `INSERT OR REPLACE`
    }
}
