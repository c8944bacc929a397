use crate::{Conditions, Value, separated_by};
use std::fmt::Write;

/// Renders the statements issued by the data layer.
///
/// Values are never written into the SQL text: every value is pushed to `params` and a
/// placeholder takes its place. Dialects override the pieces that differ, for example the
/// placeholder syntax or the upsert form.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_table_name(&self, out: &mut String, table: &str) {
        self.write_identifier_quoted(out, table);
    }

    /// Placeholder for the parameter at `index` (from 1).
    fn write_placeholder(&self, out: &mut String, _index: usize) {
        out.push('?');
    }

    fn write_param(&self, out: &mut String, params: &mut Vec<Value>, value: &Value) {
        params.push(value.clone());
        self.write_placeholder(out, params.len());
    }

    /// Predicate that matches every row.
    fn write_tautology(&self, out: &mut String) {
        out.push_str("1 = 1");
    }

    fn write_condition(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        column: &str,
        value: &Value,
    ) {
        self.write_identifier_quoted(out, column);
        if value.is_null() {
            out.push_str(" IS NULL");
        } else {
            out.push_str(" = ");
            self.write_param(out, params, value);
        }
    }

    /// Writes the conjunction of the conditions whose column is in `known_fields`, the others
    /// are dropped. Returns how many conditions were written, zero means a tautology was written.
    fn write_where(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        conditions: &Conditions,
        known_fields: &[String],
    ) -> usize {
        let known = conditions
            .iter()
            .filter(|(column, _)| known_fields.iter().any(|f| f == column))
            .collect::<Vec<_>>();
        if known.is_empty() {
            self.write_tautology(out);
            return 0;
        }
        separated_by(
            out,
            known.iter(),
            |out, (column, value)| self.write_condition(out, params, column, value),
            " AND ",
        );
        known.len()
    }

    fn write_select(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        columns: &[String],
        conditions: &Conditions,
        known_fields: &[String],
        limit: Option<u32>,
    ) {
        out.push_str("SELECT ");
        separated_by(
            out,
            columns,
            |out, col| self.write_identifier_quoted(out, col),
            ", ",
        );
        out.push_str("\nFROM ");
        self.write_table_name(out, table);
        out.push_str("\nWHERE ");
        self.write_where(out, params, conditions, known_fields);
        if let Some(limit) = limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
        out.push(';');
    }

    fn write_insert_keyword(&self, out: &mut String) {
        out.push_str("INSERT INTO ");
    }

    /// Insert a single row. When the primary key is among the columns, the row overwrites
    /// the existing one through [`SqlWriter::write_insert_update_fragment`].
    fn write_insert(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        primary_key: &str,
        values: &[(&str, &Value)],
    ) {
        self.write_insert_keyword(out);
        self.write_table_name(out, table);
        if values.is_empty() {
            out.push_str(" DEFAULT VALUES;");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            values,
            |out, (col, _)| self.write_identifier_quoted(out, col),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(
            out,
            values,
            |out, (_, value)| self.write_param(out, params, value),
            ", ",
        );
        out.push(')');
        if values.iter().any(|(col, _)| *col == primary_key) {
            let columns = values.iter().map(|(col, _)| *col).collect::<Vec<_>>();
            self.write_insert_update_fragment(out, primary_key, &columns);
        }
        out.push(';');
    }

    fn write_insert_update_fragment(&self, out: &mut String, primary_key: &str, columns: &[&str]) {
        out.push_str("\nON CONFLICT (");
        self.write_identifier_quoted(out, primary_key);
        out.push(')');
        let mut columns = columns.iter().filter(|c| **c != primary_key).peekable();
        if columns.peek().is_none() {
            out.push_str(" DO NOTHING");
            return;
        }
        out.push_str(" DO UPDATE SET\n");
        separated_by(
            out,
            columns,
            |out, col| {
                self.write_identifier_quoted(out, col);
                out.push_str(" = EXCLUDED.");
                self.write_identifier_quoted(out, col);
            },
            ",\n",
        );
    }

    fn write_assignments(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        values: &[(&str, &Value)],
    ) {
        separated_by(
            out,
            values,
            |out, (col, value)| {
                self.write_identifier_quoted(out, col);
                out.push_str(" = ");
                self.write_param(out, params, value);
            },
            ", ",
        );
    }

    fn write_update(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        values: &[(&str, &Value)],
        primary_key: &str,
        key: &Value,
    ) {
        out.push_str("UPDATE ");
        self.write_table_name(out, table);
        out.push_str(" SET ");
        self.write_assignments(out, params, values);
        out.push_str("\nWHERE ");
        self.write_condition(out, params, primary_key, key);
        out.push(';');
    }

    /// Same assignments applied to every row whose primary key is in `keys`.
    fn write_bulk_update(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        values: &[(&str, &Value)],
        primary_key: &str,
        keys: &[Value],
    ) {
        out.push_str("UPDATE ");
        self.write_table_name(out, table);
        out.push_str(" SET ");
        self.write_assignments(out, params, values);
        out.push_str("\nWHERE ");
        self.write_identifier_quoted(out, primary_key);
        out.push_str(" IN (");
        separated_by(
            out,
            keys,
            |out, key| self.write_param(out, params, key),
            ", ",
        );
        out.push_str(");");
    }

    fn write_delete(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        conditions: &Conditions,
        known_fields: &[String],
    ) {
        out.push_str("DELETE FROM ");
        self.write_table_name(out, table);
        out.push_str("\nWHERE ");
        self.write_where(out, params, conditions, known_fields);
        out.push(';');
    }
}

/// Dialect with `?` placeholders and `ON CONFLICT ... DO UPDATE` upserts.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
