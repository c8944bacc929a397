use crate::{GenericSqlWriter, SqlWriter, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::{self, Display};

/// Ordered mapping from column name to value, interpreted as a conjunction of equalities.
///
/// Used for filtering (`get_where`, `get_all`, `delete_where`), for assignments
/// (`bulk_save`) and by the relationship resolver.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct Conditions(IndexMap<String, Value>);

impl Conditions {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }
    /// Sets `column` to `value`, keeping its position when the column is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(column.into(), value.into());
        self
    }
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
    /// Keeps only the columns in `known_fields`.
    pub fn retain_known(&mut self, known_fields: &[String]) -> &mut Self {
        self.0.retain(|k, _| known_fields.iter().any(|f| f == k));
        self
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Conditions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Conditions {
    fn from(value: [(K, V); N]) -> Self {
        value.into_iter().collect()
    }
}

impl From<IndexMap<String, Value>> for Conditions {
    fn from(value: IndexMap<String, Value>) -> Self {
        Self(value)
    }
}

impl IntoIterator for Conditions {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str(" }")
    }
}

/// SQL predicate together with the values bound to its placeholders.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<Value>,
    /// Number of equalities in the predicate, zero for the tautology.
    pub terms: usize,
}

impl Predicate {
    pub fn is_tautology(&self) -> bool {
        self.terms == 0
    }
}

/// Converts `conditions` into a parameterized predicate using `writer`.
///
/// Columns outside `known_fields` are dropped, an empty result matches every row.
pub fn build_where_clause_with(
    writer: &dyn SqlWriter,
    conditions: &Conditions,
    known_fields: &[String],
) -> Predicate {
    let mut sql = String::with_capacity(64);
    let mut params = Vec::with_capacity(conditions.len());
    let terms = writer.write_where(&mut sql, &mut params, conditions, known_fields);
    Predicate { sql, params, terms }
}

/// [`build_where_clause_with`] for the generic dialect.
pub fn build_where_clause(conditions: &Conditions, known_fields: &[String]) -> Predicate {
    build_where_clause_with(&GenericSqlWriter::new(), conditions, known_fields)
}
