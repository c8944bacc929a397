use crate::{Entity, Error, Gateway, Record, Result, Saved, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt::{self, Display},
    ops::{Index, IndexMut},
    slice,
};

/// Ordered sequence of entities or of projected values.
///
/// Transforms consume the collection and return a new one, insertion order is kept by
/// every operation except the sorts, which are stable.
///
/// ```rust
/// use tabula_core::{Collection, IndexMap, Value};
/// let people = [("John", 30), ("Jane", 25), ("Bob", 35)]
///     .into_iter()
///     .map(|(name, score)| {
///         IndexMap::from([
///             ("name".to_string(), Value::from(name)),
///             ("score".to_string(), Value::from(score)),
///         ])
///     })
///     .collect::<Collection<_>>();
/// let total = people.reduce(0, |acc, v| acc + v["score"].as_integer().unwrap_or(0));
/// assert_eq!(total, 90);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Collection<T> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }
    pub fn count(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Collection<U> {
        self.items.into_iter().map(f).collect()
    }
    pub fn filter(self, mut f: impl FnMut(&T) -> bool) -> Self {
        self.items.into_iter().filter(|v| f(v)).collect()
    }
    /// Ascending by the key `f` extracts, ties and incomparable keys keep their order.
    pub fn sort_by<K: PartialOrd>(self, f: impl FnMut(&T) -> K) -> Self {
        self.sorted(f, false)
    }
    /// Descending by the key `f` extracts, ties and incomparable keys keep their order.
    pub fn sort_by_desc<K: PartialOrd>(self, f: impl FnMut(&T) -> K) -> Self {
        self.sorted(f, true)
    }
    /// `f` is called exactly once per element.
    fn sorted<K: PartialOrd>(self, mut f: impl FnMut(&T) -> K, descending: bool) -> Self {
        let mut keyed = self
            .items
            .into_iter()
            .map(|v| (f(&v), v))
            .collect::<Vec<_>>();
        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        keyed.into_iter().map(|(_, v)| v).collect()
    }
    pub fn reduce<A>(&self, initial: A, f: impl FnMut(A, &T) -> A) -> A {
        self.items.iter().fold(initial, f)
    }
}

impl<T: Pluck> Collection<T> {
    /// Value of the field `name` of every element, NULL where an element does not have it.
    pub fn pluck(&self, name: &str) -> Collection<Value> {
        self.items
            .iter()
            .map(|v| v.pluck(name).unwrap_or_default())
            .collect()
    }
}

impl<T: Serialize> Collection<T> {
    /// JSON array with the fields of every element, in order.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            let error = Error::invalid_argument(format!("Cannot serialize the collection: {e}"));
            log::error!("{}", error);
            error
        })
    }
}

impl<T: AsRecord> Collection<T> {
    /// Saves every entity in order, other elements are skipped.
    ///
    /// Not transactional: the first failure stops the loop, entities before it stay saved.
    pub async fn save<G: Gateway>(&mut self, gateway: &mut G) -> Result<Vec<Saved>> {
        let mut result = Vec::with_capacity(self.items.len());
        for item in self.items.iter_mut() {
            if let Some(record) = item.as_record_mut() {
                result.push(record.save(gateway).await?);
            }
        }
        Ok(result)
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Display for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<T> for Collection<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Collection<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

impl<T> Index<usize> for Collection<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for Collection<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.items[index]
    }
}

/// Elements whose fields can be read by name, for [`Collection::pluck`].
pub trait Pluck {
    fn pluck(&self, name: &str) -> Option<Value>;
}

/// Fields pluck their value. Relationships pluck the JSON text of the attached rows, NULL when
/// nothing is attached.
impl Pluck for Record {
    fn pluck(&self, name: &str) -> Option<Value> {
        if self.schema().has_relation(name) {
            return self
                .related(name)
                .ok()
                .flatten()
                .and_then(|v| serde_json::to_value(v).ok())
                .map(Value::from_json);
        }
        if !self.schema().has_field(name) {
            return None;
        }
        self.get(name).ok().cloned()
    }
}

impl<M> Pluck for Entity<M> {
    fn pluck(&self, name: &str) -> Option<Value> {
        (**self).pluck(name)
    }
}

impl Pluck for IndexMap<String, Value> {
    fn pluck(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Pluck for HashMap<String, Value> {
    fn pluck(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Pluck for serde_json::Value {
    fn pluck(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::from_json)
    }
}

/// Elements that may be backed by a database row, for [`Collection::save`].
pub trait AsRecord {
    fn as_record_mut(&mut self) -> Option<&mut Record>;
}

impl AsRecord for Record {
    fn as_record_mut(&mut self) -> Option<&mut Record> {
        Some(self)
    }
}

impl<M> AsRecord for Entity<M> {
    fn as_record_mut(&mut self) -> Option<&mut Record> {
        Some(&mut **self)
    }
}

impl AsRecord for Value {
    fn as_record_mut(&mut self) -> Option<&mut Record> {
        None
    }
}

impl AsRecord for IndexMap<String, Value> {
    fn as_record_mut(&mut self) -> Option<&mut Record> {
        None
    }
}

impl AsRecord for serde_json::Value {
    fn as_record_mut(&mut self) -> Option<&mut Record> {
        None
    }
}
