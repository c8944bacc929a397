use crate::{Model, Record};
use serde::{Serialize, Serializer};
use std::{
    fmt::{self, Debug},
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

/// A [`Record`] known to belong to the model `M`.
///
/// Dereferences to the record, so attribute access and persistence (`save`, `delete`,
/// `set_fields`, ...) are called directly on the entity.
pub struct Entity<M> {
    record: Record,
    model: PhantomData<fn() -> M>,
}

impl<M: Model> Entity<M> {
    pub(crate) fn wrap(record: Record) -> Self {
        Self {
            record,
            model: PhantomData,
        }
    }
    pub fn record(&self) -> &Record {
        &self.record
    }
    pub fn into_record(self) -> Record {
        self.record
    }
}

impl<M> Deref for Entity<M> {
    type Target = Record;
    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl<M> DerefMut for Entity<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}

impl<M> Clone for Entity<M> {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone(),
            model: PhantomData,
        }
    }
}

impl<M> Debug for Entity<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("model", &self.record.model().name)
            .field("fields", &self.record.get_fields())
            .finish()
    }
}

impl<M> Serialize for Entity<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl<M> From<Entity<M>> for Record {
    fn from(value: Entity<M>) -> Self {
        value.record
    }
}
