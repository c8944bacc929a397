use crate::{
    AsValue, Collection, Conditions, Entity, Error, Gateway, Model, ModelDef, Query, Related,
    RelationKind, Result, RowLabeled, Schema, SqlWriter, Value, gateway,
};
use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{ptr, sync::Arc};

static NULL: Value = Value::Null;

/// Outcome of [`Record::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
    /// A row was inserted, carries the new primary key (NULL if the database did not report it).
    Inserted(Value),
    /// The row was updated, carries the number of rows affected.
    Updated(u64),
}

/// Result of a dynamic attribute lookup.
#[derive(Debug, Clone, Copy)]
pub enum Attribute<'a> {
    Field(&'a Value),
    /// A relationship, `None` while it is not resolved.
    Relation(Option<&'a Related>),
}

/// State of one entity, independent from its Rust type.
///
/// Attribute values are stored aligned with the schema fields, a field that was never
/// assigned is "unset" and is neither written nor reported by [`Record::get_fields`].
/// Relationship attachments live next to them, keyed by relationship name.
#[derive(Debug, Clone)]
pub struct Record {
    model: &'static ModelDef,
    schema: Arc<Schema>,
    values: Box<[Option<Value>]>,
    relations: IndexMap<&'static str, Related>,
}

impl Record {
    pub fn new(model: &'static ModelDef, schema: Arc<Schema>) -> Self {
        let values = vec![None; schema.fields().len()].into();
        Self {
            model,
            schema,
            values,
            relations: IndexMap::new(),
        }
    }

    /// Wraps a fetched row, cells whose column is not in the schema are dropped.
    pub fn from_row(model: &'static ModelDef, schema: Arc<Schema>, row: RowLabeled) -> Self {
        let mut record = Self::new(model, schema);
        for (label, value) in row.labels.iter().zip(row.values) {
            if let Some(i) = record.schema.position(label) {
                record.values[i] = Some(value);
            }
        }
        record
    }

    pub fn model(&self) -> &'static ModelDef {
        self.model
    }
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
    pub fn table(&self) -> &str {
        self.schema.table()
    }
    pub fn fields(&self) -> &[String] {
        self.schema.fields()
    }
    pub fn primary_key_name(&self) -> &str {
        self.schema.primary_key_name()
    }

    /// Current primary key value, `None` when unset or NULL.
    pub fn primary_key(&self) -> Option<&Value> {
        self.values[self.schema.primary_key_index()]
            .as_ref()
            .filter(|v| !v.is_null())
    }

    /// Whether the record has a primary key value, which makes [`Record::save`] an update.
    pub fn is_saved(&self) -> bool {
        self.primary_key().is_some()
    }

    fn undefined(&self, name: &str) -> Error {
        let error = Error::UndefinedAttribute {
            model: self.model.name,
            name: name.to_owned(),
        };
        log::error!("{}", error);
        error
    }

    fn field_index(&self, name: &str) -> Result<usize> {
        if let Some(i) = self.schema.position(name) {
            return Ok(i);
        }
        if self.schema.has_relation(name) {
            let error = Error::invalid_argument(format!(
                "`{}.{}` is a relationship, not a field",
                self.model.name, name
            ));
            log::error!("{}", error);
            return Err(error);
        }
        Err(self.undefined(name))
    }

    /// Field lookup or relationship lookup, whatever `name` refers to.
    pub fn attribute(&self, name: &str) -> Result<Attribute<'_>> {
        if let Some(i) = self.schema.position(name) {
            return Ok(Attribute::Field(self.values[i].as_ref().unwrap_or(&NULL)));
        }
        if self.schema.has_relation(name) {
            return Ok(Attribute::Relation(self.relations.get(name)));
        }
        Err(self.undefined(name))
    }

    /// Value of the field `name`, NULL when unset.
    pub fn get(&self, name: &str) -> Result<&Value> {
        let i = self.field_index(name)?;
        Ok(self.values[i].as_ref().unwrap_or(&NULL))
    }

    pub fn get_as<T: AsValue>(&self, name: &str) -> Result<T> {
        T::try_from_value(self.get(name)?.clone())
    }

    pub fn is_set(&self, name: &str) -> Result<bool> {
        let i = self.field_index(name)?;
        Ok(self.values[i].is_some())
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let i = self.field_index(name)?;
        self.values[i] = Some(value.into());
        Ok(self)
    }

    /// Makes the field unset again, it will not be written by the next save.
    pub fn unset(&mut self, name: &str) -> Result<&mut Self> {
        let i = self.field_index(name)?;
        self.values[i] = None;
        Ok(self)
    }

    /// Assigns the entries whose key is a field of the schema, the others are ignored.
    pub fn set_fields<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in values {
            if let Some(i) = self.schema.position(name.as_ref()) {
                self.values[i] = Some(value.into());
            }
        }
        self
    }

    /// Every field currently set, in schema order.
    pub fn get_fields(&self) -> IndexMap<String, Value> {
        self.set_values()
            .map(|(k, v)| (k.to_owned(), v.clone()))
            .collect()
    }

    fn set_values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter())
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    /// Attachment of the relationship `name`, `None` while not resolved.
    pub fn related(&self, name: &str) -> Result<Option<&Related>> {
        if !self.schema.has_relation(name) {
            return Err(self.undefined(name));
        }
        Ok(self.relations.get(name))
    }

    /// Replaces the attachment of the relationship `name`, the kind must match the declaration.
    pub fn set_related(&mut self, name: &str, related: Related) -> Result<&mut Self> {
        let Some(relation) = self.model.relations.iter().find(|r| r.name() == name) else {
            return Err(self.undefined(name));
        };
        if relation.kind != related.kind() {
            let error = Error::invalid_argument(format!(
                "`{}.{}` is declared {:?}, cannot attach {:?}",
                self.model.name,
                name,
                relation.kind,
                related.kind()
            ));
            log::error!("{}", error);
            return Err(error);
        }
        self.relations.insert(relation.name(), related);
        Ok(self)
    }

    pub(crate) fn attach(&mut self, name: &'static str, related: Related) {
        self.relations.insert(name, related);
    }

    /// One-to-one attachment converted to `R`, `None` when absent or not resolved.
    pub fn one<R: Model>(&self, name: &str) -> Result<Option<Entity<R>>> {
        match self.related(name)? {
            None | Some(Related::One(None)) => Ok(None),
            Some(Related::One(Some(record))) => record.clone().downcast::<R>().map(Some).map_err(
                |record| {
                    let error = Error::invalid_argument(format!(
                        "`{}.{}` holds a `{}`, not a `{}`",
                        self.model.name,
                        name,
                        record.model.name,
                        R::def().name
                    ));
                    log::error!("{}", error);
                    error
                },
            ),
            Some(Related::Many(..)) => Err(self.kind_mismatch(name, RelationKind::OneToOne)),
        }
    }

    /// One-to-many attachment converted to `R`, empty when not resolved.
    pub fn many<R: Model>(&self, name: &str) -> Result<Collection<Entity<R>>> {
        match self.related(name)? {
            None => Ok(Collection::new()),
            Some(Related::Many(records)) => records
                .iter()
                .map(|record| {
                    record.clone().downcast::<R>().map_err(|record| {
                        let error = Error::invalid_argument(format!(
                            "`{}.{}` holds `{}` rows, not `{}`",
                            self.model.name,
                            name,
                            record.model.name,
                            R::def().name
                        ));
                        log::error!("{}", error);
                        error
                    })
                })
                .collect(),
            Some(Related::One(..)) => Err(self.kind_mismatch(name, RelationKind::OneToMany)),
        }
    }

    fn kind_mismatch(&self, name: &str, expected: RelationKind) -> Error {
        let error = Error::invalid_argument(format!(
            "`{}.{}` is not a {:?} relationship",
            self.model.name, name, expected
        ));
        log::error!("{}", error);
        error
    }

    pub fn is<M: Model>(&self) -> bool {
        ptr::eq(self.model, M::def())
    }

    /// Typed view of the record, gives the record back if it belongs to another model.
    pub fn downcast<M: Model>(self) -> std::result::Result<Entity<M>, Record> {
        if self.is::<M>() {
            Ok(Entity::wrap(self))
        } else {
            Err(self)
        }
    }

    /// Writes the record.
    ///
    /// With a primary key value the set fields are written with an `UPDATE` of that row,
    /// without one the row is inserted and the generated key is stored in the record.
    pub async fn save<G: Gateway>(&mut self, gateway: &mut G) -> Result<Saved> {
        let Some(key) = self.primary_key().cloned() else {
            return self.write_insert(gateway, false).await;
        };
        let query = {
            let primary_key = self.primary_key_name();
            let values = self
                .set_values()
                .filter(|(k, _)| *k != primary_key)
                .collect::<Vec<_>>();
            if values.is_empty() {
                log::debug!(
                    "Nothing to update in `{}` for {} = {}",
                    self.table(),
                    primary_key,
                    key
                );
                return Ok(Saved::Updated(0));
            }
            let writer = gateway.sql_writer();
            let mut query = Query::default();
            writer.write_update(
                &mut query.sql,
                &mut query.params,
                self.table(),
                &values,
                primary_key,
                &key,
            );
            query
        };
        let result = gateway::execute(gateway, query).await?;
        Ok(Saved::Updated(result.rows_affected))
    }

    /// Inserts the record including its primary key when set, replacing the row with the same key.
    pub async fn insert<G: Gateway>(&mut self, gateway: &mut G) -> Result<Saved> {
        self.write_insert(gateway, true).await
    }

    async fn write_insert<G: Gateway>(
        &mut self,
        gateway: &mut G,
        with_primary_key: bool,
    ) -> Result<Saved> {
        let query = {
            let primary_key = self.primary_key_name();
            let values = self
                .set_values()
                .filter(|(k, v)| *k != primary_key || (with_primary_key && !v.is_null()))
                .collect::<Vec<_>>();
            let writer = gateway.sql_writer();
            let mut query = Query::default();
            writer.write_insert(
                &mut query.sql,
                &mut query.params,
                self.table(),
                primary_key,
                &values,
            );
            query
        };
        let result = gateway::execute(gateway, query).await?;
        if let Some(key) = self.primary_key().filter(|_| with_primary_key) {
            return Ok(Saved::Inserted(key.clone()));
        }
        let Some(id) = result.last_affected_id else {
            log::warn!(
                "The database did not report the primary key of the row inserted in `{}`",
                self.table()
            );
            return Ok(Saved::Inserted(Value::Null));
        };
        let key = Value::Int64(Some(id));
        let i = self.schema.primary_key_index();
        self.values[i] = Some(key.clone());
        Ok(Saved::Inserted(key))
    }

    /// Deletes the row with the primary key of the record, which keeps its values.
    ///
    /// Returns `false` without touching the database when there is no primary key value, and
    /// when no row was removed.
    pub async fn delete<G: Gateway>(&self, gateway: &mut G) -> Result<bool> {
        let Some(key) = self.primary_key() else {
            log::debug!("Unsaved `{}` not deleted", self.model.name);
            return Ok(false);
        };
        let query = {
            let conditions = Conditions::new().with(self.primary_key_name(), key.clone());
            let writer = gateway.sql_writer();
            let mut query = Query::default();
            writer.write_delete(
                &mut query.sql,
                &mut query.params,
                self.table(),
                &conditions,
                self.fields(),
            );
            query
        };
        let result = gateway::execute(gateway, query).await?;
        if result.rows_affected == 0 {
            log::info!(
                "No row of `{}` with {} = {} to delete",
                self.table(),
                self.primary_key_name(),
                key
            );
        }
        Ok(result.rows_affected > 0)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (k, v) in self.set_values() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn select_query<G: Gateway>(
    gateway: &G,
    schema: &Schema,
    conditions: &Conditions,
    limit: Option<u32>,
) -> Query {
    let writer = gateway.sql_writer();
    let mut query = Query::default();
    writer.write_select(
        &mut query.sql,
        &mut query.params,
        schema.table(),
        schema.fields(),
        conditions,
        schema.fields(),
        limit,
    );
    query
}

/// First row of `model` matching `conditions`, relationships left unresolved.
pub(crate) async fn find_first<G: Gateway>(
    gateway: &mut G,
    model: &'static ModelDef,
    schema: &Arc<Schema>,
    conditions: &Conditions,
) -> Result<Option<Record>> {
    let query = select_query(gateway, schema, conditions, Some(1));
    let row = gateway::fetch_one(gateway, query).await?;
    Ok(row.map(|row| Record::from_row(model, schema.clone(), row)))
}

/// Every row of `model` matching `conditions`, relationships left unresolved.
pub(crate) async fn find_all<G: Gateway>(
    gateway: &mut G,
    model: &'static ModelDef,
    schema: &Arc<Schema>,
    conditions: &Conditions,
) -> Result<Collection<Record>> {
    let query = select_query(gateway, schema, conditions, None);
    let rows = gateway::fetch_all(gateway, query).await?;
    Ok(rows
        .into_iter()
        .map(|row| Record::from_row(model, schema.clone(), row))
        .collect())
}
