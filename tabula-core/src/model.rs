use crate::{
    Collection, Conditions, Entity, Error, Gateway, Query, Record, Relation, Result, RowsAffected,
    Schema, SqlWriter, Value, gateway,
    record::{find_all, find_first},
    relations::resolve_relationships,
    schema,
};
use std::{future::Future, sync::Arc};

/// Static description of how a model maps onto its table.
///
/// ```rust
/// use tabula_core::ModelDef;
/// static USER: ModelDef = ModelDef::new("User", "users")
///     .with_fields(&["id", "name", "email", "password"])
///     .excluding(&["password"]);
/// assert_eq!(USER.primary_key, "id");
/// ```
#[derive(Debug)]
pub struct ModelDef {
    /// Model name, used in messages and as the default relationship attribute name.
    pub name: &'static str,
    /// Logical table name, the gateway prefix is prepended when resolving the schema.
    pub table: &'static str,
    /// Explicit field list, when `None` the columns are introspected from the table.
    pub fields: Option<&'static [&'static str]>,
    /// Fields never loaded or written, even if the table has them.
    pub excluded: &'static [&'static str],
    pub primary_key: &'static str,
    pub relations: &'static [Relation],
}

impl ModelDef {
    pub const fn new(name: &'static str, table: &'static str) -> Self {
        Self {
            name,
            table,
            fields: None,
            excluded: &[],
            primary_key: "id",
            relations: &[],
        }
    }
    pub const fn with_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.fields = Some(fields);
        self
    }
    pub const fn excluding(mut self, excluded: &'static [&'static str]) -> Self {
        self.excluded = excluded;
        self
    }
    pub const fn with_primary_key(mut self, primary_key: &'static str) -> Self {
        self.primary_key = primary_key;
        self
    }
    pub const fn with_relations(mut self, relations: &'static [Relation]) -> Self {
        self.relations = relations;
        self
    }
}

/// A type mapped onto a table row.
///
/// Implementors only provide their [`ModelDef`], every operation comes with a default
/// implementation. Loaded rows are returned as [`Entity<Self>`].
///
/// ```rust,ignore
/// struct User;
/// static USER: ModelDef = ModelDef::new("User", "users");
/// impl Model for User {
///     fn def() -> &'static ModelDef {
///         &USER
///     }
/// }
/// let user = User::get(&mut gateway, 1).await?;
/// ```
pub trait Model: Sized + 'static {
    fn def() -> &'static ModelDef;

    /// Resolved schema, memoized per model and table prefix.
    fn schema<G: Gateway>(gateway: &mut G) -> impl Future<Output = Result<Arc<Schema>>> + Send {
        schema::resolve(gateway, Self::def())
    }

    /// New unsaved instance, no attribute is set.
    fn create<G: Gateway>(gateway: &mut G) -> impl Future<Output = Result<Entity<Self>>> + Send {
        async move {
            let schema = Self::schema(gateway).await?;
            Ok(Entity::wrap(Record::new(Self::def(), schema)))
        }
    }

    /// Row with the given primary key, relationships resolved.
    fn get<G: Gateway>(
        gateway: &mut G,
        id: impl Into<Value>,
    ) -> impl Future<Output = Result<Entity<Self>>> + Send {
        let id = id.into();
        async move {
            let schema = Self::schema(gateway).await?;
            let conditions = Conditions::new().with(schema.primary_key_name(), id);
            load_one(gateway, Self::def(), &schema, &conditions)
                .await
                .map(Entity::wrap)
        }
    }

    /// First row matching every condition, relationships resolved.
    ///
    /// The statement has no `ORDER BY`: when several rows match, which one is returned is up
    /// to the database.
    fn get_where<G: Gateway>(
        gateway: &mut G,
        conditions: impl Into<Conditions>,
    ) -> impl Future<Output = Result<Entity<Self>>> + Send {
        let conditions = conditions.into();
        async move {
            if conditions.is_empty() {
                let error = Error::invalid_argument(format!(
                    "`{}::get_where` requires at least one condition",
                    Self::def().name
                ));
                log::error!("{}", error);
                return Err(error);
            }
            let schema = Self::schema(gateway).await?;
            ensure_known(&schema, &conditions, "get_where")?;
            load_one(gateway, Self::def(), &schema, &conditions)
                .await
                .map(Entity::wrap)
        }
    }

    /// Every row matching the conditions (all rows for an empty set), relationships resolved.
    fn get_all<G: Gateway>(
        gateway: &mut G,
        conditions: impl Into<Conditions>,
    ) -> impl Future<Output = Result<Collection<Entity<Self>>>> + Send {
        let conditions = conditions.into();
        async move {
            let schema = Self::schema(gateway).await?;
            let records = find_all(gateway, Self::def(), &schema, &conditions).await?;
            let mut result = Collection::new();
            for mut record in records {
                resolve_relationships(gateway, &mut record).await?;
                result.push(Entity::wrap(record));
            }
            Ok(result)
        }
    }

    /// Deletes the rows matching every condition, returns how many were removed.
    fn delete_where<G: Gateway>(
        gateway: &mut G,
        conditions: impl Into<Conditions>,
    ) -> impl Future<Output = Result<u64>> + Send {
        let conditions = conditions.into();
        async move {
            if conditions.is_empty() {
                let error = Error::invalid_argument(format!(
                    "`{}::delete_where` requires at least one condition",
                    Self::def().name
                ));
                log::error!("{}", error);
                return Err(error);
            }
            let schema = Self::schema(gateway).await?;
            ensure_known(&schema, &conditions, "delete_where")?;
            let query = {
                let writer = gateway.sql_writer();
                let mut query = Query::default();
                writer.write_delete(
                    &mut query.sql,
                    &mut query.params,
                    schema.table(),
                    &conditions,
                    schema.fields(),
                );
                query
            };
            Ok(gateway::execute(gateway, query).await?.rows_affected)
        }
    }

    /// Applies `data` to the rows of every saved member of `entities` with a single statement.
    ///
    /// Only the database is updated, the members keep their in-memory values.
    fn bulk_save<G: Gateway>(
        gateway: &mut G,
        entities: &Collection<Entity<Self>>,
        data: impl Into<Conditions>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let mut data = data.into();
        let keys = entities
            .iter()
            .filter_map(|v| v.primary_key().cloned())
            .collect::<Vec<_>>();
        let empty = entities.is_empty();
        async move {
            let name = Self::def().name;
            if empty {
                let error = Error::invalid_argument(format!(
                    "`{}::bulk_save` called with an empty collection",
                    name
                ));
                log::error!("{}", error);
                return Err(error);
            }
            if keys.is_empty() {
                let error = Error::invalid_argument(format!(
                    "`{}::bulk_save` called with unsaved entities only",
                    name
                ));
                log::error!("{}", error);
                return Err(error);
            }
            let schema = Self::schema(gateway).await?;
            let primary_key = schema.primary_key_name();
            data.retain_known(schema.fields());
            let values = data
                .iter()
                .filter(|(k, _)| *k != primary_key)
                .collect::<Vec<_>>();
            if values.is_empty() {
                let error = Error::invalid_argument(format!(
                    "`{}::bulk_save` has no field of the model to set",
                    name
                ));
                log::error!("{}", error);
                return Err(error);
            }
            let query = {
                let writer = gateway.sql_writer();
                let mut query = Query::default();
                writer.write_bulk_update(
                    &mut query.sql,
                    &mut query.params,
                    schema.table(),
                    &values,
                    primary_key,
                    &keys,
                );
                query
            };
            gateway::execute(gateway, query).await
        }
    }

    /// Runs `query` verbatim and wraps every row, columns outside the schema are dropped.
    /// Relationships are not resolved.
    fn raw_query<G: Gateway>(
        gateway: &mut G,
        query: impl Into<Query>,
    ) -> impl Future<Output = Result<Collection<Entity<Self>>>> + Send {
        let query = query.into();
        async move {
            let schema = Self::schema(gateway).await?;
            let rows = gateway::fetch_all(gateway, query).await?;
            Ok(rows
                .into_iter()
                .map(|row| Entity::wrap(Record::from_row(Self::def(), schema.clone(), row)))
                .collect())
        }
    }
}

/// Rejects a condition set whose columns are all unknown, it would otherwise act on every row.
fn ensure_known(schema: &Schema, conditions: &Conditions, operation: &str) -> Result<()> {
    if conditions.iter().any(|(k, _)| schema.has_field(k)) {
        return Ok(());
    }
    let error = Error::invalid_argument(format!(
        "`{}::{}` has no condition on a field of the model: {}",
        schema.model_name(),
        operation,
        conditions
    ));
    log::error!("{}", error);
    Err(error)
}

async fn load_one<G: Gateway>(
    gateway: &mut G,
    model: &'static ModelDef,
    schema: &Arc<Schema>,
    conditions: &Conditions,
) -> Result<Record> {
    let Some(mut record) = find_first(gateway, model, schema, conditions).await? else {
        let error = Error::NotFound {
            table: schema.table().to_owned(),
            conditions: conditions.to_string(),
        };
        log::debug!("{}", error);
        return Err(error);
    };
    resolve_relationships(gateway, &mut record).await?;
    Ok(record)
}
