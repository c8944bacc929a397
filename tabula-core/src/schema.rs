use crate::{Error, Gateway, ModelDef, Result, gateway};
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

/// Resolved field schema of a model: the table name with its prefix and the ordered set of
/// managed columns.
///
/// Excluded fields are already removed, the primary key is always part of the fields.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    model: &'static str,
    table: String,
    fields: Box<[String]>,
    primary_key: usize,
    relations: Box<[&'static str]>,
}

impl Schema {
    pub fn build(
        model: &'static ModelDef,
        table: String,
        columns: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let mut fields = Vec::<String>::new();
        for column in columns {
            if model.excluded.contains(&column.as_str()) || fields.contains(&column) {
                continue;
            }
            fields.push(column);
        }
        if model.excluded.contains(&model.primary_key) {
            return Err(Error::invalid_argument(format!(
                "The primary key `{}` of `{}` cannot be an excluded field",
                model.primary_key, model.name
            )));
        }
        let primary_key = match fields.iter().position(|f| f == model.primary_key) {
            Some(i) => i,
            None => {
                fields.insert(0, model.primary_key.to_owned());
                0
            }
        };
        let mut relations = Vec::<&'static str>::with_capacity(model.relations.len());
        for relation in model.relations {
            let name = relation.name();
            if fields.iter().any(|f| f == name) || relations.contains(&name) {
                return Err(Error::invalid_argument(format!(
                    "The relationship `{}` of `{}` clashes with another attribute of the same name",
                    name, model.name
                )));
            }
            relations.push(name);
        }
        Ok(Self {
            model: model.name,
            table,
            fields: fields.into(),
            primary_key,
            relations: relations.into(),
        })
    }

    pub fn model_name(&self) -> &'static str {
        self.model
    }
    /// Table name including the gateway prefix.
    pub fn table(&self) -> &str {
        &self.table
    }
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
    pub fn primary_key_name(&self) -> &str {
        &self.fields[self.primary_key]
    }
    pub fn primary_key_index(&self) -> usize {
        self.primary_key
    }
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
    pub fn has_field(&self, field: &str) -> bool {
        self.position(field).is_some()
    }
    pub fn relation_names(&self) -> &[&'static str] {
        &self.relations
    }
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains(&name)
    }
}

/// Model declarations are statics, their address identifies them.
type SchemaKey = (usize, String);

static SCHEMAS: LazyLock<RwLock<HashMap<SchemaKey, Arc<Schema>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn schema_key(model: &'static ModelDef, prefix: &str) -> SchemaKey {
    (model as *const ModelDef as usize, prefix.to_owned())
}

/// Schema of `model` under `prefix` if it was already resolved.
pub fn cached_schema(model: &'static ModelDef, prefix: &str) -> Option<Arc<Schema>> {
    SCHEMAS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&schema_key(model, prefix))
        .cloned()
}

/// Resolves the schema of `model`, introspecting the table through the gateway when the model
/// does not list its fields.
///
/// The result is memoized for the lifetime of the process: later calls for the same model and
/// table prefix never reach the gateway. Two concurrent first resolutions are harmless, the
/// first one stored wins and both are equal.
pub async fn resolve<G: Gateway>(gateway: &mut G, model: &'static ModelDef) -> Result<Arc<Schema>> {
    let prefix = gateway.table_prefix().to_owned();
    if let Some(schema) = cached_schema(model, &prefix) {
        return Ok(schema);
    }
    let table = format!("{}{}", prefix, model.table);
    let columns = match model.fields {
        Some(fields) => fields.iter().map(|&f| f.to_owned()).collect(),
        None => gateway::columns_of(gateway, &table).await?,
    };
    if columns.is_empty() {
        let error = Error::invalid_argument(format!(
            "Table `{}` of `{}` has no columns, does it exist?",
            table, model.name
        ));
        log::error!("{}", error);
        return Err(error);
    }
    let schema = Arc::new(Schema::build(model, table, columns)?);
    log::debug!(
        "Resolved the schema of `{}`: {} {:?}",
        model.name,
        schema.table(),
        schema.fields()
    );
    let mut schemas = SCHEMAS.write().unwrap_or_else(PoisonError::into_inner);
    Ok(schemas
        .entry(schema_key(model, &prefix))
        .or_insert(schema)
        .clone())
}

