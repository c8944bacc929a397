use crate::{
    Collection, Conditions, Error, Gateway, ModelDef, Record, Result, Schema,
    record::{find_all, find_first},
    schema,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// A single related row (or none).
    OneToOne,
    /// Every related row, as a collection.
    OneToMany,
}

/// What loading does when a one-to-one relationship finds no related row.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRelated {
    /// The whole load fails with [`Error::NotFound`].
    #[default]
    Fail,
    /// The relationship is left absent.
    Absent,
}

/// Static declaration of an association between a model and a related model.
///
/// The related rows are those whose `foreign_key` column equals the `local_key` field of the
/// loaded entity. Declarations are part of the [`ModelDef`] and are resolved eagerly, one level
/// deep, whenever an entity is loaded through `get`, `get_where` or `get_all`.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub kind: RelationKind,
    pub related: fn() -> &'static ModelDef,
    pub local_key: &'static str,
    pub foreign_key: &'static str,
    /// Attribute name, defaults to the related model name.
    pub name: Option<&'static str>,
    pub missing: MissingRelated,
}

impl Relation {
    pub const fn one_to_one(
        related: fn() -> &'static ModelDef,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            kind: RelationKind::OneToOne,
            related,
            local_key,
            foreign_key,
            name: None,
            missing: MissingRelated::Fail,
        }
    }
    pub const fn one_to_many(
        related: fn() -> &'static ModelDef,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            kind: RelationKind::OneToMany,
            related,
            local_key,
            foreign_key,
            name: None,
            missing: MissingRelated::Fail,
        }
    }
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }
    pub const fn when_missing(mut self, missing: MissingRelated) -> Self {
        self.missing = missing;
        self
    }
    pub fn name(&self) -> &'static str {
        self.name.unwrap_or_else(|| self.related().name)
    }
    pub fn related(&self) -> &'static ModelDef {
        (self.related)()
    }
    fn check_foreign_key(&self, related: &Schema) -> Result<()> {
        if related.has_field(self.foreign_key) {
            Ok(())
        } else {
            let error = Error::UndefinedAttribute {
                model: related.model_name(),
                name: self.foreign_key.to_owned(),
            };
            log::error!("{}", error);
            Err(error)
        }
    }
}

/// Related rows attached to a loaded entity.
///
/// Serializes as the related record's fields, an array of them, or `null` when absent.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Related {
    One(Option<Record>),
    Many(Collection<Record>),
}

impl Related {
    pub fn kind(&self) -> RelationKind {
        match self {
            Related::One(..) => RelationKind::OneToOne,
            Related::Many(..) => RelationKind::OneToMany,
        }
    }
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Related::One(v) => v.as_ref(),
            Related::Many(..) => None,
        }
    }
    pub fn as_many(&self) -> Option<&Collection<Record>> {
        match self {
            Related::Many(v) => Some(v),
            Related::One(..) => None,
        }
    }
}

/// Attaches every relationship declared by the model of `record`.
///
/// Related records are loaded without resolving their own relationships. A NULL local key
/// means there is nothing to relate and no query is issued.
pub async fn resolve_relationships<G: Gateway>(gateway: &mut G, record: &mut Record) -> Result<()> {
    let model = record.model();
    for relation in model.relations {
        let name = relation.name();
        let local = record.get(relation.local_key)?.clone();
        let attached = if local.is_null() {
            log::debug!(
                "`{}.{}` is NULL, relationship `{}` left empty",
                model.name,
                relation.local_key,
                name
            );
            match relation.kind {
                RelationKind::OneToOne => Related::One(None),
                RelationKind::OneToMany => Related::Many(Collection::new()),
            }
        } else {
            let related = relation.related();
            let schema = schema::resolve(gateway, related).await?;
            relation.check_foreign_key(&schema)?;
            let conditions = Conditions::new().with(relation.foreign_key, local);
            match relation.kind {
                RelationKind::OneToOne => {
                    match find_first(gateway, related, &schema, &conditions).await? {
                        Some(v) => Related::One(Some(v)),
                        None if relation.missing == MissingRelated::Absent => Related::One(None),
                        None => {
                            let error = Error::NotFound {
                                table: schema.table().to_owned(),
                                conditions: conditions.to_string(),
                            };
                            log::info!("While resolving `{}.{}`: {}", model.name, name, error);
                            return Err(error);
                        }
                    }
                }
                RelationKind::OneToMany => {
                    Related::Many(find_all(gateway, related, &schema, &conditions).await?)
                }
            }
        };
        record.attach(name, attached);
    }
    Ok(())
}
