mod as_value;
mod collection;
mod conditions;
mod entity;
mod error;
mod gateway;
mod model;
mod query;
mod record;
mod relations;
mod schema;
mod sql_writer;
mod util;
mod value;

pub use ::anyhow::Context;
pub use ::indexmap::IndexMap;
pub use as_value::*;
pub use collection::*;
pub use conditions::*;
pub use entity::*;
pub use error::*;
pub use gateway::Gateway;
pub use model::*;
pub use query::*;
pub use record::{Attribute, Record, Saved};
pub use relations::*;
pub use schema::{Schema, cached_schema};
pub use sql_writer::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
