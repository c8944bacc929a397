//! Active record data layer: models map to table rows, conditions become parameterized
//! queries, declared relationships are loaded eagerly and batches come back as collections.
//!
//! The database is reached through a [`Gateway`], see `tabula-sqlite` for an implementation.
pub use tabula_core::*;
