//! Destination resolution.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::schema::Schema;
use docsync_store::Namespace;

/// An optionally set database and collection name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    /// Database name.
    pub database: Option<String>,
    /// Collection name.
    pub collection: Option<String>,
}

impl Destination {
    /// Resolves a namespace.
    ///
    /// Each part is taken from the first of `explicit`, `inherited` and the
    /// schema that sets it; the database finally falls back to the engine
    /// default.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if either part stays unresolved.
    pub fn resolve(
        explicit: &Destination,
        inherited: &Destination,
        schema: &Schema,
        config: &Config,
    ) -> CoreResult<Namespace> {
        let database = explicit
            .database
            .as_deref()
            .or(inherited.database.as_deref())
            .or(schema.database())
            .or(config.default_database.as_deref());
        let collection = explicit
            .collection
            .as_deref()
            .or(inherited.collection.as_deref())
            .or(schema.collection());

        match (database, collection) {
            (Some(database), Some(collection)) => Ok(Namespace::new(database, collection)),
            (None, _) => Err(CoreError::configuration(format!(
                "no database set for '{}'",
                schema.name()
            ))),
            (_, None) => Err(CoreError::configuration(format!(
                "no collection set for '{}'",
                schema.name()
            ))),
        }
    }
}
