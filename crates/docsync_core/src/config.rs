//! Engine configuration.

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct Config {
    /// Database used when neither the entity, its collection nor its schema
    /// names one.
    pub default_database: Option<String>,

    /// Attribute holding an entity's identity, unless the schema overrides it.
    pub identity_attribute: String,

    /// Whether writes run the validation gate when the caller does not say.
    pub validate_by_default: bool,

    /// Maximum number of member updates in flight during a collection sync.
    pub update_concurrency: usize,

    /// Number of events the event feed keeps for polling.
    pub event_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_database: None,
            identity_attribute: "_id".to_string(),
            validate_by_default: true,
            update_concurrency: 16,
            event_history: 1024,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback database.
    #[must_use]
    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }

    /// Sets the identity attribute.
    #[must_use]
    pub fn identity_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.identity_attribute = attribute.into();
        self
    }

    /// Sets whether writes validate by default.
    #[must_use]
    pub const fn validate_by_default(mut self, value: bool) -> Self {
        self.validate_by_default = value;
        self
    }

    /// Sets the collection sync update concurrency. Zero is treated as one.
    #[must_use]
    pub const fn update_concurrency(mut self, value: usize) -> Self {
        self.update_concurrency = value;
        self
    }

    /// Sets how many events the feed keeps.
    #[must_use]
    pub const fn event_history(mut self, value: usize) -> Self {
        self.event_history = value;
        self
    }
}
