//! Configuration for the transformers registry.

/// Base trait for configuration types.
///
/// # Example
///
/// ```rust
/// use transform_registry::Config;
///
/// #[derive(Debug, Clone)]
/// struct DeploymentConfig {
///     name: String,
///     max_connectors: u32,
/// }
///
/// impl Config for DeploymentConfig {
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     fn validate(&self) -> Result<(), String> {
///         if self.max_connectors == 0 {
///             return Err("max_connectors must be greater than 0".to_string());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Validates the configuration.
    ///
    /// Returns Ok(()) if valid, or an error message describing the issue.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Settings for [`DefaultTransformersRegistry`](crate::DefaultTransformersRegistry)
/// and the graph resolver it usually carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Registry name, used in log output
    pub name: String,
    /// Whether resolutions are cached between lookups
    pub cache_enabled: bool,
    /// Longest converter chain the graph resolver will assemble
    pub max_chain_length: Option<usize>,
    /// Capacity of each subscriber's event channel
    pub event_buffer_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            cache_enabled: true,
            max_chain_length: None,
            event_buffer_size: 100,
        }
    }
}

impl RegistryConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Disable result caching.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Bound the length of assembled converter chains.
    pub fn with_max_chain_length(mut self, max_chain_length: usize) -> Self {
        self.max_chain_length = Some(max_chain_length);
        self
    }

    /// Set the capacity of subscriber channels.
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }
}

impl Config for RegistryConfig {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            "default"
        } else {
            &self.name
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_chain_length == Some(0) {
            return Err("max_chain_length must be greater than 0".to_string());
        }
        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be greater than 0".to_string());
        }
        Ok(())
    }
}
