//! The transformers registry: roster, resolver orchestration and caching.
//!
//! `DefaultTransformersRegistry` is the single entry point the rest of a runtime
//! uses to find transformers. Lookups are lock-free: the roster and both caches
//! are immutable snapshots swapped with `arc-swap`, and cache population goes
//! through `scc` maps where the first insert for a key wins. Mutations are
//! serialized by the lifecycle lock and replace the caches wholesale, so no
//! cached answer outlives a roster change.

use std::cmp::Reverse;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, trace, warn};

use crate::config::{Config, RegistryConfig};
use crate::data_type::DataType;
use crate::error::{Error, RegistryError, RegistryResult, TransformResult};
use crate::resolver::{GraphTransformerResolver, TransformerResolver};
use crate::stream::{EventBroadcaster, EventStream, RegistryEvent};
use crate::transformer::{RegistryAction, Transformer};

type CacheKey = (DataType, DataType);

/// Lifecycle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryState {
    /// Built; transformers added now are held until `initialise`
    Uninitialised,
    /// Resolvers know about every registered converter
    Initialised,
    /// Shut down; the roster can no longer change
    Disposed,
}

#[derive(Default)]
struct Caches {
    exact: scc::HashMap<CacheKey, Transformer>,
    lists: scc::HashMap<CacheKey, Vec<Transformer>>,
}

/// Registry of transformers with pluggable resolution.
///
/// Resolvers are asked in rank order, highest first. A
/// [`GraphTransformerResolver`] is added when the builder supplies none.
///
/// # Example
///
/// ```rust
/// use transform_registry::{DataType, DefaultTransformersRegistry, FnConverter, Transformer};
///
/// let registry = DefaultTransformersRegistry::builder()
///     .with(Transformer::converter(
///         FnConverter::builder("stringToBytes")
///             .from(DataType::STRING)
///             .to(DataType::BYTES)
///             .build_typed(|s: String, _| Ok::<_, String>(s.into_bytes())),
///     ))
///     .build()
///     .unwrap();
/// registry.initialise().unwrap();
///
/// let transformer = registry
///     .lookup_transformer(&DataType::STRING, &DataType::BYTES)
///     .unwrap();
/// assert_eq!(transformer.name(), "stringToBytes");
/// ```
pub struct DefaultTransformersRegistry {
    config: RegistryConfig,
    transformers: ArcSwap<Vec<Transformer>>,
    resolvers: Vec<Arc<dyn TransformerResolver>>,
    caches: ArcSwap<Caches>,
    state: Mutex<RegistryState>,
    events: EventBroadcaster,
}

impl DefaultTransformersRegistry {
    /// Create an empty registry with the graph resolver and default settings.
    pub fn new() -> Self {
        let config = RegistryConfig::default();
        let graph: Arc<dyn TransformerResolver> =
            Arc::new(GraphTransformerResolver::with_config(&config));
        Self::from_parts(config, Vec::new(), vec![graph])
    }

    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn from_parts(
        config: RegistryConfig,
        transformers: Vec<Transformer>,
        mut resolvers: Vec<Arc<dyn TransformerResolver>>,
    ) -> Self {
        // stable: equal ranks keep their registration order
        resolvers.sort_by_key(|resolver| Reverse(resolver.rank()));
        for transformer in &transformers {
            transformer.registry_change(RegistryAction::Added);
        }
        let events = EventBroadcaster::new(config.event_buffer_size);
        Self {
            config,
            transformers: ArcSwap::from_pointee(transformers),
            resolvers,
            caches: ArcSwap::from_pointee(Caches::default()),
            state: Mutex::new(RegistryState::Uninitialised),
            events,
        }
    }

    /// The registry settings.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The current lifecycle state.
    pub fn state(&self) -> RegistryState {
        *self.lock_state()
    }

    /// The resolvers, in the order they are asked.
    pub fn resolvers(&self) -> &[Arc<dyn TransformerResolver>] {
        &self.resolvers
    }

    /// Initialise every registered transformer and announce the converters to
    /// the resolvers.
    ///
    /// Calling it again once initialised does nothing. If a transformer fails to
    /// initialise, the ones initialised before it are disposed again, the
    /// registry stays uninitialised and no resolver is notified.
    pub fn initialise(&self) -> RegistryResult<()> {
        let mut state = self.lock_state();
        match *state {
            RegistryState::Initialised => return Ok(()),
            RegistryState::Disposed => return Err(RegistryError::Disposed),
            RegistryState::Uninitialised => {}
        }

        let roster = self.transformers.load_full();
        for (position, transformer) in roster.iter().enumerate() {
            if let Err(err) = transformer.initialise() {
                for started in roster[..position].iter().rev() {
                    if let Err(dispose_err) = started.dispose() {
                        warn!(transformer = %started.name(), error = %dispose_err, "Failed to dispose transformer after aborted initialise");
                    }
                }
                return Err(err.into());
            }
        }
        for converter in roster.iter().filter_map(Transformer::as_converter) {
            for resolver in &self.resolvers {
                resolver.transformer_change(converter, RegistryAction::Added);
            }
        }
        self.clear_caches();
        *state = RegistryState::Initialised;

        debug!(
            registry = %self.config.name(),
            transformers = roster.len(),
            resolvers = self.resolvers.len(),
            "Transformers registry initialised"
        );
        self.events.publish(RegistryEvent::Initialised);
        Ok(())
    }

    /// Clear the caches and end every subscription.
    ///
    /// Disposing twice is harmless.
    pub fn dispose(&self) {
        let mut state = self.lock_state();
        if *state == RegistryState::Disposed {
            return;
        }
        *state = RegistryState::Disposed;
        self.clear_caches();

        debug!(registry = %self.config.name(), "Transformers registry disposed");
        self.events.publish(RegistryEvent::Disposed);
        self.events.close();
    }

    /// Add a transformer to the roster.
    ///
    /// Once the registry is initialised the transformer is initialised first and,
    /// if that fails, nothing changes. Converters are then announced to every
    /// resolver. Every registration clears both caches.
    pub fn register_transformer(&self, transformer: Transformer) -> RegistryResult<()> {
        let state = self.lock_state();
        if *state == RegistryState::Disposed {
            return Err(RegistryError::Disposed);
        }

        let name = transformer.name();
        let current = self.transformers.load_full();
        if current.iter().any(|t| t.name() == name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }

        if *state == RegistryState::Initialised {
            transformer.initialise()?;
            if let Some(converter) = transformer.as_converter() {
                for resolver in &self.resolvers {
                    resolver.transformer_change(converter, RegistryAction::Added);
                }
            }
        }

        let converter = transformer.is_converter();
        transformer.registry_change(RegistryAction::Added);
        let mut roster = Vec::clone(&current);
        roster.push(transformer);
        self.transformers.store(Arc::new(roster));
        self.clear_caches();

        debug!(registry = %self.config.name(), transformer = %name, converter, "Registered transformer");
        self.events
            .publish(RegistryEvent::Registered { name, converter });
        Ok(())
    }

    /// Remove the transformer registered under `name`.
    ///
    /// Returns `Ok(None)` when no such transformer exists. Converters are
    /// withdrawn from every resolver; a removed transformer that was initialised
    /// is disposed, and a disposal failure is logged rather than returned.
    pub fn unregister_transformer(&self, name: &str) -> RegistryResult<Option<Transformer>> {
        let state = self.lock_state();
        if *state == RegistryState::Disposed {
            return Err(RegistryError::Disposed);
        }

        let current = self.transformers.load_full();
        let Some(position) = current.iter().position(|t| t.name() == name) else {
            return Ok(None);
        };
        let mut roster = Vec::clone(&current);
        let removed = roster.remove(position);
        self.transformers.store(Arc::new(roster));
        removed.registry_change(RegistryAction::Removed);

        if *state == RegistryState::Initialised {
            if let Some(converter) = removed.as_converter() {
                for resolver in &self.resolvers {
                    resolver.transformer_change(converter, RegistryAction::Removed);
                }
            }
            if let Err(err) = removed.dispose() {
                warn!(transformer = %name, error = %err, "Failed to dispose unregistered transformer");
            }
        }
        self.clear_caches();

        debug!(registry = %self.config.name(), transformer = %name, "Unregistered transformer");
        self.events.publish(RegistryEvent::Unregistered {
            name: name.to_string(),
        });
        Ok(Some(removed))
    }

    /// Every registered transformer, in registration order.
    pub fn transformers(&self) -> Vec<Transformer> {
        Vec::clone(&self.transformers.load())
    }

    /// The transformer registered under `name`.
    pub fn lookup_transformer_by_name(&self, name: &str) -> Option<Transformer> {
        self.transformers
            .load()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// Find the transformer that turns `source` into `result`.
    ///
    /// The media type and charset of `result` are ignored. Resolvers are asked in
    /// order and the first answer wins; a resolver error ends the lookup. The
    /// answer is cached until the next roster change.
    pub fn lookup_transformer(&self, source: &DataType, result: &DataType) -> RegistryResult<Transformer> {
        let result = result.normalized_for_lookup();
        let caches = self.caches.load_full();
        let key = (source.clone(), result.clone());

        if self.config.cache_enabled {
            if let Some(hit) = caches.exact.read_sync(&key, |_, t| t.clone()) {
                trace!(%source, %result, transformer = %hit.name(), "Transformer cache hit");
                return Ok(hit);
            }
        }

        for resolver in &self.resolvers {
            match resolver.resolve(source, &result) {
                Ok(Some(transformer)) => {
                    debug!(
                        %source,
                        %result,
                        resolver = resolver.name(),
                        transformer = %transformer.name(),
                        "Resolved transformer"
                    );
                    if !self.config.cache_enabled {
                        return Ok(transformer);
                    }
                    return Ok(match caches.exact.insert_sync(key, transformer.clone()) {
                        Ok(()) => transformer,
                        Err((key, _)) => caches
                            .exact
                            .read_sync(&key, |_, existing| existing.clone())
                            .unwrap_or(transformer),
                    });
                }
                Ok(None) => continue,
                Err(cause) => {
                    return Err(RegistryError::Resolution {
                        source_type: source.clone(),
                        result_type: result,
                        cause,
                    });
                }
            }
        }

        debug!(%source, %result, "No transformer found");
        Err(RegistryError::NoTransformerFound {
            source_type: source.clone(),
            result_type: result,
        })
    }

    /// Every registered converter able to turn `source` into `result`.
    ///
    /// Only direct converters are considered; plain transformers are skipped.
    /// The media type and charset of `result` are ignored. Never fails: no match
    /// yields an empty list.
    pub fn lookup_transformers(&self, source: &DataType, result: &DataType) -> Vec<Transformer> {
        let result = result.normalized_for_lookup();
        let caches = self.caches.load_full();
        let key = (source.clone(), result.clone());

        if self.config.cache_enabled {
            if let Some(hit) = caches.lists.read_sync(&key, |_, list| list.clone()) {
                trace!(%source, %result, found = hit.len(), "Transformer list cache hit");
                return hit;
            }
        }

        let found: Vec<Transformer> = self
            .transformers
            .load()
            .iter()
            .filter(|t| {
                t.is_converter()
                    && result.is_compatible_with(&t.return_data_type())
                    && t.is_source_data_type_supported(source)
            })
            .cloned()
            .collect();

        if !self.config.cache_enabled {
            return found;
        }
        match caches.lists.insert_sync(key, found.clone()) {
            Ok(()) => found,
            Err((key, _)) => caches
                .lists
                .read_sync(&key, |_, existing| existing.clone())
                .unwrap_or(found),
        }
    }

    /// Subscribe to roster and lifecycle changes.
    ///
    /// The stream ends when the registry is disposed or dropped. Subscribing to a
    /// disposed registry yields a stream that has already ended.
    pub fn subscribe(&self) -> EventStream<RegistryEvent> {
        self.events.subscribe()
    }

    fn clear_caches(&self) {
        self.caches.store(Arc::new(Caches::default()));
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DefaultTransformersRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultTransformersRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.transformers.load().iter().map(Transformer::name).collect();
        f.debug_struct("DefaultTransformersRegistry")
            .field("name", &self.config.name())
            .field("state", &self.state())
            .field("transformers", &names)
            .field("resolvers", &self.resolvers)
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Builder for creating registries with fluent API.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
    transformers: Vec<Transformer>,
    resolvers: Vec<Arc<dyn TransformerResolver>>,
}

impl RegistryBuilder {
    /// Create a new registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given settings.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a transformer to the initial roster.
    pub fn with(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Add a resolver.
    pub fn resolver(mut self, resolver: Arc<dyn TransformerResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Build the registry, uninitialised.
    ///
    /// Fails when the settings are invalid or two transformers share a name.
    pub fn build(self) -> TransformResult<DefaultTransformersRegistry> {
        self.config.validate().map_err(Error::Config)?;

        for (i, transformer) in self.transformers.iter().enumerate() {
            let name = transformer.name();
            if self.transformers[..i].iter().any(|t| t.name() == name) {
                return Err(RegistryError::AlreadyRegistered(name).into());
            }
        }

        let mut resolvers = self.resolvers;
        if resolvers.is_empty() {
            resolvers.push(Arc::new(GraphTransformerResolver::with_config(&self.config)));
        }
        Ok(DefaultTransformersRegistry::from_parts(
            self.config,
            self.transformers,
            resolvers,
        ))
    }
}
