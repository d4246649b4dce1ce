//! Pluggable resolution strategies and the graph-backed resolver.
//!
//! A `TransformerResolver` answers "which transformer turns `source` into
//! `result`?". The registry asks its resolvers in rank order and takes the first
//! answer. [`GraphTransformerResolver`] is the general-purpose one: it keeps a
//! transformation graph of every registered converter and assembles chains
//! when no single converter fits.

use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, trace, warn};

use crate::composite::CompositeConverter;
use crate::config::RegistryConfig;
use crate::data_type::DataType;
use crate::error::{ResolverError, ResolverResult};
use crate::filter::{CompositeConverterFilter, ConverterFilter};
use crate::graph::TransformationGraph;
use crate::lookup::TransformationGraphLookupStrategy;
use crate::transformer::{same_converter, Converter, RegistryAction, TransformExt, Transformer};

/// Ordering of resolvers inside a registry. Higher ranks are asked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolverRank(i32);

impl ResolverRank {
    /// Asked after every other resolver.
    pub const FALLBACK: ResolverRank = ResolverRank(i32::MIN);
    /// Rank of resolvers that do not declare one.
    pub const DEFAULT: ResolverRank = ResolverRank(0);

    /// Create a rank from a raw value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl Default for ResolverRank {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A strategy for finding a transformer between two data types.
pub trait TransformerResolver: Send + Sync + Debug {
    /// Returns the resolver name, used in errors and logs.
    fn name(&self) -> &str;

    /// Position among the registry's resolvers.
    fn rank(&self) -> ResolverRank {
        ResolverRank::DEFAULT
    }

    /// Find a transformer from `source` to `result`.
    ///
    /// `Ok(None)` means "no answer here, ask the next resolver"; an error stops
    /// the lookup.
    fn resolve(&self, source: &DataType, result: &DataType) -> ResolverResult<Option<Transformer>>;

    /// Called when a converter is registered or unregistered.
    fn transformer_change(&self, converter: &Arc<dyn Converter>, action: RegistryAction);
}

type ResolutionCache = scc::HashMap<(DataType, DataType), Arc<dyn Converter>>;

/// An immutable graph together with the resolutions computed against it.
struct Snapshot {
    graph: Arc<TransformationGraph>,
    cache: ResolutionCache,
}

impl Snapshot {
    fn new(graph: TransformationGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            cache: ResolutionCache::default(),
        }
    }
}

/// Resolves transformations by searching a graph of registered converters.
///
/// Readers work on an immutable snapshot loaded atomically; every converter
/// change builds a new snapshot and swaps it in, which also drops every cached
/// resolution. Candidates are narrowed to the shortest chains, then to the best
/// weighted. More than one survivor is reported as ambiguous.
pub struct GraphTransformerResolver {
    state: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    filter: Box<dyn ConverterFilter>,
    max_chain_length: Option<usize>,
    cache_enabled: bool,
}

impl GraphTransformerResolver {
    /// Resolver name.
    pub const NAME: &'static str = "graph";

    /// Create a resolver with an empty graph.
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Create a resolver honouring the caching and chain length settings.
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            state: ArcSwap::from_pointee(Snapshot::new(TransformationGraph::new())),
            writer: Mutex::new(()),
            filter: Box::new(CompositeConverterFilter::default()),
            max_chain_length: config.max_chain_length,
            cache_enabled: config.cache_enabled,
        }
    }

    /// Replace the candidate filter.
    pub fn with_filter(mut self, filter: impl ConverterFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// The current graph.
    pub fn graph(&self) -> Arc<TransformationGraph> {
        self.state.load().graph.clone()
    }

    /// Every converter, direct or chained, from `source` to `result`, unfiltered.
    pub fn lookup_converters(&self, source: &DataType, result: &DataType) -> Vec<Arc<dyn Converter>> {
        let snapshot = self.state.load_full();
        self.candidates(&snapshot.graph, source, result)
    }

    fn candidates(
        &self,
        graph: &TransformationGraph,
        source: &DataType,
        result: &DataType,
    ) -> Vec<Arc<dyn Converter>> {
        let strategy =
            TransformationGraphLookupStrategy::new(graph).with_max_chain_length(self.max_chain_length);

        let sources = endpoints(graph, |vertex| vertex.is_compatible_with(source));
        let results = endpoints(graph, |vertex| result.is_compatible_with(vertex));

        let mut candidates: Vec<Arc<dyn Converter>> = Vec::new();
        for from in &sources {
            for to in &results {
                for converter in strategy.lookup_converters(from, to) {
                    if !candidates.iter().any(|c| same_candidate(c, &converter)) {
                        candidates.push(converter);
                    }
                }
            }
        }
        candidates
    }
}

impl Default for GraphTransformerResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for GraphTransformerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.state.load();
        f.debug_struct("GraphTransformerResolver")
            .field("vertices", &snapshot.graph.vertex_count())
            .field("edges", &snapshot.graph.edge_count())
            .field("cached", &snapshot.cache.len())
            .field("filter", &self.filter)
            .field("max_chain_length", &self.max_chain_length)
            .finish()
    }
}

impl TransformerResolver for GraphTransformerResolver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn rank(&self) -> ResolverRank {
        ResolverRank::FALLBACK
    }

    fn resolve(&self, source: &DataType, result: &DataType) -> ResolverResult<Option<Transformer>> {
        let snapshot = self.state.load_full();
        let key = (source.clone(), result.clone());

        if self.cache_enabled {
            if let Some(hit) = snapshot.cache.read_sync(&key, |_, converter| converter.clone()) {
                trace!(%source, %result, converter = %hit.name(), "Graph resolution cache hit");
                return Ok(Some(Transformer::Converter(hit)));
            }
        }

        let candidates = self.candidates(&snapshot.graph, source, result);
        let mut converters = self.filter.filter(candidates, source, result);

        let converter = match converters.len() {
            0 => return Ok(None),
            1 => converters.remove(0),
            _ => {
                let candidates: Vec<String> = converters.iter().map(|c| c.name()).collect();
                warn!(%source, %result, ?candidates, "Ambiguous graph resolution");
                return Err(ResolverError::Ambiguous {
                    source_type: source.clone(),
                    result_type: result.clone(),
                    candidates,
                });
            }
        };

        debug!(%source, %result, converter = %converter.name(), chain_length = converter.chain_length(), "Resolved converter from graph");

        if !self.cache_enabled {
            return Ok(Some(Transformer::Converter(converter)));
        }
        match snapshot.cache.insert_sync(key, converter.clone()) {
            Ok(()) => Ok(Some(Transformer::Converter(converter))),
            Err((key, _)) => {
                let winner = snapshot
                    .cache
                    .read_sync(&key, |_, existing| existing.clone())
                    .unwrap_or(converter);
                Ok(Some(Transformer::Converter(winner)))
            }
        }
    }

    fn transformer_change(&self, converter: &Arc<dyn Converter>, action: RegistryAction) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut graph = TransformationGraph::clone(&self.state.load().graph);
        match action {
            RegistryAction::Added => graph.add_converter(converter),
            RegistryAction::Removed => graph.remove_converter(converter),
        }
        debug!(
            converter = %converter.name(),
            ?action,
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "Transformation graph updated"
        );
        self.state.store(Arc::new(Snapshot::new(graph)));
    }
}

/// Every vertex accepted by `accepts`, the exact one included.
fn endpoints<'g>(
    graph: &'g TransformationGraph,
    accepts: impl Fn(&DataType) -> bool,
) -> Vec<&'g DataType> {
    graph.vertex_set().into_iter().filter(|v| accepts(v)).collect()
}

fn same_candidate(a: &Arc<dyn Converter>, b: &Arc<dyn Converter>) -> bool {
    if same_converter(a, b) {
        return true;
    }
    match (
        a.downcast_ref::<CompositeConverter>(),
        b.downcast_ref::<CompositeConverter>(),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
