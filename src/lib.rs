//! # transform-registry
//!
//! Transformer discovery for message integration runtimes: given a source and a
//! target [`DataType`], find the transformer that converts one into the other,
//! chaining converters through intermediate types when no single one fits.
//!
//! ## Overview
//!
//! - **Converters** are transformers that declare their input and output types
//!   and a priority weighting, so they can be selected automatically.
//! - The **transformation graph** has a vertex per data type and an edge per
//!   converter. Every simple path between two types is a candidate, and paths
//!   longer than one hop are wrapped in a [`CompositeConverter`].
//! - **Filters** keep the shortest candidates, then the best weighted ones.
//! - The **registry** owns the roster, asks its resolvers in rank order and
//!   caches answers until the roster changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use transform_registry::prelude::*;
//!
//! let registry = DefaultTransformersRegistry::builder()
//!     .with(Transformer::converter(
//!         FnConverter::builder("bytesToString")
//!             .from(DataType::BYTES)
//!             .to(DataType::STRING)
//!             .build_typed(|b: Vec<u8>, _| String::from_utf8(b)),
//!     ))
//!     .with(Transformer::converter(
//!         FnConverter::builder("stringToNumber")
//!             .from(DataType::STRING)
//!             .to(DataType::NUMBER)
//!             .build_typed(|s: String, _| s.trim().parse::<f64>()),
//!     ))
//!     .build()
//!     .unwrap();
//! registry.initialise().unwrap();
//!
//! let transformer = registry
//!     .lookup_transformer(&DataType::BYTES, &DataType::NUMBER)
//!     .unwrap();
//! let out = transformer.transform(Box::new(b" 42 ".to_vec()), None).unwrap();
//! assert_eq!(*out.downcast::<f64>().unwrap(), 42.0);
//! ```
//!
//! ## Concurrency
//!
//! Lookups never take a lock. The roster, the graph and the caches are
//! immutable snapshots replaced atomically on every change, so readers on other
//! threads always see one consistent version.

mod composite;
mod config;
mod data_type;
mod error;
mod filter;
mod graph;
mod lookup;
mod registry;
mod resolver;
mod transformer;
pub mod stream;

pub mod prelude;

// Re-export core types
pub use composite::CompositeConverter;
pub use config::{Config, RegistryConfig};
pub use data_type::{DataType, MediaType};
pub use error::{
    Error, MediaTypeError, RegistryError, RegistryResult, ResolverError, ResolverResult,
    TransformResult, TransformerError, TransformerResult,
};
pub use filter::{
    CompositeConverterFilter, ConverterFilter, PriorityWeightingConverterFilter,
    TransformationLengthConverterFilter,
};
pub use graph::{TransformationEdge, TransformationGraph};
pub use lookup::TransformationGraphLookupStrategy;
pub use registry::{DefaultTransformersRegistry, RegistryBuilder, RegistryState};
pub use resolver::{GraphTransformerResolver, ResolverRank, TransformerResolver};
pub use stream::{EventSender, EventStream, RegistryEvent, StreamBuilder};
pub use transformer::{
    same_converter, Converter, FnConverter, FnConverterBuilder, Payload, RegistryAction,
    Transform, TransformExt, Transformer, DEFAULT_PRIORITY_WEIGHTING, MAX_PRIORITY_WEIGHTING,
};
