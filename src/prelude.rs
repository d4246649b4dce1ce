//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use transform_registry::prelude::*;
//! ```

// Configuration
pub use crate::config::{Config, RegistryConfig};

// Data types
pub use crate::data_type::{DataType, MediaType};

// Core traits
pub use crate::transformer::{
    Converter, FnConverter, Payload, RegistryAction, Transform, TransformExt, Transformer,
};
pub use crate::resolver::{ResolverRank, TransformerResolver};

// Registry
pub use crate::registry::{DefaultTransformersRegistry, RegistryBuilder, RegistryState};

// Streams
pub use crate::stream::{EventStream, RegistryEvent};

// Errors
pub use crate::error::{
    Error, RegistryError, RegistryResult, ResolverError, ResolverResult, TransformResult,
    TransformerError, TransformerResult,
};
