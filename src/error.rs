//! Error types for transformer discovery and resolution.

use thiserror::Error;

use crate::data_type::DataType;

/// Root error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Transformer-related errors
    #[error("Transformer error: {0}")]
    Transformer(#[from] TransformerError),

    /// Resolver-related errors
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Registry-related errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Media type parsing errors
    #[error("Media type error: {0}")]
    MediaType(#[from] MediaTypeError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by individual transformers and converter chains.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformerError {
    /// The transformation itself failed
    #[error("Transformer '{transformer}' failed: {message}")]
    TransformFailed {
        /// Name of the failing transformer
        transformer: String,
        /// Description of the failure
        message: String,
    },

    /// The payload handed to the transformer is not of a supported type
    #[error("Transformer '{transformer}' does not accept payload of type {expected}")]
    UnsupportedPayload {
        /// Name of the transformer
        transformer: String,
        /// Data type the transformer expected
        expected: String,
    },

    /// Transformer initialisation failed
    #[error("Transformer '{transformer}' failed to initialise: {message}")]
    InitialisationFailed {
        /// Name of the transformer
        transformer: String,
        /// Description of the failure
        message: String,
    },

    /// Transformer disposal failed
    #[error("Transformer '{transformer}' failed to dispose: {message}")]
    DisposalFailed {
        /// Name of the transformer
        transformer: String,
        /// Description of the failure
        message: String,
    },

    /// A composite converter was built without any converter
    #[error("A composite converter requires at least one converter")]
    EmptyChain,

    /// The operation is not supported by this transformer
    #[error("Unsupported operation on '{transformer}': {operation}")]
    UnsupportedOperation {
        /// Name of the transformer
        transformer: String,
        /// The rejected operation
        operation: &'static str,
    },
}

/// Errors raised while a resolver attempts a resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// More than one equally good converter was found
    #[error("Found {} equally weighted transformers from {source_type} to {result_type}: {}", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        /// Requested source type
        source_type: DataType,
        /// Requested result type
        result_type: DataType,
        /// Names of the competing candidates
        candidates: Vec<String>,
    },

    /// The resolver failed internally
    #[error("Resolver '{resolver}' failed: {message}")]
    Internal {
        /// Name of the resolver
        resolver: String,
        /// Description of the failure
        message: String,
    },
}

/// Errors that can occur in registry operations.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// No resolver could produce a transformer for the pair
    #[error("No transformer found to transform {source_type} into {result_type}")]
    NoTransformerFound {
        /// Requested source type
        source_type: DataType,
        /// Requested (normalized) result type
        result_type: DataType,
    },

    /// A resolver raised an error while resolving
    #[error("Failed to resolve a transformer from {source_type} to {result_type}: {cause}")]
    Resolution {
        /// Requested source type
        source_type: DataType,
        /// Requested (normalized) result type
        result_type: DataType,
        /// The resolver error
        #[source]
        cause: ResolverError,
    },

    /// Registering the transformer failed
    #[error("Failed to register transformer: {0}")]
    Registration(#[from] TransformerError),

    /// Transformer already registered with this name
    #[error("Transformer already registered: {0}")]
    AlreadyRegistered(String),

    /// The registry has been disposed
    #[error("Registry is disposed")]
    Disposed,
}

/// Errors produced when parsing a media type string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeError {
    /// The input was empty
    #[error("Empty media type")]
    Empty,

    /// The `type/subtype` part is malformed
    #[error("Invalid media type '{0}': expected 'type/subtype'")]
    Malformed(String),

    /// A parameter is malformed
    #[error("Invalid media type parameter '{0}'")]
    InvalidParameter(String),
}

/// Result type alias for transformer operations.
pub type TransformerResult<T> = Result<T, TransformerError>;

/// Result type alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for general crate operations.
pub type TransformResult<T> = Result<T, Error>;
