//! Transformer and converter traits.
//!
//! A `Transform` is anything that turns one payload into another. A `Converter`
//! is a transform that declares enough about itself (source types, return type,
//! priority weighting) to become an edge of the transformation graph and take
//! part in automatic resolution. The [`Transformer`] sum type carries either kind
//! so the registry can tell them apart with a pattern match.

use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::data_type::DataType;
use crate::error::{TransformerError, TransformerResult};

/// An owned, type-erased value flowing through transformers.
pub type Payload = Box<dyn Any + Send>;

/// Weighting given to converters that do not declare one.
pub const DEFAULT_PRIORITY_WEIGHTING: i32 = 1;

/// Highest weighting a single converter may declare; builders clamp to it.
pub const MAX_PRIORITY_WEIGHTING: i32 = 10;

/// Base trait for all transformers.
///
/// # Example
///
/// ```rust
/// use std::any::Any;
/// use transform_registry::{DataType, Payload, Transform, TransformerResult};
///
/// #[derive(Debug)]
/// struct Upper;
///
/// impl Transform for Upper {
///     fn name(&self) -> String {
///         "upper".to_string()
///     }
///
///     fn source_data_types(&self) -> Vec<DataType> {
///         vec![DataType::STRING]
///     }
///
///     fn return_data_type(&self) -> DataType {
///         DataType::STRING
///     }
///
///     fn transform(&self, payload: Payload, _encoding: Option<&str>) -> TransformerResult<Payload> {
///         match payload.downcast::<String>() {
///             Ok(s) => Ok(Box::new(s.to_uppercase())),
///             Err(other) => Ok(other),
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Transform: Send + Sync + Debug {
    /// Returns the name of this transformer.
    fn name(&self) -> String;

    /// Renames the transformer. Refused while it is registered.
    fn set_name(&self, name: &str) -> TransformerResult<()> {
        let _ = name;
        Err(TransformerError::UnsupportedOperation {
            transformer: self.name(),
            operation: "set_name",
        })
    }

    /// The data types accepted as input, in declaration order.
    fn source_data_types(&self) -> Vec<DataType>;

    /// The data type produced.
    fn return_data_type(&self) -> DataType;

    /// Changes the declared return type. Refused while it is registered.
    fn set_return_data_type(&self, data_type: DataType) -> TransformerResult<()> {
        let _ = data_type;
        Err(TransformerError::UnsupportedOperation {
            transformer: self.name(),
            operation: "set_return_data_type",
        })
    }

    /// Whether a value of `data_type` is accepted as input.
    fn is_source_data_type_supported(&self, data_type: &DataType) -> bool {
        self.source_data_types()
            .iter()
            .any(|source| source.is_compatible_with(data_type))
    }

    /// Whether an absent value may be handed to this transformer.
    fn is_accept_null(&self) -> bool {
        false
    }

    /// Whether unsupported input is passed through unchanged instead of failing.
    fn is_ignore_bad_input(&self) -> bool {
        false
    }

    /// Prepares the transformer for use.
    fn initialise(&self) -> TransformerResult<()> {
        Ok(())
    }

    /// Releases resources held by the transformer.
    fn dispose(&self) -> TransformerResult<()> {
        Ok(())
    }

    /// Told when the transformer joins or leaves a registry roster.
    ///
    /// The registry indexes transformers by name and return type, so those must
    /// stay fixed between `Added` and `Removed`.
    fn registry_change(&self, action: RegistryAction) {
        let _ = action;
    }

    /// Transforms `payload`, optionally told which character encoding it uses.
    fn transform(&self, payload: Payload, encoding: Option<&str>) -> TransformerResult<Payload>;

    /// Downcast to concrete type for advanced usage.
    fn as_any(&self) -> &dyn Any;
}

/// A transformer that can take part in automatic resolution.
pub trait Converter: Transform {
    /// Preference score among converters of equal chain length (higher = preferred).
    fn priority_weighting(&self) -> i32 {
        DEFAULT_PRIORITY_WEIGHTING
    }

    /// Number of single converters this converter is made of.
    fn chain_length(&self) -> usize {
        1
    }
}

/// Extension trait for transformer type checking.
pub trait TransformExt: Transform {
    /// Check if this transformer is of type T.
    fn is<T: Transform + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to type T.
    fn downcast_ref<T: Transform + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl<T: Transform + ?Sized> TransformExt for T {}

/// Whether two handles point at the same converter instance.
///
/// Converters are compared by identity everywhere in the graph: two converters
/// with identical declarations are still distinct edges.
pub fn same_converter(a: &Arc<dyn Converter>, b: &Arc<dyn Converter>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Notification kind sent to resolvers and transformers when the roster changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryAction {
    /// A converter was registered
    Added,
    /// A converter was unregistered
    Removed,
}

/// A registered transformer: either a plain transform or a converter.
#[derive(Debug, Clone)]
pub enum Transformer {
    /// A transform that does not take part in resolution
    Simple(Arc<dyn Transform>),
    /// A converter, usable as a graph edge
    Converter(Arc<dyn Converter>),
}

impl Transformer {
    /// Wrap a plain transform.
    pub fn simple(transform: impl Transform + 'static) -> Self {
        Self::Simple(Arc::new(transform))
    }

    /// Wrap a converter.
    pub fn converter(converter: impl Converter + 'static) -> Self {
        Self::Converter(Arc::new(converter))
    }

    /// Returns the converter, if this is one.
    pub fn as_converter(&self) -> Option<&Arc<dyn Converter>> {
        match self {
            Self::Converter(converter) => Some(converter),
            Self::Simple(_) => None,
        }
    }

    /// Whether this is a converter.
    pub fn is_converter(&self) -> bool {
        matches!(self, Self::Converter(_))
    }

    /// Whether both handles point at the same instance.
    pub fn same_instance(&self, other: &Transformer) -> bool {
        match (self, other) {
            (Self::Converter(a), Self::Converter(b)) => same_converter(a, b),
            (Self::Simple(a), Self::Simple(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }

    /// The transformer name.
    pub fn name(&self) -> String {
        match self {
            Self::Simple(t) => t.name(),
            Self::Converter(c) => c.name(),
        }
    }

    /// The declared source data types.
    pub fn source_data_types(&self) -> Vec<DataType> {
        match self {
            Self::Simple(t) => t.source_data_types(),
            Self::Converter(c) => c.source_data_types(),
        }
    }

    /// The declared return data type.
    pub fn return_data_type(&self) -> DataType {
        match self {
            Self::Simple(t) => t.return_data_type(),
            Self::Converter(c) => c.return_data_type(),
        }
    }

    /// Whether a value of `data_type` is accepted as input.
    pub fn is_source_data_type_supported(&self, data_type: &DataType) -> bool {
        match self {
            Self::Simple(t) => t.is_source_data_type_supported(data_type),
            Self::Converter(c) => c.is_source_data_type_supported(data_type),
        }
    }

    /// Prepares the transformer for use.
    pub fn initialise(&self) -> TransformerResult<()> {
        match self {
            Self::Simple(t) => t.initialise(),
            Self::Converter(c) => c.initialise(),
        }
    }

    /// Releases resources held by the transformer.
    pub fn dispose(&self) -> TransformerResult<()> {
        match self {
            Self::Simple(t) => t.dispose(),
            Self::Converter(c) => c.dispose(),
        }
    }

    /// Tells the transformer it joined or left a roster.
    pub fn registry_change(&self, action: RegistryAction) {
        match self {
            Self::Simple(t) => t.registry_change(action),
            Self::Converter(c) => c.registry_change(action),
        }
    }

    /// Transforms `payload`.
    pub fn transform(&self, payload: Payload, encoding: Option<&str>) -> TransformerResult<Payload> {
        match self {
            Self::Simple(t) => t.transform(payload, encoding),
            Self::Converter(c) => c.transform(payload, encoding),
        }
    }
}

impl PartialEq for Transformer {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl From<Arc<dyn Converter>> for Transformer {
    fn from(converter: Arc<dyn Converter>) -> Self {
        Self::Converter(converter)
    }
}

impl From<Arc<dyn Transform>> for Transformer {
    fn from(transform: Arc<dyn Transform>) -> Self {
        Self::Simple(transform)
    }
}

type TransformFn = dyn Fn(Payload, Option<&str>) -> TransformerResult<Payload> + Send + Sync;

/// A converter backed by a closure.
///
/// # Example
///
/// ```rust
/// use transform_registry::{Converter, DataType, FnConverter, Transform};
///
/// let length = FnConverter::builder("stringToLength")
///     .from(DataType::STRING)
///     .to(DataType::NUMBER)
///     .weighting(3)
///     .build_typed(|s: String, _| Ok::<_, String>(s.len()));
///
/// let out = length.transform(Box::new("abcd".to_string()), None).unwrap();
/// assert_eq!(*out.downcast::<usize>().unwrap(), 4);
/// assert_eq!(length.priority_weighting(), 3);
/// ```
pub struct FnConverter {
    name: RwLock<String>,
    source_types: Vec<DataType>,
    return_type: RwLock<DataType>,
    priority_weighting: i32,
    accept_null: bool,
    ignore_bad_input: bool,
    registered: AtomicBool,
    func: Box<TransformFn>,
}

impl FnConverter {
    /// Start building a converter with the given name.
    pub fn builder(name: impl Into<String>) -> FnConverterBuilder {
        FnConverterBuilder::new(name)
    }

    fn ensure_unregistered(&self, operation: &'static str) -> TransformerResult<()> {
        if self.registered.load(Ordering::Acquire) {
            return Err(TransformerError::UnsupportedOperation {
                transformer: self.name(),
                operation,
            });
        }
        Ok(())
    }
}

impl Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("name", &self.name())
            .field("source_types", &self.source_types)
            .field("return_type", &self.return_data_type())
            .field("priority_weighting", &self.priority_weighting)
            .finish_non_exhaustive()
    }
}

impl Transform for FnConverter {
    fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_name(&self, name: &str) -> TransformerResult<()> {
        self.ensure_unregistered("set_name")?;
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name.to_string();
        Ok(())
    }

    fn source_data_types(&self) -> Vec<DataType> {
        self.source_types.clone()
    }

    fn return_data_type(&self) -> DataType {
        self.return_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_return_data_type(&self, data_type: DataType) -> TransformerResult<()> {
        self.ensure_unregistered("set_return_data_type")?;
        *self.return_type.write().unwrap_or_else(PoisonError::into_inner) = data_type;
        Ok(())
    }

    fn is_accept_null(&self) -> bool {
        self.accept_null
    }

    fn is_ignore_bad_input(&self) -> bool {
        self.ignore_bad_input
    }

    fn registry_change(&self, action: RegistryAction) {
        self.registered
            .store(action == RegistryAction::Added, Ordering::Release);
    }

    fn transform(&self, payload: Payload, encoding: Option<&str>) -> TransformerResult<Payload> {
        (self.func)(payload, encoding)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Converter for FnConverter {
    fn priority_weighting(&self) -> i32 {
        self.priority_weighting
    }
}

/// Builder for [`FnConverter`].
#[derive(Debug, Clone)]
pub struct FnConverterBuilder {
    name: String,
    source_types: Vec<DataType>,
    return_type: DataType,
    priority_weighting: i32,
    accept_null: bool,
    ignore_bad_input: bool,
}

impl FnConverterBuilder {
    /// Create a builder. Without `from`, the converter accepts [`DataType::OBJECT`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_types: Vec::new(),
            return_type: DataType::OBJECT,
            priority_weighting: DEFAULT_PRIORITY_WEIGHTING,
            accept_null: false,
            ignore_bad_input: false,
        }
    }

    /// Add an accepted source type.
    pub fn from(mut self, data_type: DataType) -> Self {
        self.source_types.push(data_type);
        self
    }

    /// Set the return type.
    pub fn to(mut self, data_type: DataType) -> Self {
        self.return_type = data_type;
        self
    }

    /// Set the priority weighting, capped at [`MAX_PRIORITY_WEIGHTING`].
    pub fn weighting(mut self, weighting: i32) -> Self {
        self.priority_weighting = weighting.min(MAX_PRIORITY_WEIGHTING);
        self
    }

    /// Accept absent values.
    pub fn accept_null(mut self, accept_null: bool) -> Self {
        self.accept_null = accept_null;
        self
    }

    /// Pass unsupported payloads through unchanged.
    pub fn ignore_bad_input(mut self, ignore_bad_input: bool) -> Self {
        self.ignore_bad_input = ignore_bad_input;
        self
    }

    /// Build with a raw payload function.
    pub fn build<F>(self, func: F) -> FnConverter
    where
        F: Fn(Payload, Option<&str>) -> TransformerResult<Payload> + Send + Sync + 'static,
    {
        let source_types = if self.source_types.is_empty() {
            vec![DataType::OBJECT]
        } else {
            self.source_types
        };
        FnConverter {
            name: RwLock::new(self.name),
            source_types,
            return_type: RwLock::new(self.return_type),
            priority_weighting: self.priority_weighting,
            accept_null: self.accept_null,
            ignore_bad_input: self.ignore_bad_input,
            registered: AtomicBool::new(false),
            func: Box::new(func),
        }
    }

    /// Build a converter that hands its payload back untouched.
    pub fn build_identity(self) -> FnConverter {
        self.build(|payload, _| Ok(payload))
    }

    /// Build with a typed function.
    ///
    /// A payload that is not an `I` fails with [`TransformerError::UnsupportedPayload`],
    /// or is returned unchanged when `ignore_bad_input` is set.
    pub fn build_typed<I, O, E, F>(self, func: F) -> FnConverter
    where
        I: Any + Send,
        O: Any + Send,
        E: ToString,
        F: Fn(I, Option<&str>) -> Result<O, E> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        let expected = self
            .source_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        let ignore_bad_input = self.ignore_bad_input;
        self.build(move |payload, encoding| match payload.downcast::<I>() {
            Ok(input) => func(*input, encoding)
                .map(|output| Box::new(output) as Payload)
                .map_err(|e| TransformerError::TransformFailed {
                    transformer: name.clone(),
                    message: e.to_string(),
                }),
            Err(original) if ignore_bad_input => Ok(original),
            Err(_) => Err(TransformerError::UnsupportedPayload {
                transformer: name.clone(),
                expected: expected.clone(),
            }),
        })
    }
}
