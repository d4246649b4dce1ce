//! Chains of converters that behave as a single converter.

use std::any::Any;
use std::sync::Arc;

use tracing::warn;

use crate::data_type::DataType;
use crate::error::{TransformerError, TransformerResult};
use crate::transformer::{same_converter, Converter, Payload, Transform};

/// An ordered chain of converters acting as one.
///
/// The output of each converter feeds the next. Input-side properties (accepted
/// source types, null and bad-input handling) come from the first link, the
/// return type from the last, and the priority weighting is the sum of all links.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use transform_registry::{CompositeConverter, Converter, DataType, FnConverter, Transform};
///
/// let trim: Arc<dyn Converter> = Arc::new(
///     FnConverter::builder("trim")
///         .from(DataType::STRING)
///         .to(DataType::STRING)
///         .build_typed(|s: String, _| Ok::<_, String>(s.trim().to_string())),
/// );
/// let length: Arc<dyn Converter> = Arc::new(
///     FnConverter::builder("length")
///         .from(DataType::STRING)
///         .to(DataType::NUMBER)
///         .build_typed(|s: String, _| Ok::<_, String>(s.len())),
/// );
///
/// let chain = CompositeConverter::new(vec![trim, length]).unwrap();
/// let out = chain.transform(Box::new("  abc ".to_string()), None).unwrap();
/// assert_eq!(*out.downcast::<usize>().unwrap(), 3);
/// assert_eq!(chain.name(), "trimlength");
/// ```
#[derive(Debug, Clone)]
pub struct CompositeConverter {
    name: String,
    chain: Vec<Arc<dyn Converter>>,
}

impl CompositeConverter {
    /// Build a composite from a non-empty chain.
    pub fn new(chain: Vec<Arc<dyn Converter>>) -> TransformerResult<Self> {
        if chain.is_empty() {
            return Err(TransformerError::EmptyChain);
        }
        let name = chain.iter().map(|c| c.name()).collect::<String>();
        Ok(Self { name, chain })
    }

    /// The converters in execution order.
    pub fn chain(&self) -> &[Arc<dyn Converter>] {
        &self.chain
    }

    fn first(&self) -> Option<&Arc<dyn Converter>> {
        self.chain.first()
    }

    fn last(&self) -> Option<&Arc<dyn Converter>> {
        self.chain.last()
    }
}

impl PartialEq for CompositeConverter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.chain.len() == other.chain.len()
            && self
                .chain
                .iter()
                .zip(&other.chain)
                .all(|(a, b)| same_converter(a, b))
    }
}

impl Eq for CompositeConverter {}

impl Transform for CompositeConverter {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn set_name(&self, _name: &str) -> TransformerResult<()> {
        Err(TransformerError::UnsupportedOperation {
            transformer: self.name.clone(),
            operation: "set_name",
        })
    }

    fn source_data_types(&self) -> Vec<DataType> {
        self.first()
            .map(|c| c.source_data_types())
            .unwrap_or_default()
    }

    fn return_data_type(&self) -> DataType {
        self.last()
            .map(|c| c.return_data_type())
            .unwrap_or(DataType::OBJECT)
    }

    fn set_return_data_type(&self, data_type: DataType) -> TransformerResult<()> {
        match self.last() {
            Some(last) => last.set_return_data_type(data_type),
            None => Err(TransformerError::EmptyChain),
        }
    }

    fn is_source_data_type_supported(&self, data_type: &DataType) -> bool {
        self.first()
            .is_some_and(|c| c.is_source_data_type_supported(data_type))
    }

    fn is_accept_null(&self) -> bool {
        self.first().is_some_and(|c| c.is_accept_null())
    }

    fn is_ignore_bad_input(&self) -> bool {
        self.first().is_some_and(|c| c.is_ignore_bad_input())
    }

    /// Initialises every link, reporting the first failure.
    fn initialise(&self) -> TransformerResult<()> {
        let mut first_error = None;
        for converter in &self.chain {
            if let Err(e) = converter.initialise() {
                warn!(composite = %self.name, converter = %converter.name(), error = %e, "Failed to initialise chain link");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Disposes every link in chain order, reporting the first failure.
    fn dispose(&self) -> TransformerResult<()> {
        let mut first_error = None;
        for converter in &self.chain {
            if let Err(e) = converter.dispose() {
                warn!(composite = %self.name, converter = %converter.name(), error = %e, "Failed to dispose chain link");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn transform(&self, payload: Payload, encoding: Option<&str>) -> TransformerResult<Payload> {
        let mut current = payload;
        let mut current_encoding = encoding.map(str::to_string);
        for converter in &self.chain {
            current = converter.transform(current, current_encoding.as_deref())?;
            if let Some(charset) = converter.return_data_type().charset() {
                current_encoding = Some(charset.to_string());
            }
        }
        Ok(current)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Converter for CompositeConverter {
    fn priority_weighting(&self) -> i32 {
        self.chain.iter().map(|c| c.priority_weighting()).sum()
    }

    fn chain_length(&self) -> usize {
        self.chain.iter().map(|c| c.chain_length()).sum()
    }
}
