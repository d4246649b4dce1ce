//! Filters that narrow down candidate converters for one lookup.

use std::fmt::Debug;
use std::sync::Arc;

use crate::data_type::DataType;
use crate::transformer::Converter;

/// Narrows a candidate list for a single `(source, result)` lookup.
pub trait ConverterFilter: Send + Sync + Debug {
    /// Returns the candidates worth keeping.
    fn filter(
        &self,
        converters: Vec<Arc<dyn Converter>>,
        source: &DataType,
        result: &DataType,
    ) -> Vec<Arc<dyn Converter>>;
}

/// Keeps the candidates sharing the highest priority weighting.
///
/// Ties at the maximum are all kept, and the outcome does not depend on the
/// order of the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityWeightingConverterFilter;

impl ConverterFilter for PriorityWeightingConverterFilter {
    fn filter(
        &self,
        converters: Vec<Arc<dyn Converter>>,
        _source: &DataType,
        _result: &DataType,
    ) -> Vec<Arc<dyn Converter>> {
        let Some(best) = converters.iter().map(|c| c.priority_weighting()).max() else {
            return converters;
        };
        converters
            .into_iter()
            .filter(|c| c.priority_weighting() == best)
            .collect()
    }
}

/// Keeps the candidates with the shortest chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformationLengthConverterFilter;

impl ConverterFilter for TransformationLengthConverterFilter {
    fn filter(
        &self,
        converters: Vec<Arc<dyn Converter>>,
        _source: &DataType,
        _result: &DataType,
    ) -> Vec<Arc<dyn Converter>> {
        let Some(shortest) = converters.iter().map(|c| c.chain_length()).min() else {
            return converters;
        };
        converters
            .into_iter()
            .filter(|c| c.chain_length() == shortest)
            .collect()
    }
}

/// Applies several filters in sequence.
#[derive(Debug)]
pub struct CompositeConverterFilter {
    filters: Vec<Box<dyn ConverterFilter>>,
}

impl CompositeConverterFilter {
    /// Chain the given filters, first to last.
    pub fn new(filters: Vec<Box<dyn ConverterFilter>>) -> Self {
        Self { filters }
    }
}

impl Default for CompositeConverterFilter {
    /// Shortest chains first, then the best weighted among them.
    fn default() -> Self {
        Self::new(vec![
            Box::new(TransformationLengthConverterFilter),
            Box::new(PriorityWeightingConverterFilter),
        ])
    }
}

impl ConverterFilter for CompositeConverterFilter {
    fn filter(
        &self,
        converters: Vec<Arc<dyn Converter>>,
        source: &DataType,
        result: &DataType,
    ) -> Vec<Arc<dyn Converter>> {
        self.filters
            .iter()
            .fold(converters, |candidates, filter| {
                filter.filter(candidates, source, result)
            })
    }
}
