//! Path enumeration over the transformation graph.

use std::collections::HashSet;
use std::sync::Arc;

use crate::composite::CompositeConverter;
use crate::data_type::DataType;
use crate::graph::TransformationGraph;
use crate::transformer::Converter;

/// Finds every converter, direct or chained, from one vertex to another.
///
/// Each simple path (no vertex visited twice) becomes one candidate: the edge's
/// own converter for a single hop, a [`CompositeConverter`] otherwise. Nothing
/// is filtered here; ranking candidates is left to the caller.
#[derive(Debug, Clone, Copy)]
pub struct TransformationGraphLookupStrategy<'g> {
    graph: &'g TransformationGraph,
    max_chain_length: Option<usize>,
}

impl<'g> TransformationGraphLookupStrategy<'g> {
    /// Create a strategy over `graph` with no bound on chain length.
    pub fn new(graph: &'g TransformationGraph) -> Self {
        Self {
            graph,
            max_chain_length: None,
        }
    }

    /// Stop exploring paths longer than `max_chain_length` hops.
    pub fn with_max_chain_length(mut self, max_chain_length: Option<usize>) -> Self {
        self.max_chain_length = max_chain_length;
        self
    }

    /// Every converter able to turn `source` into `result`.
    ///
    /// Returns an empty list when either type is not a vertex.
    pub fn lookup_converters(&self, source: &DataType, result: &DataType) -> Vec<Arc<dyn Converter>> {
        if !self.graph.contains_vertex(source) || !self.graph.contains_vertex(result) {
            return Vec::new();
        }

        let mut paths = Vec::new();
        self.find_paths(
            source,
            result,
            &mut HashSet::new(),
            &mut Vec::new(),
            &mut paths,
        );

        paths.into_iter().filter_map(into_converter).collect()
    }

    fn find_paths<'a>(
        &'a self,
        current: &'a DataType,
        target: &DataType,
        visited: &mut HashSet<&'a DataType>,
        path: &mut Vec<&'a Arc<dyn Converter>>,
        paths: &mut Vec<Vec<Arc<dyn Converter>>>,
    ) {
        if self.max_chain_length.is_some_and(|max| path.len() >= max) {
            return;
        }

        visited.insert(current);
        for (edge, next) in self.graph.outgoing_edges(current) {
            if next == target {
                path.push(edge.converter());
                paths.push(path.iter().map(|c| Arc::clone(c)).collect());
                path.pop();
            } else if !visited.contains(next) {
                path.push(edge.converter());
                self.find_paths(next, target, visited, path, paths);
                path.pop();
            }
        }
        visited.remove(current);
    }
}

fn into_converter(mut path: Vec<Arc<dyn Converter>>) -> Option<Arc<dyn Converter>> {
    if path.len() == 1 {
        return path.pop();
    }
    CompositeConverter::new(path)
        .ok()
        .map(|composite| Arc::new(composite) as Arc<dyn Converter>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::{same_converter, FnConverter, TransformExt};

    fn xml() -> DataType {
        DataType::new("xml")
    }

    fn json() -> DataType {
        DataType::new("json")
    }

    fn converter(name: &str, from: DataType, to: DataType) -> Arc<dyn Converter> {
        Arc::new(FnConverter::builder(name).from(from).to(to).build_identity())
    }

    fn graph_of(converters: &[&Arc<dyn Converter>]) -> TransformationGraph {
        let mut graph = TransformationGraph::new();
        for converter in converters {
            graph.add_converter(converter);
        }
        graph
    }

    fn has_chain(found: &[Arc<dyn Converter>], expected: &[&Arc<dyn Converter>]) -> bool {
        found.iter().any(|candidate| {
            match candidate.downcast_ref::<CompositeConverter>() {
                Some(composite) => {
                    composite.chain().len() == expected.len()
                        && composite
                            .chain()
                            .iter()
                            .zip(expected)
                            .all(|(a, b)| same_converter(a, b))
                }
                None => expected.len() == 1 && same_converter(candidate, expected[0]),
            }
        })
    }

    #[test]
    fn test_no_source_in_graph() {
        let stream_to_xml = converter("streamToXml", DataType::INPUT_STREAM, xml());
        let graph = graph_of(&[&stream_to_xml]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&json(), &DataType::INPUT_STREAM);
        assert!(found.is_empty());
    }

    #[test]
    fn test_no_target_in_graph() {
        let stream_to_xml = converter("streamToXml", DataType::INPUT_STREAM, xml());
        let graph = graph_of(&[&stream_to_xml]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &json());
        assert!(found.is_empty());
    }

    #[test]
    fn test_finds_direct_transformation() {
        let stream_to_xml = converter("streamToXml", DataType::INPUT_STREAM, xml());
        let graph = graph_of(&[&stream_to_xml]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &xml());
        assert_eq!(found.len(), 1);
        assert!(same_converter(&found[0], &stream_to_xml));
    }

    #[test]
    fn test_finds_multiple_direct_transformations() {
        let stream_to_xml = converter("streamToXml", DataType::INPUT_STREAM, xml());
        let better_stream_to_xml = converter("betterStreamToXml", DataType::INPUT_STREAM, xml());
        let graph = graph_of(&[&stream_to_xml, &better_stream_to_xml]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &xml());
        assert_eq!(found.len(), 2);
        assert!(has_chain(&found, &[&stream_to_xml]));
        assert!(has_chain(&found, &[&better_stream_to_xml]));
    }

    #[test]
    fn test_finds_composite_converter() {
        let stream_to_string = converter("inputStreamToString", DataType::INPUT_STREAM, DataType::STRING);
        let string_to_json = converter("stringToJson", DataType::STRING, json());
        let graph = graph_of(&[&stream_to_string, &string_to_json]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &json());

        assert_eq!(found.len(), 1);
        let composite = found[0].downcast_ref::<CompositeConverter>().unwrap();
        assert_eq!(composite.chain().len(), 2);
        assert!(same_converter(&composite.chain()[0], &stream_to_string));
        assert!(same_converter(&composite.chain()[1], &string_to_json));
    }

    #[test]
    fn test_finds_every_simple_path() {
        // A = input stream, B = string, C = json, D = xml
        let a_to_b = converter("inputStreamToString", DataType::INPUT_STREAM, DataType::STRING);
        let a_to_c = converter("inputStreamToJson", DataType::INPUT_STREAM, json());
        let c_to_d = converter("jsonToXml", json(), xml());
        let c_to_b = converter("jsonToString", json(), DataType::STRING);
        let b_to_d = converter("stringToXml", DataType::STRING, xml());
        let b_to_c = converter("stringToJson", DataType::STRING, json());
        let graph = graph_of(&[&a_to_b, &a_to_c, &c_to_d, &c_to_b, &b_to_d, &b_to_c]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &xml());

        assert_eq!(found.len(), 4);
        assert!(has_chain(&found, &[&a_to_b, &b_to_d]));
        assert!(has_chain(&found, &[&a_to_c, &c_to_d]));
        assert!(has_chain(&found, &[&a_to_b, &b_to_c, &c_to_d]));
        assert!(has_chain(&found, &[&a_to_c, &c_to_b, &b_to_d]));
    }

    #[test]
    fn test_mixes_direct_and_composite_paths() {
        // A->B, A->C, C->D, B->D, C->B plus a direct A->D
        let a_to_b = converter("ab", DataType::INPUT_STREAM, DataType::STRING);
        let a_to_c = converter("ac", DataType::INPUT_STREAM, json());
        let c_to_d = converter("cd", json(), xml());
        let b_to_d = converter("bd", DataType::STRING, xml());
        let c_to_b = converter("cb", json(), DataType::STRING);
        let a_to_d = converter("ad", DataType::INPUT_STREAM, xml());
        let graph = graph_of(&[&a_to_b, &a_to_c, &c_to_d, &b_to_d, &c_to_b, &a_to_d]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &xml());

        assert_eq!(found.len(), 4);
        assert!(has_chain(&found, &[&a_to_d]));
        assert!(has_chain(&found, &[&a_to_b, &b_to_d]));
        assert!(has_chain(&found, &[&a_to_c, &c_to_d]));
        assert!(has_chain(&found, &[&a_to_c, &c_to_b, &b_to_d]));
    }

    #[test]
    fn test_terminates_on_cycles() {
        let a_to_b = converter("ab", DataType::INPUT_STREAM, DataType::STRING);
        let b_to_a = converter("ba", DataType::STRING, DataType::INPUT_STREAM);
        let b_to_c = converter("bc", DataType::STRING, json());
        let c_to_b = converter("cb", json(), DataType::STRING);
        let graph = graph_of(&[&a_to_b, &b_to_a, &b_to_c, &c_to_b]);

        let found = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &json());

        assert_eq!(found.len(), 1);
        assert!(has_chain(&found, &[&a_to_b, &b_to_c]));
    }

    #[test]
    fn test_respects_max_chain_length() {
        let a_to_b = converter("ab", DataType::INPUT_STREAM, DataType::STRING);
        let b_to_c = converter("bc", DataType::STRING, json());
        let c_to_d = converter("cd", json(), xml());
        let graph = graph_of(&[&a_to_b, &b_to_c, &c_to_d]);

        let unbounded = TransformationGraphLookupStrategy::new(&graph)
            .lookup_converters(&DataType::INPUT_STREAM, &xml());
        assert_eq!(unbounded.len(), 1);

        let bounded = TransformationGraphLookupStrategy::new(&graph)
            .with_max_chain_length(Some(2))
            .lookup_converters(&DataType::INPUT_STREAM, &xml());
        assert!(bounded.is_empty());
    }
}
