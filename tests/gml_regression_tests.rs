#[cfg(test)]
mod gml_regression_tests {
    use std::io::Write;
    use tempfile::NamedTempFile;

    use zoonet::gml_parser::{load, parse_gml, GmlError};
    use zoonet::topology::{build, BuildError, NameMap};

    /// Trimmed copy of a Topology Zoo export, with the usual clutter
    const ZOO_SAMPLE: &str = r#"graph [
  DateObtained "22/10/10"
  GeoLocation "US"
  Network "Sample"
  Creator "Topology Zoo Toolset"
  directed 0
  hierarchic 1
  node [
    id 0
    label "New York"
    Country "United States"
    Longitude -74.00597
    Latitude 40.71427
    graphics [ x 120.0 y 80.0 ]
  ]
  node [
    id 1
    label "Chicago"
    Internal 1
  ]
  node [
    id 2
    label "AT&amp;T Kansas City"
  ]
  node [
    id 3
    label "Denver"
  ]
  edge [
    source 0
    target 1
    LinkLabel "OC-192"
  ]
  edge [
    source 1
    target 2
  ]
  edge [
    source 2
    target 3
  ]
  edge [
    source 1
    target 0
    LinkLabel "backup"
  ]
]
"#;

    fn gml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_zoo_sample_loads() {
        let file = gml_file(ZOO_SAMPLE);
        let graph = load(file.path()).unwrap();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 4);

        let labels: Vec<&str> = graph.vertices().iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, ["New York", "Chicago", "AT&T Kansas City", "Denver"]);
    }

    #[test]
    fn test_zoo_sample_collapses_reverse_duplicate() {
        let file = gml_file(ZOO_SAMPLE);
        let graph = load(file.path()).unwrap();
        let names = NameMap::assign(&graph);
        let topology = build(&graph, &names).unwrap();

        // 3 distinct inter-switch links plus 4 access links
        assert_eq!(topology.link_count(), 7);
        assert_eq!(topology.switch_count(), 4);
        assert_eq!(topology.host_count(), 4);
    }

    #[test]
    fn test_mapping_is_stable_across_loads() {
        let file = gml_file(ZOO_SAMPLE);
        let first = NameMap::assign(&load(file.path()).unwrap());
        let second = NameMap::assign(&load(file.path()).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.index_of("2"), Some(2));
        assert_eq!(first.label(2), Some("AT&T Kansas City"));
    }

    #[test]
    fn test_string_ids() {
        let graph = parse_gml(
            r#"graph [
                node [ id "nyc" label "New York" ]
                node [ id "chi" ]
                edge [ source "nyc" target "chi" ]
            ]"#,
        )
        .unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges[0].source, "nyc");
    }

    #[test]
    fn test_unterminated_graph_is_malformed() {
        let file = gml_file("graph [\n  node [ id 0 label \"A\" ]\n");
        let err = load(file.path()).unwrap_err();
        assert!(!matches!(err, GmlError::EmptyGraph | GmlError::Io(_)));
    }

    #[test]
    fn test_empty_graph() {
        let file = gml_file("graph [ directed 0 ]");
        assert!(matches!(load(file.path()), Err(GmlError::EmptyGraph)));
    }

    #[test]
    fn test_dangling_edge() {
        let file = gml_file("graph [ node [ id 0 ] edge [ source 0 target 7 ] ]");
        assert!(matches!(load(file.path()), Err(GmlError::UnknownNode(n)) if n == "7"));
    }

    #[test]
    fn test_self_loop_is_rejected_by_builder() {
        let file = gml_file("graph [ node [ id 0 ] node [ id 1 ] edge [ source 1 target 1 ] ]");
        let graph = load(file.path()).unwrap();
        let result = build(&graph, &NameMap::assign(&graph));
        assert_eq!(result.unwrap_err(), BuildError::SelfLoop("s1".to_string()));
    }
}
