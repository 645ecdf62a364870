//! GML reader for Internet Topology Zoo files.
//!
//! The parser understands the subset of the Graph Modelling Language used by
//! the Topology Zoo: a single `graph [ ... ]` record holding `node` and `edge`
//! records plus arbitrary key/value attributes. Nested lists (such as
//! `graphics [ ... ]`) are skipped, `#` comments are ignored.
//!
//! [`parse_gml_file`] yields the raw [`GmlGraph`]; [`load`] turns it into the
//! undirected [`Graph`] consumed by the rest of the pipeline.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Errors that can occur while reading or parsing a GML file
#[derive(Debug, thiserror::Error)]
pub enum GmlError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { line: usize, ch: char },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: node has neither an 'id' nor a 'label'")]
    MissingNodeKey { line: usize },

    #[error("line {line}: edge missing required '{field}' attribute")]
    MissingEdgeField { line: usize, field: &'static str },

    #[error("line {line}: more than one 'graph' record")]
    MultipleGraphs { line: usize },

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("edge references non-existent node '{0}'")]
    UnknownNode(String),

    #[error("graph contains no nodes")]
    EmptyGraph,
}

/// Represents a node in a GML graph
#[derive(Debug, Clone, Default)]
pub struct GmlNode {
    pub id: Option<String>,
    pub label: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl GmlNode {
    /// The identifier edges use to reference this node: the `id`, falling
    /// back to the `label` when the file omits ids.
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.label.as_deref())
    }
}

/// Represents an edge in a GML graph
#[derive(Debug, Clone)]
pub struct GmlEdge {
    pub source: String,
    pub target: String,
    pub attributes: HashMap<String, String>,
}

/// Represents a complete GML graph, exactly as written in the file
#[derive(Debug, Clone, Default)]
pub struct GmlGraph {
    pub nodes: Vec<GmlNode>,
    pub edges: Vec<GmlEdge>,
    pub attributes: HashMap<String, String>,
}

impl GmlGraph {
    /// Whether the file declares itself directed. The flag is informational
    /// only, every graph is treated as undirected.
    pub fn is_directed(&self) -> bool {
        self.attributes.get("directed").map_or(false, |v| v.trim() == "1")
    }
}

/// A vertex of the loaded topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    /// Identifier used by edge records
    pub key: String,
    /// Human readable label, arbitrary text
    pub label: String,
}

/// Undirected graph with string-labelled vertices.
///
/// Vertices keep file order. Edges are kept as given, including parallel
/// edges, reverse duplicates and self-loops; deciding what to do with those is
/// up to the topology builder.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<(String, String)>,
}

impl Graph {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Edges as `(source key, target key)` pairs, in file order
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl TryFrom<GmlGraph> for Graph {
    type Error = GmlError;

    fn try_from(gml: GmlGraph) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let mut vertices = Vec::with_capacity(gml.nodes.len());

        for node in gml.nodes {
            // the parser guarantees every node has a key
            let Some(key) = node.key().map(str::to_string) else {
                continue;
            };
            if !seen.insert(key.clone()) {
                return Err(GmlError::DuplicateNode(key));
            }
            let label = node.label.unwrap_or_else(|| key.clone());
            vertices.push(Vertex { key, label });
        }

        let mut edges = Vec::with_capacity(gml.edges.len());
        for edge in gml.edges {
            for end in [&edge.source, &edge.target] {
                if !seen.contains(end) {
                    return Err(GmlError::UnknownNode(end.clone()));
                }
            }
            edges.push((edge.source, edge.target));
        }

        Ok(Graph { vertices, edges })
    }
}

/// Token types for GML parsing
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Number(String),
    String(String),
    LeftBracket,
    RightBracket,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "identifier '{s}'"),
            Token::Number(s) => write!(f, "number {s}"),
            Token::String(s) => write!(f, "string \"{s}\""),
            Token::LeftBracket => f.write_str("'['"),
            Token::RightBracket => f.write_str("']'"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Simple lexer for GML format
struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    current_char: Option<char>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();
        Self {
            input: chars,
            position: 0,
            line: 1,
            current_char,
        }
    }

    fn advance(&mut self) {
        if self.current_char == Some('\n') {
            self.line += 1;
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.current_char {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self) -> Result<String, GmlError> {
        let start_line = self.line;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char {
            if ch == '"' {
                self.advance();
                return Ok(decode_entities(&result));
            }
            result.push(ch);
            self.advance();
        }

        Err(GmlError::UnterminatedString { line: start_line })
    }

    fn read_identifier_or_number(&mut self) -> String {
        let mut result = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '-' || ch == '+' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        result
    }

    fn next_token(&mut self) -> Result<Token, GmlError> {
        loop {
            self.skip_whitespace();

            match self.current_char {
                None => return Ok(Token::Eof),
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some('[') => {
                    self.advance();
                    return Ok(Token::LeftBracket);
                }
                Some(']') => {
                    self.advance();
                    return Ok(Token::RightBracket);
                }
                Some('"') => return self.read_string().map(Token::String),
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    return Ok(Token::Identifier(self.read_identifier_or_number()));
                }
                Some(ch) if ch.is_numeric() || ch == '-' || ch == '+' || ch == '.' => {
                    return Ok(Token::Number(self.read_identifier_or_number()));
                }
                Some(ch) => {
                    return Err(GmlError::UnexpectedChar {
                        line: self.line,
                        ch,
                    })
                }
            }
        }
    }
}

/// Decode the HTML character references Topology Zoo files use in strings.
/// Unknown references are kept verbatim.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parser for GML format
struct Parser {
    lexer: Lexer,
    current_token: Token,
}

impl Parser {
    fn new(mut lexer: Lexer) -> Result<Self, GmlError> {
        let current_token = lexer.next_token()?;
        Ok(Self {
            lexer,
            current_token,
        })
    }

    fn advance(&mut self) -> Result<(), GmlError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &'static str) -> GmlError {
        GmlError::UnexpectedToken {
            line: self.lexer.line,
            expected,
            found: self.current_token.to_string(),
        }
    }

    fn expect_left_bracket(&mut self) -> Result<(), GmlError> {
        match self.current_token {
            Token::LeftBracket => self.advance(),
            _ => Err(self.unexpected("'['")),
        }
    }

    fn expect_right_bracket(&mut self) -> Result<(), GmlError> {
        match self.current_token {
            Token::RightBracket => self.advance(),
            _ => Err(self.unexpected("']'")),
        }
    }

    /// Read the key of a key/value pair inside a record
    fn parse_key(&mut self) -> Result<String, GmlError> {
        match &self.current_token {
            Token::Identifier(key) => {
                let key = key.clone();
                self.advance()?;
                Ok(key)
            }
            _ => Err(self.unexpected("attribute name or ']'")),
        }
    }

    /// Read a scalar value. Returns `None` after skipping a nested list.
    fn parse_value(&mut self) -> Result<Option<String>, GmlError> {
        match &self.current_token {
            Token::Identifier(val) | Token::Number(val) | Token::String(val) => {
                let result = val.clone();
                self.advance()?;
                Ok(Some(result))
            }
            Token::LeftBracket => {
                self.skip_list()?;
                Ok(None)
            }
            _ => Err(self.unexpected("value")),
        }
    }

    fn parse_scalar(&mut self) -> Result<String, GmlError> {
        match &self.current_token {
            Token::LeftBracket => Err(self.unexpected("scalar value")),
            _ => self
                .parse_value()?
                .ok_or_else(|| self.unexpected("scalar value")),
        }
    }

    /// Skip a bracketed list, including any lists nested inside it
    fn skip_list(&mut self) -> Result<(), GmlError> {
        self.expect_left_bracket()?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.current_token {
                Token::LeftBracket => depth += 1,
                Token::RightBracket => depth -= 1,
                Token::Eof => return Err(self.unexpected("']'")),
                _ => {}
            }
            self.advance()?;
        }
        Ok(())
    }

    fn parse_node(&mut self) -> Result<GmlNode, GmlError> {
        self.advance()?; // `node`
        self.expect_left_bracket()?;

        let mut node = GmlNode::default();

        while self.current_token != Token::RightBracket {
            let key = self.parse_key()?;
            match key.as_str() {
                "id" => node.id = Some(self.parse_scalar()?),
                "label" => node.label = Some(self.parse_scalar()?),
                _ => {
                    if let Some(value) = self.parse_value()? {
                        node.attributes.insert(key, value);
                    }
                }
            }
        }

        let line = self.lexer.line;
        self.expect_right_bracket()?;

        if node.key().is_none() {
            return Err(GmlError::MissingNodeKey { line });
        }
        Ok(node)
    }

    fn parse_edge(&mut self) -> Result<GmlEdge, GmlError> {
        self.advance()?; // `edge`
        self.expect_left_bracket()?;

        let mut source = None;
        let mut target = None;
        let mut attributes = HashMap::new();

        while self.current_token != Token::RightBracket {
            let key = self.parse_key()?;
            match key.as_str() {
                "source" => source = Some(self.parse_scalar()?),
                "target" => target = Some(self.parse_scalar()?),
                _ => {
                    if let Some(value) = self.parse_value()? {
                        attributes.insert(key, value);
                    }
                }
            }
        }

        let line = self.lexer.line;
        self.expect_right_bracket()?;

        let source = source.ok_or(GmlError::MissingEdgeField { line, field: "source" })?;
        let target = target.ok_or(GmlError::MissingEdgeField { line, field: "target" })?;

        Ok(GmlEdge {
            source,
            target,
            attributes,
        })
    }

    fn parse_graph(&mut self) -> Result<GmlGraph, GmlError> {
        self.advance()?; // `graph`
        self.expect_left_bracket()?;

        let mut graph = GmlGraph::default();

        loop {
            match &self.current_token {
                Token::RightBracket => break,
                Token::Identifier(keyword) if keyword == "node" => {
                    graph.nodes.push(self.parse_node()?);
                }
                Token::Identifier(keyword) if keyword == "edge" => {
                    graph.edges.push(self.parse_edge()?);
                }
                Token::Identifier(_) => {
                    let key = self.parse_key()?;
                    if let Some(value) = self.parse_value()? {
                        graph.attributes.insert(key, value);
                    }
                }
                _ => return Err(self.unexpected("'node', 'edge', attribute or ']'")),
            }
        }

        self.expect_right_bracket()?;
        Ok(graph)
    }

    /// Top level: optional attributes (`Creator`, `Version`, ...) around
    /// exactly one `graph` record.
    fn parse_document(&mut self) -> Result<GmlGraph, GmlError> {
        let mut graph = None;

        loop {
            match &self.current_token {
                Token::Eof => break,
                Token::Identifier(keyword) if keyword == "graph" => {
                    if graph.is_some() {
                        return Err(GmlError::MultipleGraphs {
                            line: self.lexer.line,
                        });
                    }
                    graph = Some(self.parse_graph()?);
                }
                Token::Identifier(_) => {
                    self.parse_key()?;
                    self.parse_value()?;
                }
                _ => return Err(self.unexpected("'graph' record")),
            }
        }

        graph.ok_or_else(|| self.unexpected("'graph' record"))
    }
}

/// Parse GML text into a [`GmlGraph`]
pub fn parse_gml(content: &str) -> Result<GmlGraph, GmlError> {
    let lexer = Lexer::new(content);
    let mut parser = Parser::new(lexer)?;
    parser.parse_document()
}

/// Parse a GML file and return a [`GmlGraph`] object
pub fn parse_gml_file(path: &Path) -> Result<GmlGraph, GmlError> {
    let content = fs::read_to_string(path)?;
    parse_gml(&content)
}

/// Load a topology file as an undirected [`Graph`].
///
/// Fails with [`GmlError::EmptyGraph`] when the file holds no node, and with
/// one of the other variants when the file cannot be parsed.
pub fn load(path: &Path) -> Result<Graph, GmlError> {
    let gml = parse_gml_file(path)?;
    if gml.is_directed() {
        log::debug!("{} declares a directed graph; treating it as undirected", path.display());
    }
    let graph = Graph::try_from(gml)?;
    if graph.is_empty() {
        return Err(GmlError::EmptyGraph);
    }
    log::info!(
        "Loaded GML topology from '{}' with {} nodes and {} edges",
        path.display(),
        graph.vertex_count(),
        graph.edge_count()
    );
    Ok(graph)
}
