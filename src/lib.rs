//! # Zoonet - Emulate Topology Zoo networks as a live layer-2 fabric
//!
//! This library turns a GML topology, as published by the Internet Topology
//! Zoo, into a running emulated network on the local machine: one software
//! switch per graph vertex, wired by the graph's edges, with one host
//! attached to every switch.
//!
//! ## Overview
//!
//! A run is a strict sequence of stages:
//!
//! 1. **Validate** the input path (`utils::validation`)
//! 2. **Load** the GML file into an undirected graph (`gml_parser`)
//! 3. **Name** vertices `s0, s1, ...` and `h0, h1, ...` by index (`topology::names`)
//! 4. **Build** the ordered switch/link/host description (`topology::builder`)
//! 5. **Start** it on a backend, disable spanning tree, address the hosts (`network`)
//! 6. **Serve** an interactive session (`cli`)
//! 7. **Tear down** everything that was created, on every exit path
//!
//! Switches run in standalone fail-mode as MAC-learning bridges with STP
//! off, so cyclic topologies forward on every path without a controller.
//! Host `h_i` gets `10.0.0.(i+1)/24`.
//!
//! ## Architecture
//!
//! - `gml_parser`: Lexer and parser for the Topology Zoo GML dialect
//! - `topology`: Canonical naming and the topology description
//! - `ip`: Host addressing plan
//! - `backend`: The emulator interface, an Open vSwitch implementation and an in-memory one
//! - `network`: Lifecycle of a live network
//! - `cli`: Interactive interpreter
//! - `orchestrator`: The staged pipeline with guaranteed teardown
//! - `signal`: Interrupt flag and interruptible waits
//! - `config`: Optional YAML configuration
//! - `error`: Error taxonomy, hints and exit codes
//! - `utils`: Input validation and system tool lookup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::io;
//! use std::path::Path;
//! use zoonet::backend::OvsBackend;
//! use zoonet::config::ToolConfig;
//! use zoonet::orchestrator::Orchestrator;
//! use zoonet::signal::Interrupt;
//!
//! let interrupt = Interrupt::new();
//! interrupt.install()?;
//!
//! let backend = OvsBackend::new(ToolConfig::default());
//! Orchestrator::new(interrupt).run(
//!     Path::new("Abilene.gml"),
//!     backend,
//!     io::BufReader::new(io::stdin()),
//!     io::stdout(),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Each concern has its own `thiserror` enum; the pipeline reports through
//! [`error::ZooError`], which carries a one-line hint and the exit code.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod gml_parser;
pub mod ip;
pub mod network;
pub mod orchestrator;
pub mod signal;
pub mod topology;
pub mod utils;

pub use error::ZooError;
