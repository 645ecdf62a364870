//! Network topology module.
//!
//! This module maps graph vertices to canonical switch/host names and builds
//! the ordered topology description the emulator replays.

pub mod builder;
pub mod names;
pub mod types;

// Re-export key types and functions for easier access
pub use builder::{build, BuildError, TopologyDescription};
pub use names::{host_name, switch_name, NameMap};
pub use types::{
    FailMode, HostSpec, Interface, LinkKind, LinkSpec, NodeKind, SwitchClass, SwitchSpec,
    TopoCommand,
};
