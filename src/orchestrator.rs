//! Pipeline orchestrator.
//!
//! This module drives one run from topology file to torn-down network:
//! validate, load, name, build, start, disable STP, address hosts, serve
//! the interactive session. Once a backend is bound to the topology the
//! network is stopped on every exit path.

use crate::backend::Backend;
use crate::cli::Cli;
use crate::error::ZooError;
use crate::gml_parser;
use crate::network::Network;
use crate::signal::Interrupt;
use crate::topology::{build, switch_name, NameMap, TopologyDescription};
use crate::utils::validate_input_file;
use log::{debug, info};
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

/// Wait after switch start-up so bridge daemons are bound before ovs-vsctl runs
pub const SETTLE_AFTER_START: Duration = Duration::from_secs(2);

/// Wait after disabling STP so bridges re-evaluate their forwarding state
pub const SETTLE_AFTER_STP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Orchestrator {
    interrupt: Interrupt,
    ovs_vsctl: String,
    settle_after_start: Duration,
    settle_after_stp: Duration,
}

impl Orchestrator {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            ovs_vsctl: "ovs-vsctl".to_string(),
            settle_after_start: SETTLE_AFTER_START,
            settle_after_stp: SETTLE_AFTER_STP,
        }
    }

    /// Name or path of `ovs-vsctl` for the STP commands
    pub fn with_ovs_vsctl(mut self, ovs_vsctl: impl Into<String>) -> Self {
        self.ovs_vsctl = ovs_vsctl.into();
        self
    }

    /// Shorten the settle windows, for driving the pipeline against a
    /// backend with no asynchronous start-up
    #[doc(hidden)]
    pub fn with_settle_windows(mut self, after_start: Duration, after_stp: Duration) -> Self {
        self.settle_after_start = after_start;
        self.settle_after_stp = after_stp;
        self
    }

    /// Validate and load the topology file and build its description.
    /// No backend is involved yet.
    pub fn prepare(&self, path: &Path) -> Result<TopologyDescription, ZooError> {
        validate_input_file(path)?;

        let graph = gml_parser::load(path).map_err(|e| ZooError::from_gml(path, e))?;
        let names = NameMap::assign(&graph);
        for (index, key, label) in names.iter() {
            debug!("{} <- node {} ({})", switch_name(index), key, label);
        }

        Ok(build(&graph, &names)?)
    }

    /// Run the whole pipeline for `path` on `backend`, with the interactive
    /// session reading `input` and writing `output`.
    ///
    /// Returns `Ok(())` on a clean exit from the session and
    /// `Err(ZooError::Interrupted)` after an interrupt; the network has been
    /// torn down either way.
    pub fn run<B, R, W>(&self, path: &Path, mut backend: B, input: R, output: W) -> Result<(), ZooError>
    where
        B: Backend,
        R: BufRead + Send + 'static,
        W: Write,
    {
        info!("Loading topology from {}", path.display());
        let topology = self.prepare(path)?;
        self.interrupt.check()?;

        backend
            .preflight()
            .map_err(|e| self.after_interrupt(ZooError::from_backend(e)))?;

        let mut net = Network::new(backend, topology).with_ovs_vsctl(self.ovs_vsctl.clone());
        let result = self
            .serve(&mut net, input, output)
            .map_err(|e| self.after_interrupt(e));
        net.stop();
        result
    }

    /// SIGINT also reaches the tools the backend spawns, so a failure seen
    /// once the flag is raised is reported as the interrupt
    fn after_interrupt(&self, err: ZooError) -> ZooError {
        if self.interrupt.is_set() && !matches!(err, ZooError::Interrupted) {
            debug!("Failure after interrupt: {}", err);
            ZooError::Interrupted
        } else {
            err
        }
    }

    fn serve<B, R, W>(&self, net: &mut Network<B>, input: R, output: W) -> Result<(), ZooError>
    where
        B: Backend,
        R: BufRead + Send + 'static,
        W: Write,
    {
        net.start()?;
        self.interrupt.sleep(self.settle_after_start)?;

        net.disable_stp()?;
        self.interrupt.sleep(self.settle_after_stp)?;

        net.configure()?;

        info!("Starting interactive session");
        Cli::new(net, output, self.interrupt.clone()).run(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, CommandOutput, MemoryBackend};
    use crate::topology::{HostSpec, Interface, LinkSpec, SwitchSpec};
    use ipnet::Ipv4Net;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    const TRIANGLE: &str = r#"
graph [
  node [ id 0 label "A" ]
  node [ id 1 label "B" ]
  node [ id 2 label "C" ]
  edge [ source 0 target 1 ]
  edge [ source 1 target 2 ]
  edge [ source 2 target 0 ]
]
"#;

    fn gml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn orchestrator(interrupt: Interrupt) -> Orchestrator {
        Orchestrator::new(interrupt).with_settle_windows(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_prepare_builds_description() {
        let file = gml_file(TRIANGLE);
        let topology = orchestrator(Interrupt::new()).prepare(file.path()).unwrap();
        assert_eq!(topology.switch_count(), 3);
        assert_eq!(topology.host_count(), 3);
        assert_eq!(topology.link_count(), 6);
    }

    #[test]
    fn test_clean_run_tears_down() {
        let file = gml_file(TRIANGLE);
        let mut backend = MemoryBackend::new();
        let mut out = Vec::new();
        let result = orchestrator(Interrupt::new()).run(
            file.path(),
            &mut backend,
            Cursor::new("pingall\nexit\n"),
            &mut out,
        );
        assert!(result.is_ok());
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("*** Results: 0% dropped (6/6 received)"));
        assert!(backend.is_empty());
    }

    #[test]
    fn test_missing_file_touches_nothing() {
        let mut backend = MemoryBackend::new();
        let result = orchestrator(Interrupt::new()).run(
            Path::new("/nonexistent/zoo.gml"),
            &mut backend,
            Cursor::new(""),
            Vec::new(),
        );
        assert!(matches!(result, Err(ZooError::FileMissing { .. })));
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn test_interrupt_before_start() {
        let file = gml_file(TRIANGLE);
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let mut backend = MemoryBackend::new();
        let result = orchestrator(interrupt).run(file.path(), &mut backend, Cursor::new(""), Vec::new());
        assert!(matches!(result, Err(ZooError::Interrupted)));
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn test_unprivileged_backend() {
        let file = gml_file(TRIANGLE);
        let mut backend = MemoryBackend::new().without_privileges();
        let result = orchestrator(Interrupt::new()).run(file.path(), &mut backend, Cursor::new(""), Vec::new());
        assert!(matches!(result, Err(ZooError::PermissionDenied(_))));
        assert_eq!(backend.journal(), &["preflight"]);
    }

    #[test]
    fn test_backend_failure_tears_down() {
        let file = gml_file(TRIANGLE);
        let mut backend = MemoryBackend::new().fail_on("set_ip h2");
        let result = orchestrator(Interrupt::new()).run(file.path(), &mut backend, Cursor::new(""), Vec::new());
        assert!(matches!(result, Err(ZooError::BackendRuntime(_))));
        assert!(backend.is_empty());
    }

    #[test]
    fn test_self_loop_rejected_before_backend() {
        let file = gml_file("graph [ node [ id 0 ] edge [ source 0 target 0 ] ]");
        let mut backend = MemoryBackend::new();
        let result = orchestrator(Interrupt::new()).run(file.path(), &mut backend, Cursor::new(""), Vec::new());
        assert!(matches!(result, Err(ZooError::BuildFailed(_))));
        assert!(backend.journal().is_empty());
    }

    /// Fails the first operation naming `needle` as a tool killed by SIGINT would
    struct SigintBackend {
        inner: MemoryBackend,
        interrupt: Interrupt,
        needle: &'static str,
    }

    impl SigintBackend {
        fn hit(&mut self, operation: String) -> Result<(), BackendError> {
            if operation.contains(self.needle) {
                self.interrupt.trigger();
                return Err(BackendError::CommandFailed {
                    command: operation,
                    status: "signal: 2 (SIGINT)".to_string(),
                    stderr: String::new(),
                });
            }
            Ok(())
        }
    }

    impl Backend for SigintBackend {
        fn preflight(&mut self) -> Result<(), BackendError> {
            self.hit("preflight".to_string())?;
            self.inner.preflight()
        }

        fn add_switch(&mut self, switch: &SwitchSpec) -> Result<(), BackendError> {
            self.hit(format!("add_switch {}", switch.name))?;
            self.inner.add_switch(switch)
        }

        fn add_host(&mut self, host: &HostSpec) -> Result<(), BackendError> {
            self.hit(format!("add_host {}", host.name))?;
            self.inner.add_host(host)
        }

        fn add_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
            self.inner.add_link(link)
        }

        fn start_switch(&mut self, switch: &str) -> Result<(), BackendError> {
            self.inner.start_switch(switch)
        }

        fn set_ip(&mut self, interface: &Interface, addr: Ipv4Net) -> Result<(), BackendError> {
            self.inner.set_ip(interface, addr)
        }

        fn switch_cmd(&mut self, switch: &str, command: &str) -> Result<CommandOutput, BackendError> {
            self.inner.switch_cmd(switch, command)
        }

        fn host_cmd(&mut self, host: &str, command: &str) -> Result<CommandOutput, BackendError> {
            self.inner.host_cmd(host, command)
        }

        fn remove_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
            self.inner.remove_link(link)
        }

        fn remove_host(&mut self, host: &str) -> Result<(), BackendError> {
            self.inner.remove_host(host)
        }

        fn remove_switch(&mut self, switch: &str) -> Result<(), BackendError> {
            self.inner.remove_switch(switch)
        }
    }

    fn sigint_run(needle: &'static str) -> (Result<(), ZooError>, SigintBackend) {
        let file = gml_file(TRIANGLE);
        let interrupt = Interrupt::new();
        let mut backend = SigintBackend {
            inner: MemoryBackend::new(),
            interrupt: interrupt.clone(),
            needle,
        };
        let result = orchestrator(interrupt).run(file.path(), &mut backend, Cursor::new(""), Vec::new());
        (result, backend)
    }

    #[test]
    fn test_tool_killed_by_interrupt_during_start() {
        let (result, backend) = sigint_run("add_host h1");
        let err = result.unwrap_err();
        assert!(matches!(err, ZooError::Interrupted));
        assert_eq!(err.exit_code(), 0);
        assert!(backend.inner.is_empty());
        assert!(backend.inner.journal().iter().any(|e| e == "remove_host h0"));
    }

    #[test]
    fn test_tool_killed_by_interrupt_during_preflight() {
        let (result, backend) = sigint_run("preflight");
        assert!(matches!(result, Err(ZooError::Interrupted)));
        assert!(backend.inner.journal().is_empty());
    }

    #[test]
    fn test_failure_without_interrupt_is_not_masked() {
        let (result, _) = sigint_run("no such operation");
        assert!(result.is_ok());

        let file = gml_file(TRIANGLE);
        let mut backend = MemoryBackend::new().fail_on("add_host h1");
        let result = orchestrator(Interrupt::new()).run(file.path(), &mut backend, Cursor::new(""), Vec::new());
        assert!(matches!(result, Err(ZooError::BackendRuntime(_))));
    }
}
