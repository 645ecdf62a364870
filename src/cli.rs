//! Line-oriented interactive interpreter.
//!
//! Understands a subset of the Mininet CLI: `nodes`, `net`, `links`, `dump`,
//! `pingall`, `pingpair`, `sh`, `<node> <cmd>` and `exit`. Results go to the
//! output writer; failures of individual commands are printed and the session
//! goes on.

use crate::backend::{Backend, BackendError, CommandOutput};
use crate::error::ZooError;
use crate::network::Network;
use crate::signal::Interrupt;
use crate::topology::NodeKind;
use std::io::{self, BufRead, ErrorKind, Write};
use std::net::Ipv4Addr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const PROMPT: &str = "zoonet> ";

/// How often a session waiting for input looks at the interrupt flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const HELP: &str = "\
Documented commands:
  help, ?            show this list
  nodes              list hosts and switches
  net                list every node with its interfaces and their peers
  links              list every link
  dump               show node details and host addresses
  pingall            ping between every pair of hosts
  pingpair           ping between the first two hosts
  sh <cmd>           run a shell command in the root namespace
  <node> <cmd>       run a command on a node; host names in <cmd> become their IP
  exit, quit         leave the interpreter (or send end-of-input)
";

enum Flow {
    Continue,
    Exit,
}

fn terminal(e: io::Error) -> ZooError {
    ZooError::Unexpected(format!("terminal I/O failed: {e}"))
}

/// Read `input` line by line on its own thread. An empty string marks end of
/// input. The thread exits once the receiver is gone; a thread still blocked
/// in a read when the session ends is left behind until the process exits.
fn spawn_reader<R: BufRead + Send + 'static>(mut input: R) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::sync_channel(0);
    thread::spawn(move || loop {
        let mut line = String::new();
        let (item, last) = match input.read_line(&mut line) {
            Ok(0) => (Ok(line), true),
            Ok(_) => (Ok(line), false),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => (Err(e), true),
        };
        if tx.send(item).is_err() || last {
            break;
        }
    });
    rx
}

/// Interactive session over a running network
pub struct Cli<'a, B: Backend, W: Write> {
    net: &'a mut Network<B>,
    out: W,
    interrupt: Interrupt,
}

impl<'a, B: Backend, W: Write> Cli<'a, B, W> {
    pub fn new(net: &'a mut Network<B>, out: W, interrupt: Interrupt) -> Self {
        Self { net, out, interrupt }
    }

    /// Read and execute lines until `exit`, end of input or an interrupt.
    ///
    /// Lines are read on a helper thread so an interrupt ends the session
    /// even while the reader is blocked. Returns `Err(ZooError::Interrupted)`
    /// when the interrupt flag is seen.
    pub fn run<R: BufRead + Send + 'static>(&mut self, input: R) -> Result<(), ZooError> {
        let lines = spawn_reader(input);
        loop {
            self.interrupt.check()?;
            write!(self.out, "{PROMPT}").map_err(terminal)?;
            self.out.flush().map_err(terminal)?;

            let Some(line) = self.next_line(&lines)? else {
                writeln!(self.out).map_err(terminal)?;
                return Ok(());
            };
            self.interrupt.check()?;

            if let Flow::Exit = self.execute(line.trim())? {
                return Ok(());
            }
        }
    }

    /// Wait for the next input line, `None` at end of input
    fn next_line(&self, lines: &Receiver<io::Result<String>>) -> Result<Option<String>, ZooError> {
        loop {
            self.interrupt.check()?;
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(line)) if line.is_empty() => return Ok(None),
                Ok(Ok(line)) => return Ok(Some(line)),
                Ok(Err(e)) => return Err(terminal(e)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }

    fn execute(&mut self, line: &str) -> Result<Flow, ZooError> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            "" => {}
            "exit" | "quit" => return Ok(Flow::Exit),
            "help" | "?" => write!(self.out, "{HELP}").map_err(terminal)?,
            "nodes" => self.nodes()?,
            "net" => self.show_net()?,
            "links" => self.links()?,
            "dump" => self.dump()?,
            "pingall" => {
                let hosts = self.host_names();
                self.ping_hosts(&hosts)?;
            }
            "pingpair" => {
                let hosts: Vec<String> = self.host_names().into_iter().take(2).collect();
                if hosts.len() < 2 {
                    writeln!(self.out, "*** Error: pingpair needs two hosts").map_err(terminal)?;
                } else {
                    self.ping_hosts(&hosts)?;
                }
            }
            "sh" if !rest.is_empty() => {
                let result = self.net.root_cmd(rest);
                self.print_result(result)?;
            }
            node if self.net.topology().node_kind(node).is_some() && !rest.is_empty() => {
                let command = self.substitute_hosts(rest);
                let result = self.net.node_cmd(node, &command);
                self.print_result(result)?;
            }
            _ => writeln!(self.out, "*** Unknown command: {line}").map_err(terminal)?,
        }
        Ok(Flow::Continue)
    }

    fn host_names(&self) -> Vec<String> {
        self.net.topology().hosts().map(|h| h.name.clone()).collect()
    }

    fn switch_names(&self) -> Vec<String> {
        self.net.topology().switches().map(|s| s.name.clone()).collect()
    }

    fn host_addr(&self, host: &str) -> Option<Ipv4Addr> {
        self.net.host_ip(host).map(|net| net.addr())
    }

    fn nodes(&mut self) -> Result<(), ZooError> {
        let mut names = self.host_names();
        names.extend(self.switch_names());
        writeln!(self.out, "available nodes are:\n{}", names.join(" ")).map_err(terminal)
    }

    fn show_net(&mut self) -> Result<(), ZooError> {
        let mut names = self.host_names();
        names.extend(self.switch_names());
        for node in names {
            let mut ends: Vec<(u32, String)> = self
                .net
                .topology()
                .links()
                .filter_map(|link| {
                    let peer = link.peer_of(&node)?;
                    let local = if link.a.node == node { &link.a } else { &link.b };
                    Some((local.port, format!("{local}:{peer}")))
                })
                .collect();
            ends.sort();
            let ends: Vec<String> = ends.into_iter().map(|(_, end)| end).collect();
            writeln!(self.out, "{} {}", node, ends.join(" ")).map_err(terminal)?;
        }
        Ok(())
    }

    fn links(&mut self) -> Result<(), ZooError> {
        let links: Vec<String> = self.net.topology().links().map(|l| l.to_string()).collect();
        for link in links {
            writeln!(self.out, "{link}").map_err(terminal)?;
        }
        Ok(())
    }

    fn interfaces_of(&self, node: &str) -> Vec<String> {
        let mut interfaces: Vec<_> = self
            .net
            .topology()
            .links()
            .filter_map(|link| {
                if link.a.node == node {
                    Some(link.a.clone())
                } else if link.b.node == node {
                    Some(link.b.clone())
                } else {
                    None
                }
            })
            .collect();
        interfaces.sort();
        interfaces.iter().map(|i| i.name()).collect()
    }

    fn dump(&mut self) -> Result<(), ZooError> {
        for host in self.host_names() {
            let addr = self
                .host_addr(&host)
                .map_or_else(|| "None".to_string(), |a| a.to_string());
            let interfaces = self.interfaces_of(&host).join(",");
            writeln!(self.out, "<Host {host}: {interfaces}:{addr}>").map_err(terminal)?;
        }
        for switch in self.switch_names() {
            let interfaces = self.interfaces_of(&switch).join(",");
            writeln!(self.out, "<OVSSwitch {switch}: {interfaces}>").map_err(terminal)?;
        }
        Ok(())
    }

    /// One echo request per ordered pair of `hosts`, printed as a
    /// reachability matrix followed by the drop rate
    fn ping_hosts(&mut self, hosts: &[String]) -> Result<(), ZooError> {
        writeln!(self.out, "*** Ping: testing ping reachability").map_err(terminal)?;
        let mut sent = 0usize;
        let mut received = 0usize;

        for src in hosts {
            let mut row = Vec::new();
            for dst in hosts.iter().filter(|d| *d != src) {
                sent += 1;
                let reached = match self.host_addr(dst) {
                    Some(addr) => {
                        let ping = format!("ping -c1 -W1 {addr}");
                        match self.net.host_cmd(src, &ping) {
                            Ok(output) => output.success,
                            Err(e) => {
                                log::warn!("ping from {} to {} failed to run: {}", src, dst, e);
                                false
                            }
                        }
                    }
                    None => false,
                };
                if reached {
                    received += 1;
                    row.push(dst.as_str());
                } else {
                    row.push("X");
                }
            }
            writeln!(self.out, "{} -> {}", src, row.join(" ")).map_err(terminal)?;
        }

        let dropped = if sent == 0 {
            0
        } else {
            100 * (sent - received) / sent
        };
        writeln!(
            self.out,
            "*** Results: {}% dropped ({}/{} received)",
            dropped, received, sent
        )
        .map_err(terminal)
    }

    /// Replace words naming a host with that host's address
    fn substitute_hosts(&self, command: &str) -> String {
        command
            .split_whitespace()
            .map(|word| {
                match (self.net.topology().node_kind(word), self.host_addr(word)) {
                    (Some(NodeKind::Host), Some(addr)) => addr.to_string(),
                    _ => word.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn print_result(&mut self, result: Result<CommandOutput, BackendError>) -> Result<(), ZooError> {
        match result {
            Ok(output) => {
                write!(self.out, "{}", output.stdout).map_err(terminal)?;
                write!(self.out, "{}", output.stderr).map_err(terminal)
            }
            Err(e) => writeln!(self.out, "*** Error: {e}").map_err(terminal),
        }
    }
}
