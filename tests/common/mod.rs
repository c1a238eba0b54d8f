#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sumo_batch::config::{AreaSpec, BatchConfig};
use sumo_batch::engine::{StageOutcome, ToolInvoker};
use tempfile::TempDir;

/// Network written by the scripted netconvert: 3 junctions, 4 edges
pub const NETWORK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.16">
    <edge id=":J2_0" function="internal"/>
    <edge id="E1" from="J1" to="J2"/>
    <edge id="E2" from="J2" to="J3"/>
    <edge id="E3" from="J3" to="J1"/>
    <junction id="J1" type="priority"/>
    <junction id="J2" type="traffic_light"/>
    <junction id="J3" type="dead_end"/>
</net>
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    /// Exit 0 and write the output file
    Produce,
    /// Exit 0 without writing anything
    NoOutput,
    Fail(i32),
    TimeOut,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn mentions(&self, text: &str) -> bool {
        self.args.iter().any(|a| a.contains(text))
    }
}

/// Stands in for netconvert, randomTrips.py and duarouter
#[derive(Default)]
pub struct ScriptedInvoker {
    by_command: HashMap<String, Behaviour>,
    /// (command, area slug) overrides
    by_area: HashMap<(String, String), Behaviour>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, command: &str, behaviour: Behaviour) -> Self {
        self.by_command.insert(command.to_string(), behaviour);
        self
    }

    pub fn on_area(mut self, command: &str, slug: &str, behaviour: Behaviour) -> Self {
        self.by_area
            .insert((command.to_string(), slug.to_string()), behaviour);
        self
    }

    /// Delay every call whose arguments mention `slug`
    pub fn delay(mut self, slug: &str, delay: Duration) -> Self {
        self.delays.insert(slug.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, slug: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.mentions(slug)).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behaviour(&self, call: &Call) -> Behaviour {
        self.by_area
            .iter()
            .find(|((command, slug), _)| *command == call.command && call.mentions(slug))
            .map(|(_, b)| *b)
            .or_else(|| self.by_command.get(&call.command).copied())
            .unwrap_or(Behaviour::Produce)
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn invoke(&self, command: &str, args: &[String], _timeout: Duration) -> StageOutcome {
        let call = Call {
            command: command.to_string(),
            args: args.to_vec(),
        };
        self.calls.lock().unwrap().push(call.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .iter()
            .find(|(slug, _)| call.mentions(slug))
            .map(|(_, d)| *d)
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        let outcome = match self.behaviour(&call) {
            Behaviour::Produce => {
                if let Some(output) = output_file(args) {
                    let content = if command == "netconvert" {
                        NETWORK_XML
                    } else {
                        "<routes/>\n"
                    };
                    fs::write(output, content).unwrap();
                }
                StageOutcome::completed(None)
            }
            Behaviour::NoOutput => StageOutcome::completed(None),
            Behaviour::Fail(code) => StageOutcome {
                succeeded: false,
                exit_code: code,
                stdout_tail: String::new(),
                stderr_tail: format!("{} failed", command),
                timed_out: false,
                output_artifact: None,
            },
            Behaviour::TimeOut => StageOutcome::timed_out(1.0, String::new(), String::new()),
            Behaviour::NotFound => StageOutcome::tool_not_found(command),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Value following `--output-file` (netconvert) or `-o` (randomTrips, duarouter)
fn output_file(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == "--output-file" || a == "-o")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Config rooted in `dir` with one source extract per area and a stub
/// randomTrips.py, so every precondition is met
pub fn test_config(dir: &Path, areas: &[&str]) -> BatchConfig {
    let script = dir.join("randomTrips.py");
    fs::write(&script, "# stub\n").expect("Failed to write script");

    let areas: Vec<AreaSpec> = areas
        .iter()
        .map(|name| {
            let spec = AreaSpec::new(*name, format!("{}.osm", name.to_lowercase().replace(' ', "_")))
                .with_coverage(2.0);
            fs::write(dir.join(&spec.source_file), "<osm/>").expect("Failed to write source");
            spec
        })
        .collect();

    let mut config = BatchConfig {
        work_dir: dir.to_path_buf(),
        output_dir: dir.join("reports"),
        areas,
        ..Default::default()
    };
    config.tools.random_trips = Some(script);
    config
}

pub fn write_batch_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("batch.yaml");
    fs::write(&path, content).expect("Failed to write batch.yaml");
    path
}
