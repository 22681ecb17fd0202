//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use command_scheduler::core::{Command, CommandResult, Requirement};
use parking_lot::Mutex;

/// Shared event log, one `"<name> <callback>"` entry per callback.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Take everything recorded so far.
pub fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock())
}

/// Entries belonging to command `name`.
pub fn entries_for(entries: &[String], name: &str) -> Vec<String> {
    let prefix = format!("{name} ");
    entries
        .iter()
        .filter(|e| e.starts_with(&prefix))
        .cloned()
        .collect()
}

/// Command that records every callback and finishes after a set number of
/// `execute` calls.
pub struct Recorder {
    name: String,
    log: Log,
    finish_after: Option<u32>,
    executed: u32,
    timeout: Duration,
    requirements: Vec<Requirement>,
    interruptible: bool,
    fail_init: bool,
    fail_execute: bool,
    panic_interrupted: bool,
    panic_end: bool,
}

impl Recorder {
    pub fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            finish_after: Some(1),
            executed: 0,
            timeout: Duration::ZERO,
            requirements: Vec::new(),
            interruptible: true,
            fail_init: false,
            fail_execute: false,
            panic_interrupted: false,
            panic_end: false,
        }
    }

    pub fn finish_after(mut self, executions: u32) -> Self {
        self.finish_after = Some(executions);
        self
    }

    pub fn never_finish(mut self) -> Self {
        self.finish_after = None;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn requires(mut self, requirement: &Requirement) -> Self {
        self.requirements.push(requirement.clone());
        self
    }

    pub fn not_interruptible(mut self) -> Self {
        self.interruptible = false;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn panicking_interrupted(mut self) -> Self {
        self.panic_interrupted = true;
        self
    }

    pub fn panicking_end(mut self) -> Self {
        self.panic_end = true;
        self
    }

    fn record(&self, callback: &str) {
        self.log.lock().push(format!("{} {callback}", self.name));
    }
}

impl Command for Recorder {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn requirements(&self) -> Vec<Requirement> {
        self.requirements.clone()
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self) -> CommandResult<()> {
        self.record("init");
        if self.fail_init {
            return Err(anyhow!("{} failed to initialize", self.name));
        }
        Ok(())
    }

    fn execute(&mut self) -> CommandResult<bool> {
        self.record("exec");
        if self.fail_execute {
            return Err(anyhow!("{} failed to execute", self.name));
        }
        self.executed += 1;
        Ok(self.finish_after.is_some_and(|n| self.executed >= n))
    }

    fn interrupted(&mut self) -> CommandResult<()> {
        self.record("interrupted");
        assert!(!self.panic_interrupted, "{} panicked in interrupted", self.name);
        Ok(())
    }

    fn end(&mut self) -> CommandResult<()> {
        self.record("end");
        assert!(!self.panic_end, "{} panicked in end", self.name);
        Ok(())
    }
}
