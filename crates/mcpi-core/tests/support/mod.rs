//! Shared fixtures: a sandboxed settings tree, a scripted process runner
//! and an in-memory package index.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use mcpi_core::config::{BaseDirs, Settings};
use mcpi_core::context::AppContext;
use mcpi_core::discovery::{IndexPackage, PackageIndex, RetryPolicy};
use mcpi_core::process::{CommandSpec, ProcessOutput, ProcessRunner};
use mcpi_core::registry::RegistryStore;
use tempfile::TempDir;

/// Every command a [`ScriptedRunner`] was asked to run.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<CommandSpec>>>);

impl CallLog {
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.0.borrow().clone()
    }

    /// Display form of each command, in order.
    pub fn commands(&self) -> Vec<String> {
        self.0.borrow().iter().map(CommandSpec::display).collect()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }
}

type Handler = Box<dyn Fn(&CommandSpec) -> io::Result<ProcessOutput>>;

/// Process runner whose outcomes are decided by a closure.
pub struct ScriptedRunner {
    log: CallLog,
    handler: Handler,
}

impl ScriptedRunner {
    pub fn new(
        handler: impl Fn(&CommandSpec) -> io::Result<ProcessOutput> + 'static,
    ) -> (Self, CallLog) {
        let log = CallLog::default();
        let runner = Self {
            log: log.clone(),
            handler: Box::new(handler),
        };
        (runner, log)
    }

    /// Every command exits zero with empty output, except `npm view`,
    /// which fails so package resolution falls through to the index.
    pub fn succeed_all() -> (Self, CallLog) {
        Self::new(|spec| Ok(default_outcome(spec)))
    }
}

/// Outcome used by [`ScriptedRunner::succeed_all`].
pub fn default_outcome(spec: &CommandSpec) -> ProcessOutput {
    if is_npm_view(spec) {
        ProcessOutput::failure(1, "npm ERR! 404 Not Found")
    } else {
        ProcessOutput::success("")
    }
}

pub fn is_npm_view(spec: &CommandSpec) -> bool {
    spec.program == "npm" && spec.args.first().map(String::as_str) == Some("view")
}

pub fn is_npx(spec: &CommandSpec) -> bool {
    spec.program == "npx"
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<ProcessOutput> {
        self.log.0.borrow_mut().push(spec.clone());
        (self.handler)(spec)
    }
}

/// In-memory package index that can fail a set number of times.
pub struct StaticIndex {
    packages: Vec<IndexPackage>,
    failures_left: Cell<u32>,
    calls: Rc<Cell<u32>>,
    listings: Rc<Cell<u32>>,
}

impl StaticIndex {
    pub fn new(packages: Vec<IndexPackage>) -> Self {
        Self {
            packages,
            failures_left: Cell::new(0),
            calls: Rc::new(Cell::new(0)),
            listings: Rc::new(Cell::new(0)),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Fail the first `failures` searches, then answer with `packages`.
    pub fn flaky(failures: u32, packages: Vec<IndexPackage>) -> Self {
        let index = Self::new(packages);
        index.failures_left.set(failures);
        index
    }

    pub fn unreachable() -> Self {
        Self::flaky(u32::MAX, Vec::new())
    }

    /// Shared counter of `search` calls.
    pub fn call_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.calls)
    }

    /// Shared counter of `list` calls.
    pub fn listing_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.listings)
    }

    fn answer(&self) -> anyhow::Result<Vec<IndexPackage>> {
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            anyhow::bail!("connection refused");
        }
        Ok(self.packages.clone())
    }
}

impl PackageIndex for StaticIndex {
    fn search(&self, _namespace: &str) -> anyhow::Result<Vec<IndexPackage>> {
        self.calls.set(self.calls.get() + 1);
        self.answer()
    }

    fn list(&self, _namespace: &str) -> anyhow::Result<Vec<IndexPackage>> {
        self.listings.set(self.listings.get() + 1);
        self.answer()
    }
}

pub fn package(name: &str, repository: Option<&str>, readme: Option<&str>) -> IndexPackage {
    let mut package = IndexPackage::named(name);
    package.repository = repository.map(str::to_string);
    package.readme = readme.map(str::to_string);
    package
}

/// Temporary mcpi home with settings pointing into it.
pub struct Sandbox {
    pub temp: TempDir,
    pub settings: Settings,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let dirs = BaseDirs::under(temp.path().join("mcpi"));
        let mut settings = Settings::defaults(&dirs);
        settings.discovery = RetryPolicy::new(3, Duration::ZERO);
        settings.host_config_path = Some(temp.path().join("host").join("config.json"));
        Self { temp, settings }
    }

    pub fn without_host_config(mut self) -> Self {
        self.settings.host_config_path = None;
        self
    }

    pub fn host_path(&self) -> PathBuf {
        self.temp.path().join("host").join("config.json")
    }

    pub fn open_registry(&self) -> RegistryStore {
        RegistryStore::load(&self.settings.registry_path).unwrap()
    }

    pub fn context(
        &self,
        runner: impl ProcessRunner + 'static,
        index: impl PackageIndex + 'static,
    ) -> AppContext {
        AppContext::new(
            self.settings.clone(),
            self.open_registry(),
            Box::new(runner),
            Box::new(index),
        )
    }
}
