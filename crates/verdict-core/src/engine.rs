//! Test engine - loads files, executes units, publishes progress

use crate::context::TestingContext;
use crate::discovery::{DiscoveryTree, EntryId, LoadedFile, TestCase, TestFile};
use crate::error::{EngineError, EngineResult, LoadError};
use crate::event::{Event, EventHandlerManager};
use crate::handle::TestHandle;
use crate::result::ResultBuilder;
use crate::value::RaisedError;
use rayon::prelude::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a worker produced for one file.
struct FileOutcome {
    entry: EntryId,
    units: Result<Vec<ResultBuilder>, LoadError>,
}

/// Test engine with configuration
#[derive(Debug, Clone, Default)]
pub struct TestEngine {
    /// Whether to run files in parallel
    parallel: bool,
    /// Substring a case name must contain to run
    filter: Option<String>,
}

impl TestEngine {
    /// Create a sequential engine without a filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to run files in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Only run cases whose name contains `pattern`
    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    /// Run every file of `tree`, publishing events to `manager`.
    ///
    /// Events are emitted in discovery order in both modes.
    pub fn run(
        &self,
        tree: &DiscoveryTree,
        manager: &mut EventHandlerManager,
    ) -> EngineResult<TestingContext> {
        let started = Instant::now();
        let mut emitter = Emitter {
            tree,
            context: TestingContext::new(),
            next_sequence: 0,
        };

        emitter.context.set_registered_file_count(tree.file_count());
        manager.publish(&Event::FileRegistrationDone {
            context: &emitter.context,
        })?;

        if self.parallel {
            self.run_parallel(tree, manager, &mut emitter)?;
        } else {
            self.run_sequential(tree, manager, &mut emitter)?;
        }

        let mut context = emitter.context;
        context.set_duration(started.elapsed());
        info!(
            passed = context.passed_test_count(),
            failed = context.failed_test_count(),
            skipped = context.skipped_test_count(),
            load_failures = context.load_failure_count(),
            "testing finished"
        );
        manager.publish(&Event::TestingEnd { context: &context })?;
        Ok(context)
    }

    /// Load and run file by file, emitting as each unit finishes
    fn run_sequential(
        &self,
        tree: &DiscoveryTree,
        manager: &mut EventHandlerManager,
        emitter: &mut Emitter<'_>,
    ) -> EngineResult<()> {
        for file in tree.files() {
            let entry = file.entry();
            match self.load(file) {
                Err(error) => emitter.load_failed(entry, error, manager)?,
                Ok(cases) => {
                    emitter.file_loaded(entry, manager)?;
                    let last = cases.len().saturating_sub(1);
                    for (index, case) in cases.iter().enumerate() {
                        let unit = execute_unit(entry, case, index == last)?;
                        emitter.unit_done(unit, manager)?;
                    }
                    emitter.file_done(entry, manager)?;
                }
            }
        }
        Ok(())
    }

    /// Run files on the rayon pool and replay their outcomes in discovery
    /// order as soon as each prefix is complete
    fn run_parallel(
        &self,
        tree: &DiscoveryTree,
        manager: &mut EventHandlerManager,
        emitter: &mut Emitter<'_>,
    ) -> EngineResult<()> {
        let files = tree.files();
        let cancelled = AtomicBool::new(false);
        let (sender, receiver) = mpsc::channel::<(usize, EngineResult<FileOutcome>)>();

        thread::scope(|scope| -> EngineResult<()> {
            let cancelled = &cancelled;
            scope.spawn(move || {
                files
                    .par_iter()
                    .enumerate()
                    .for_each_with(sender, |sender, (index, file)| {
                        if cancelled.load(Ordering::Relaxed) {
                            return;
                        }
                        // The receiver only hangs up after the run failed.
                        let _ = sender.send((index, self.execute_file(file)));
                    });
            });

            let replayed = emitter.replay_in_order(receiver, files.len(), manager);
            if let Err(error) = &replayed {
                cancelled.store(true, Ordering::Relaxed);
                debug!(%error, "parallel run cancelled");
            }
            replayed
        })
    }

    fn execute_file(&self, file: &TestFile) -> EngineResult<FileOutcome> {
        let entry = file.entry();
        let units = match self.load(file) {
            Err(error) => Err(error),
            Ok(cases) => {
                let last = cases.len().saturating_sub(1);
                let units = cases
                    .iter()
                    .enumerate()
                    .map(|(index, case)| execute_unit(entry, case, index == last))
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(units)
            }
        };
        Ok(FileOutcome { entry, units })
    }

    fn load(&self, file: &TestFile) -> Result<Vec<TestCase>, LoadError> {
        let cases = file.load()?;
        Ok(match &self.filter {
            Some(pattern) => cases
                .into_iter()
                .filter(|case| case.name().contains(pattern.as_str()))
                .collect(),
            None => cases,
        })
    }
}

/// Run one unit to completion and classify it.
fn execute_unit(entry: EntryId, case: &TestCase, is_last: bool) -> EngineResult<ResultBuilder> {
    let mut unit = ResultBuilder::new(entry, case.name(), is_last);
    let modifiers = case.modifiers();
    unit.annotate(modifiers.annotations());

    if let Some(conflict) = modifiers.check_conflicts() {
        debug!(case = case.name(), %conflict, "conflicting modifiers");
        unit.conflicted(conflict)?;
        return Ok(unit);
    }

    if modifiers.is_skipped() {
        unit.skipped()?;
        return Ok(unit);
    }

    unit.start()?;
    let started = Instant::now();
    let mut handle = TestHandle::new();
    let body = case.body();
    let returned = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut handle))) {
        Ok(returned) => returned,
        Err(payload) => Err(RaisedError::runtime_error(panic_message(payload))),
    };

    let (outcome, notes) = handle.finish(returned);
    let verdict = modifiers.reinterpret(outcome);
    debug!(case = case.name(), pass = verdict.is_pass(), "unit finished");
    unit.judged(verdict, modifiers.is_informal(), notes, started.elapsed())?;
    Ok(unit)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

/// Single writer of the testing context; emits events in discovery order.
struct Emitter<'a> {
    tree: &'a DiscoveryTree,
    context: TestingContext,
    next_sequence: usize,
}

impl<'a> Emitter<'a> {
    fn load_failed(
        &mut self,
        entry: EntryId,
        error: LoadError,
        manager: &mut EventHandlerManager,
    ) -> EngineResult<()> {
        let path = self.tree.path(entry);
        warn!(file = %path, %error, "test file failed to load");
        self.context.record_load_failure(entry, path, error);
        if let Some(failure) = self.context.iter_load_failures().last() {
            let file = LoadedFile::new(self.tree, entry, Some(&failure.error));
            manager.publish(&Event::FileLoadDone { file })?;
        }
        Ok(())
    }

    fn file_loaded(&mut self, entry: EntryId, manager: &mut EventHandlerManager) -> EngineResult<()> {
        let file = LoadedFile::new(self.tree, entry, None);
        manager.publish(&Event::FileLoadDone { file })
    }

    fn unit_done(
        &mut self,
        unit: ResultBuilder,
        manager: &mut EventHandlerManager,
    ) -> EngineResult<()> {
        let entry = unit.file();
        let result = unit.build(self.next_sequence, self.tree.path(entry));
        self.next_sequence += 1;
        self.context.record_result(result);
        if let Some(result) = self.context.results().last() {
            let file = LoadedFile::new(self.tree, entry, None);
            manager.publish(&Event::TestDone { result, file })?;
        }
        Ok(())
    }

    fn file_done(&mut self, entry: EntryId, manager: &mut EventHandlerManager) -> EngineResult<()> {
        let file = LoadedFile::new(self.tree, entry, None);
        manager.publish(&Event::FileTestingDone { file })
    }

    /// Replay outcomes as each prefix of discovery order completes.
    fn replay_in_order(
        &mut self,
        receiver: mpsc::Receiver<(usize, EngineResult<FileOutcome>)>,
        expected: usize,
        manager: &mut EventHandlerManager,
    ) -> EngineResult<()> {
        let mut pending = BTreeMap::new();
        let mut next = 0;
        for (index, outcome) in receiver {
            pending.insert(index, outcome);
            while let Some(outcome) = pending.remove(&next) {
                self.replay(outcome?, manager)?;
                next += 1;
            }
        }

        if next < expected {
            return Err(EngineError::WorkerLost(next));
        }
        Ok(())
    }

    fn replay(&mut self, outcome: FileOutcome, manager: &mut EventHandlerManager) -> EngineResult<()> {
        match outcome.units {
            Err(error) => self.load_failed(outcome.entry, error, manager),
            Ok(units) => {
                self.file_loaded(outcome.entry, manager)?;
                for unit in units {
                    self.unit_done(unit, manager)?;
                }
                self.file_done(outcome.entry, manager)
            }
        }
    }
}
