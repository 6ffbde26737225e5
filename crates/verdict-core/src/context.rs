//! Testing context - run-scoped aggregate of results and counters

use crate::discovery::EntryId;
use crate::error::LoadError;
use crate::result::{Classification, TestResult};
use std::time::Duration;

/// A file that could not be made runnable.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub entry: EntryId,
    pub path: String,
    pub error: LoadError,
}

/// One per run. Only the engine mutates it; event handlers get shared
/// references.
#[derive(Debug, Default)]
pub struct TestingContext {
    registered_file_count: usize,
    results: Vec<TestResult>,
    load_failures: Vec<LoadFailure>,
    passed: usize,
    failed: usize,
    skipped: usize,
    informal: usize,
    conflicted: usize,
    unknown: usize,
    duration: Duration,
}

impl TestingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_registered_file_count(&mut self, count: usize) {
        self.registered_file_count = count;
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Count and keep a finished unit's result.
    pub(crate) fn record_result(&mut self, result: TestResult) {
        let counter = match result.classification() {
            Classification::Passed => &mut self.passed,
            Classification::Failed => &mut self.failed,
            Classification::Skipped => &mut self.skipped,
            Classification::Informal => &mut self.informal,
            Classification::Conflicted => &mut self.conflicted,
            Classification::Unknown => &mut self.unknown,
        };
        *counter += 1;
        self.results.push(result);
    }

    pub(crate) fn record_load_failure(&mut self, entry: EntryId, path: String, error: LoadError) {
        self.load_failures.push(LoadFailure { entry, path, error });
    }

    pub fn registered_file_count(&self) -> usize {
        self.registered_file_count
    }

    pub fn passed_test_count(&self) -> usize {
        self.passed
    }

    pub fn failed_test_count(&self) -> usize {
        self.failed
    }

    pub fn skipped_test_count(&self) -> usize {
        self.skipped
    }

    pub fn informal_test_count(&self) -> usize {
        self.informal
    }

    pub fn conflicted_test_count(&self) -> usize {
        self.conflicted
    }

    pub fn unknown_test_count(&self) -> usize {
        self.unknown
    }

    pub fn load_failure_count(&self) -> usize {
        self.load_failures.len()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Results that must be surfaced as failures: failed, conflicted and
    /// unknown, in recording order.
    pub fn iter_failed_results(&self) -> impl Iterator<Item = &TestResult> + '_ {
        self.results
            .iter()
            .filter(|r| r.is_failed() || r.is_conflicted() || r.is_unknown())
    }

    pub fn iter_informal_results(&self) -> impl Iterator<Item = &TestResult> + '_ {
        self.results.iter().filter(|r| r.is_informal())
    }

    pub fn iter_load_failures(&self) -> impl Iterator<Item = &LoadFailure> + '_ {
        self.load_failures.iter()
    }

    /// Whether the run should be reported as successful to the process.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unknown == 0 && self.load_failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Verdict;
    use crate::result::{Failure, ResultBuilder};

    fn result(classification: Classification, index: usize) -> TestResult {
        let mut builder = ResultBuilder::new(EntryId(0), &format!("test_{}", index), false);
        match classification {
            Classification::Skipped => builder.skipped().unwrap(),
            Classification::Unknown => {}
            Classification::Conflicted => builder
                .conflicted(crate::modifier::Conflict::Duplicate("revert"))
                .unwrap(),
            other => {
                builder.start().unwrap();
                let verdict = if other == Classification::Failed {
                    Verdict::Fail(Failure::Reverted)
                } else {
                    Verdict::Pass
                };
                builder
                    .judged(
                        verdict,
                        other == Classification::Informal,
                        vec![],
                        Duration::ZERO,
                    )
                    .unwrap();
            }
        }
        builder.build(index, "test_file".into())
    }

    #[test]
    fn test_counters_follow_classifications() {
        let mut context = TestingContext::new();
        let classifications = [
            Classification::Passed,
            Classification::Passed,
            Classification::Failed,
            Classification::Skipped,
            Classification::Informal,
            Classification::Conflicted,
        ];
        for (index, classification) in classifications.into_iter().enumerate() {
            context.record_result(result(classification, index));
        }

        assert_eq!(context.passed_test_count(), 2);
        assert_eq!(context.failed_test_count(), 1);
        assert_eq!(context.skipped_test_count(), 1);
        assert_eq!(context.informal_test_count(), 1);
        assert_eq!(context.conflicted_test_count(), 1);
        assert_eq!(context.results().len(), 6);
        assert!(!context.is_success());
    }

    #[test]
    fn test_iterators_are_restartable_and_live() {
        let mut context = TestingContext::new();
        context.record_result(result(Classification::Failed, 0));
        assert_eq!(context.iter_failed_results().count(), 1);
        assert_eq!(context.iter_failed_results().count(), 1);

        context.record_result(result(Classification::Conflicted, 1));
        context.record_result(result(Classification::Informal, 2));
        let failed: Vec<_> = context
            .iter_failed_results()
            .map(|r| r.sequence_index())
            .collect();
        assert_eq!(failed, vec![0, 1]);
        assert_eq!(context.iter_informal_results().count(), 1);
    }

    #[test]
    fn test_load_failures_fail_the_run() {
        let mut context = TestingContext::new();
        context.record_result(result(Classification::Skipped, 0));
        assert!(context.is_success());

        context.record_load_failure(EntryId(1), "test_x".into(), LoadError::new("boom"));
        assert_eq!(context.iter_load_failures().count(), 1);
        assert!(!context.is_success());
    }

    #[test]
    fn test_unknown_results_fail_the_run() {
        let mut context = TestingContext::new();
        context.record_result(result(Classification::Unknown, 0));
        assert_eq!(context.unknown_test_count(), 1);
        assert!(!context.is_success());
    }
}
