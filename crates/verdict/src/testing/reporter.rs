//! Test reporter - render progress events as a tree with a closing summary

use crate::testing::output::OutputWriter;
use colored::{Color, Colorize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{self, Write};
use std::rc::Rc;
use verdict_core::{
    Classification, DiscoveryTree, EntryId, Event, EventHandlerManager, EventKind, LoadFailure,
    TestResult, TestingContext,
};

const COLOR_PASS: Color = Color::Green;
const COLOR_FAIL: Color = Color::Red;
const COLOR_SKIP: Color = Color::Yellow;
const COLOR_UNKNOWN: Color = Color::Magenta;

/// Human readable reporter.
///
/// Each directory and file is drawn once, the first time something below it
/// is reported.
pub struct DefaultEventFormatter<W: Write> {
    output: OutputWriter<W>,
    rendered_entries: HashSet<EntryId>,
    /// Colorize keywords and summary counts
    color: bool,
    /// Only print the closing section
    quiet: bool,
}

impl<W: Write + 'static> DefaultEventFormatter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            output: OutputWriter::new(inner),
            rendered_entries: HashSet::new(),
            color: true,
            quiet: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Subscribe to every event kind. The returned handle shares the
    /// formatter with the registered handlers.
    pub fn install(self, manager: &mut EventHandlerManager) -> Rc<RefCell<Self>> {
        let formatter = Rc::new(RefCell::new(self));
        for kind in EventKind::ALL {
            let formatter = Rc::clone(&formatter);
            manager.register(kind, move |event| Ok(formatter.borrow_mut().handle(event)?));
        }
        formatter
    }

    pub fn output(&self) -> &OutputWriter<W> {
        &self.output
    }

    pub fn handle(&mut self, event: &Event<'_>) -> io::Result<()> {
        match event {
            Event::FileRegistrationDone { context } => self.file_registration_done(context),
            Event::FileLoadDone { file } => {
                if self.quiet || !file.is_loaded_with_failure() {
                    return Ok(());
                }
                let name = self.paint(file.name(), COLOR_FAIL);
                let buffer = self.render_file(file.tree(), file.entry(), Some(name.as_str()));
                self.output.write_line(&buffer)?;
                Ok(())
            }
            Event::TestDone { result, file } => {
                if self.quiet {
                    return Ok(());
                }
                self.test_done(file.tree(), file.entry(), result)
            }
            Event::FileTestingDone { file } => {
                if self.quiet {
                    return Ok(());
                }
                let buffer = self.render_file(file.tree(), file.entry(), None);
                self.output.write_line(&buffer)?;
                Ok(())
            }
            Event::TestingEnd { context } => self.testing_end(context),
        }
    }

    fn file_registration_done(&mut self, context: &TestingContext) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.output.write_line(&format!(
            "Collected {} test file(s).",
            context.registered_file_count()
        ))?;
        self.output.write_break_line()?;
        Ok(())
    }

    fn test_done(
        &mut self,
        tree: &DiscoveryTree,
        entry: EntryId,
        result: &TestResult,
    ) -> io::Result<()> {
        let mut buffer = self.render_file(tree, entry, None);
        let (keyword, color) = match result.classification() {
            Classification::Skipped => ('S', COLOR_SKIP),
            Classification::Conflicted => ('C', COLOR_FAIL),
            Classification::Informal => ('I', COLOR_PASS),
            Classification::Passed => ('P', COLOR_PASS),
            Classification::Failed => ('F', COLOR_FAIL),
            Classification::Unknown => ('?', COLOR_UNKNOWN),
        };
        let text = format!("{} {}{}", keyword, result.case(), annotations(result));
        tree.render_case_into(
            entry,
            &mut buffer,
            &self.paint(&text, color),
            result.is_last_in_group(),
        );
        self.output.write_line(&buffer)?;
        Ok(())
    }

    fn testing_end(&mut self, context: &TestingContext) -> io::Result<()> {
        self.output.write_break_line()?;

        for failure in context.iter_load_failures() {
            self.write_load_failure(failure)?;
        }
        for result in context.iter_failed_results() {
            self.write_result_failing(result)?;
        }

        let failed = context.failed_test_count();
        let mut failed_part = format!("{} failed", failed);
        if failed > 0 {
            failed_part = self.paint(&failed_part, COLOR_FAIL);
        } else {
            for result in context.iter_informal_results() {
                self.write_result_informal(result)?;
            }
        }

        let skipped = context.skipped_test_count();
        let mut skipped_part = format!("{} skipped", skipped);
        if skipped > 0 {
            skipped_part = self.paint(&skipped_part, COLOR_SKIP);
        }

        let passed = context.passed_test_count();
        let mut passed_part = format!("{} passed", passed);
        if passed > 0 {
            passed_part = self.paint(&passed_part, COLOR_PASS);
        }

        let mut summary = format!("{} | {} | {}", failed_part, skipped_part, passed_part);
        let load_failures = context.load_failure_count();
        if load_failures > 0 {
            summary.push_str(&self.paint(
                &format!(" | {} files failed to load", load_failures),
                COLOR_FAIL,
            ));
        }
        self.output.write(&summary)?;
        self.output.end_line()
    }

    fn write_load_failure(&mut self, failure: &LoadFailure) -> io::Result<()> {
        let header = self.paint("Failed to load", COLOR_FAIL);
        self.output
            .write_line(&format!("{} {}", header, failure.path))?;
        self.output.write_line(failure.error.message())?;
        self.output.write_break_line()?;
        Ok(())
    }

    fn write_result_failing(&mut self, result: &TestResult) -> io::Result<()> {
        let header = format!("{}:{}{}", result.path(), result.case(), annotations(result));
        let header = self.paint(&header, COLOR_FAIL);
        self.output.write_line(&header)?;
        if let Some(reason) = failure_text(result) {
            self.output.write_line(&reason)?;
        }
        self.write_notes(result)?;
        self.output.write_break_line()?;
        Ok(())
    }

    fn write_result_informal(&mut self, result: &TestResult) -> io::Result<()> {
        let header = format!("{}:{} (informal)", result.path(), result.case());
        let header = self.paint(&header, COLOR_PASS);
        self.output.write_line(&header)?;
        self.write_notes(result)?;
        self.output.write_break_line()?;
        Ok(())
    }

    fn write_notes(&mut self, result: &TestResult) -> io::Result<()> {
        for note in result.notes() {
            self.output.write_line(&format!("note: {}", note))?;
        }
        Ok(())
    }

    /// Render the not yet rendered ancestors of `entry` and `entry` itself.
    fn render_file(&mut self, tree: &DiscoveryTree, entry: EntryId, name: Option<&str>) -> String {
        let mut buffer = String::new();
        if self.rendered_entries.contains(&entry) {
            return buffer;
        }
        for parent in tree.iter_parents(entry) {
            if self.rendered_entries.insert(parent) {
                tree.render_into(parent, &mut buffer, None);
            }
        }
        tree.render_into(entry, &mut buffer, name);
        self.rendered_entries.insert(entry);
        buffer
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Modifier annotations as a ` [a, b]` suffix, empty without modifiers.
pub(crate) fn annotations(result: &TestResult) -> String {
    let annotations = result.modifier_annotations();
    if annotations.is_empty() {
        String::new()
    } else {
        format!(" [{}]", annotations.join(", "))
    }
}

/// Why a result is surfaced as failing, if it is.
pub(crate) fn failure_text(result: &TestResult) -> Option<String> {
    if let Some(failure) = result.failure() {
        return Some(failure.to_string());
    }
    if let Some(conflict) = result.conflict() {
        return Some(format!("Conflicting modifiers: {}", conflict));
    }
    if result.is_unknown() {
        return Some("Result was never classified".to_string());
    }
    None
}
