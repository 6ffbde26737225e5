//! JSON event stream - one object per line, for tooling

use crate::testing::reporter::failure_text;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use verdict_core::{Event, EventHandlerManager, EventKind};

pub struct JsonEventWriter<W: Write> {
    inner: W,
}

impl<W: Write + 'static> JsonEventWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn install(self, manager: &mut EventHandlerManager) -> Rc<RefCell<Self>> {
        let writer = Rc::new(RefCell::new(self));
        for kind in EventKind::ALL {
            let writer = Rc::clone(&writer);
            manager.register(kind, move |event| Ok(writer.borrow_mut().handle(event)?));
        }
        writer
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn handle(&mut self, event: &Event<'_>) -> io::Result<()> {
        let record = to_json(event);
        writeln!(self.inner, "{}", record)?;
        self.inner.flush()
    }
}

/// JSON form of an event.
pub fn to_json(event: &Event<'_>) -> Value {
    match event {
        Event::FileRegistrationDone { context } => json!({
            "event": "file_registration_done",
            "file_count": context.registered_file_count(),
        }),
        Event::FileLoadDone { file } => json!({
            "event": "file_load_done",
            "file": file.path(),
            "loaded": !file.is_loaded_with_failure(),
            "error": file.load_error().map(|error| error.message()),
        }),
        Event::TestDone { result, .. } => json!({
            "event": "test_done",
            "file": result.path(),
            "case": result.case(),
            "classification": result.classification().name(),
            "sequence_index": result.sequence_index(),
            "is_last_in_group": result.is_last_in_group(),
            "modifiers": result.modifier_annotations(),
            "failure": failure_text(result),
            "notes": result.notes(),
            "duration_ms": result.duration().as_millis() as u64,
        }),
        Event::FileTestingDone { file } => json!({
            "event": "file_testing_done",
            "file": file.path(),
        }),
        Event::TestingEnd { context } => {
            let load_failures: Vec<_> = context
                .iter_load_failures()
                .map(|failure| {
                    json!({
                        "file": failure.path,
                        "error": failure.error.message(),
                    })
                })
                .collect();
            json!({
                "event": "testing_end",
                "passed": context.passed_test_count(),
                "failed": context.failed_test_count(),
                "skipped": context.skipped_test_count(),
                "informal": context.informal_test_count(),
                "conflicted": context.conflicted_test_count(),
                "unknown": context.unknown_test_count(),
                "load_failures": load_failures,
                "success": context.is_success(),
                "duration_ms": context.duration().as_millis() as u64,
            })
        }
    }
}
