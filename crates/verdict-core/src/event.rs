//! Progress events and their dispatch
//!
//! The engine publishes one event per milestone. Handlers are registered per
//! event kind and run synchronously, in registration order, before
//! `publish` returns.

use crate::context::TestingContext;
use crate::discovery::LoadedFile;
use crate::error::{EngineError, EngineResult, HandlerError};
use crate::result::TestResult;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FileRegistrationDone,
    FileLoadDone,
    TestDone,
    FileTestingDone,
    TestingEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::FileRegistrationDone,
        EventKind::FileLoadDone,
        EventKind::TestDone,
        EventKind::FileTestingDone,
        EventKind::TestingEnd,
    ];
}

/// Snapshot of engine state at a milestone.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// All files are registered.
    FileRegistrationDone { context: &'a TestingContext },
    /// A file was loaded, or failed to load.
    FileLoadDone { file: LoadedFile<'a> },
    TestDone {
        result: &'a TestResult,
        file: LoadedFile<'a>,
    },
    /// Every unit of a file is done.
    FileTestingDone { file: LoadedFile<'a> },
    TestingEnd { context: &'a TestingContext },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::FileRegistrationDone { .. } => EventKind::FileRegistrationDone,
            Event::FileLoadDone { .. } => EventKind::FileLoadDone,
            Event::TestDone { .. } => EventKind::TestDone,
            Event::FileTestingDone { .. } => EventKind::FileTestingDone,
            Event::TestingEnd { .. } => EventKind::TestingEnd,
        }
    }
}

/// Event subscriber
pub type Handler = Box<dyn FnMut(&Event<'_>) -> Result<(), HandlerError>>;

/// Routes events to the handlers registered for their kind.
#[derive(Default)]
pub struct EventHandlerManager {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl EventHandlerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: FnMut(&Event<'_>) -> Result<(), HandlerError> + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
        self
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Run every handler registered for the event's kind.
    ///
    /// Stops at the first handler error and returns it.
    pub fn publish(&mut self, event: &Event<'_>) -> EngineResult<()> {
        let kind = event.kind();
        if let Some(handlers) = self.handlers.get_mut(&kind) {
            for handler in handlers.iter_mut() {
                handler(event).map_err(|source| EngineError::Handler { kind, source })?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventHandlerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        counts.sort_by_key(|(kind, _)| *kind as u8);
        f.debug_struct("EventHandlerManager")
            .field("handlers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_handlers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = EventHandlerManager::new();

        for label in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            manager.register(EventKind::TestingEnd, move |_| {
                log.borrow_mut().push(label);
                Ok(())
            });
        }

        let context = TestingContext::new();
        manager
            .publish(&Event::TestingEnd { context: &context })
            .unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_only_matching_kind_is_dispatched() {
        let calls = Rc::new(RefCell::new(0));
        let mut manager = EventHandlerManager::new();
        let counter = Rc::clone(&calls);
        manager.register(EventKind::FileRegistrationDone, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        let context = TestingContext::new();
        manager
            .publish(&Event::TestingEnd { context: &context })
            .unwrap();
        assert_eq!(*calls.borrow(), 0);
        manager
            .publish(&Event::FileRegistrationDone { context: &context })
            .unwrap();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_handler_errors_propagate() {
        let later = Rc::new(RefCell::new(false));
        let mut manager = EventHandlerManager::new();
        manager.register(EventKind::TestingEnd, |_| Err("sink closed".into()));
        let flag = Rc::clone(&later);
        manager.register(EventKind::TestingEnd, move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        let context = TestingContext::new();
        let error = manager
            .publish(&Event::TestingEnd { context: &context })
            .unwrap_err();
        assert!(matches!(
            error,
            EngineError::Handler {
                kind: EventKind::TestingEnd,
                ..
            }
        ));
        assert!(!*later.borrow());
    }
}
