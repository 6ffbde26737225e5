//! Reporting for verdict test runs
//!
//! Event subscribers that turn engine progress into human readable or
//! machine readable output.

pub mod json;
pub mod output;
pub mod reporter;

pub use json::JsonEventWriter;
pub use output::OutputWriter;
pub use reporter::DefaultEventFormatter;
