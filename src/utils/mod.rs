//! Utility modules: address input and logging setup

pub mod file_input;
pub mod logging;

pub use file_input::{AddressSource, InMemorySource, LineIndex, SourceOpener};
pub use logging::init_logging;
