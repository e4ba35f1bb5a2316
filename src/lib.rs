// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod catalog;
pub mod content;
pub mod error;
pub mod highlight;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod stats;
pub mod ui;
