pub mod calculator;
pub mod commands;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod parser;
pub mod repl;

pub use calculator::aggregate::{aggregate, calculate};
pub use calculator::grade::resolve;
pub use calculator::session::Session;
pub use calculator::types::{CgpaResult, CourseEntry, RawRow};
pub use error::CgpaError;
