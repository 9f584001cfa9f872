pub mod builtin;
pub mod host;
pub mod runner;
