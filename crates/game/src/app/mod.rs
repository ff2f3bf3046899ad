pub(crate) mod bootstrap;
pub mod context;
pub(crate) mod loop_runner;
pub mod settings;
