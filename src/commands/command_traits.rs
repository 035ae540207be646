//! Command pattern interfaces
//!
//! Each CLI operation is a `Command`; the factory picks one from the
//! parsed arguments.

use crate::errors::PipelineResult;

/// An executable CLI operation
pub trait Command {
    fn execute(&self) -> PipelineResult<()>;
}

/// Builds the command selected by the CLI arguments
pub trait CommandFactory {
    fn create_command(&self, args: &clap::ArgMatches) -> PipelineResult<Box<dyn Command>>;
}
