// ABOUTME: Command module aggregator for the stratus CLI.
// ABOUTME: Re-exports the deploy and package command handlers.

mod artifacts;
mod deploy;
mod package;

pub use deploy::deploy;
pub use package::package;
