// Command handlers module
pub mod config;
pub mod console;
pub mod run;

// Re-exports for cleaner imports
pub use console::{Console, ConsoleCommand, Outcome, TargetSelector};
pub use run::execute as run;
