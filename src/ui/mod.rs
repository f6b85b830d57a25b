// UI and formatting module

pub mod energy_table;

// Re-export commonly used items for cleaner imports
pub use energy_table::{format_energy, render_energy_table};
