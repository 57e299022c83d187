//! CLI command implementations

pub mod entries;
pub mod run;

pub use entries::{clear, list};
pub use run::execute as run;
