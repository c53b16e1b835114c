pub mod autogen;
pub mod builder;

pub use builder::{build, BuildCache, BuildError, BuildOutcome};
