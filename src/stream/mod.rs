//! Async views over reader output

mod fragments;
mod pairs;

pub use fragments::FragmentStream;
pub use pairs::{TaskPairs, TaskPairsExt};
