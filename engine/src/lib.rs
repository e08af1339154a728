pub mod types;
pub mod mapgen;
pub mod distance;
pub mod setup;
pub mod engine;
pub mod moves;
pub mod queries;
#[cfg(test)]
mod tests;

pub use types::*;
pub use queries::*;
