pub mod controller;
pub mod heuristic;
pub mod random;
pub mod search;

pub use controller::{Controller, MoveReply, Personality};
pub use random::RandomController;
pub use search::{AiController, Search, SearchConfig, SearchStatus};
