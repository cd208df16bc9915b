pub mod adapters;
pub mod chain;
pub mod credentials;
pub mod error;
pub mod heuristic;
pub mod types;
