//! Fitness store implementations for gymcoach.

pub mod in_memory;
pub mod seed;

pub use in_memory::InMemoryStore;
pub use seed::FitnessData;
