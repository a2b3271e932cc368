pub mod gateway;
pub mod rest;

#[cfg(test)]
pub mod fake;

pub use gateway::*;
pub use rest::*;
