//! Infrastructure layer - adapters implementing the application ports.

pub mod broker;
pub mod quotes;
