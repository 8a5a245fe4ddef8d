//! Adapters for the domain ports: a simulated billing backend and event sinks.

pub mod events;
pub mod in_memory;
