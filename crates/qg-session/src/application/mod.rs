//! Application layer: projecting the event stream into game state.

pub mod projector;
