//! # Telecare Core
//!
//! Domain types and the pure scheduling rules of the booking service:
//! weekly availability templates, slot generation, slot validation and the
//! appointment state machine. Nothing in this crate performs I/O; callers pass
//! in the state they read and the current instant.

pub mod errors;
pub mod models;
pub mod scheduling;
