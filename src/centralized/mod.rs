//! Centralized mode: one coordinator rank owns OPEN, the remaining ranks
//! are stateless workers (spec.md S4.4/S4.5).

pub mod coordinator;
pub mod worker;
