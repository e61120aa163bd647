pub mod astar;
pub mod centralized;
pub mod codec;
pub mod conflict;
pub mod config;
pub mod constraint;
pub mod decentralized;
pub mod grid;
pub mod highlevel;
pub mod path;
pub mod problem;
pub mod result;
pub mod serial;
pub mod stats;
pub mod transport;
pub mod wire;
