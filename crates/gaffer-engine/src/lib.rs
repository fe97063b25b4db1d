// Decision engine: expected points, squad and lineup optimization, transfer
// search, captaincy and chip timing. Every operation is a synchronous, pure
// function of a `Snapshot` and an `EngineConfig`.

pub mod captain;
pub mod chips;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod lineup;
pub mod points;
pub mod solver;
pub mod squad;
pub mod transfers;
pub mod value;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::Engine;
pub use error::{EngineError, Result};
