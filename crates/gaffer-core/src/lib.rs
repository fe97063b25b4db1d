// Shared foundations for the gaffer workspace: the snapshot data model,
// configuration loading, data providers and the snapshot cache.

pub mod cache;
pub mod config;
pub mod model;
pub mod provider;
