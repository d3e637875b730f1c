pub mod config;
pub mod domain;
pub mod http;
pub mod mirror;
pub mod replication;
pub mod store;
pub mod version;
