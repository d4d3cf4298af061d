// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod query;
pub mod retry;
pub mod routes;
pub mod scheduler;
pub mod server_repo;
pub mod sources;
pub mod version;
