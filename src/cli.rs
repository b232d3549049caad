pub mod backup;
pub mod cancellation;
pub mod cluster_identity;
pub mod command_runner;
pub mod drain;
pub mod maintenance;
pub mod replication_config;
pub mod restore;
pub mod server;
pub mod sql;
