//! Administration of the PostgreSQL instance embedded in the appliance:
//! backups, restores, maintenance and replication bootstrap, all driven
//! through the stock PostgreSQL client tools.

pub mod cli;
pub mod config;
pub mod errors;

pub use errors::{PgAdminError, Result};
