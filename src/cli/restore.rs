// Recreating a database and loading a backup archive into it

use crate::cli::command_runner::{CommandRunner, ConnectionParams, Invocation};
use crate::cli::drain::{DrainOutcome, LogicalReplicationDrain};
use crate::cli::sql::quote_identifier;
use crate::errors::{PgAdminError, Result};
use log::{info, warn};
use std::path::PathBuf;

/// Database psql connects to while the target is dropped and created
pub const ADMIN_DATABASE: &str = "postgres";
/// Owner of the new database when the request names no user
pub const DEFAULT_OWNER: &str = "root";

#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub connection: ConnectionParams,
    pub source: PathBuf,
}

pub struct RestoreEngine<'a> {
    runner: &'a dyn CommandRunner,
    drain: LogicalReplicationDrain<'a>,
}

impl<'a> RestoreEngine<'a> {
    pub fn new(runner: &'a dyn CommandRunner, drain: LogicalReplicationDrain<'a>) -> Self {
        RestoreEngine { runner, drain }
    }

    /// Replaces the target database with the contents of `request.source`.
    ///
    /// Destructive: whatever the target held is gone once this returns,
    /// successfully or not, unless the operator aborted before the drop.
    pub fn restore(&self, request: &RestoreRequest) -> Result<PathBuf> {
        let dbname = request
            .connection
            .database()
            .ok_or_else(|| PgAdminError::configuration("restore requires a database name"))?
            .to_owned();

        match self.drain.drain(&request.connection)? {
            DrainOutcome::Cancelled => return Err(PgAdminError::Cancelled),
            DrainOutcome::TimedOut {
                remaining_connections,
                ..
            } => warn!(
                "Restoring {} with {} pglogical connections still open",
                dbname, remaining_connections
            ),
            outcome => info!("pglogical drain finished: {:?}", outcome),
        }

        if self.drain.cancellation().is_cancelled() {
            warn!("Restore of {} abandoned before the database was dropped", dbname);
            return Err(PgAdminError::Cancelled);
        }

        self.recreate_database(&request.connection, &dbname)?;

        let invocation = Invocation::new("pg_restore")
            .connection(&request.connection)
            .switch("verbose")
            .arg(&request.source.to_string_lossy());
        self.runner.run(&invocation)?;

        info!(
            "Restored {} into database {}",
            request.source.display(),
            dbname
        );
        Ok(request.source.clone())
    }

    fn recreate_database(&self, connection: &ConnectionParams, dbname: &str) -> Result<()> {
        let admin = connection.with_database(ADMIN_DATABASE);
        let owner = quote_identifier(connection.username.as_deref().unwrap_or(DEFAULT_OWNER));
        let dbname = quote_identifier(dbname);

        let statements = [
            format!("DROP DATABASE IF EXISTS {}", dbname),
            format!(
                "CREATE DATABASE {} WITH OWNER = {} ENCODING = 'UTF8'",
                dbname, owner
            ),
        ];
        for sql in &statements {
            let invocation = Invocation::new("psql")
                .connection(&admin)
                .valued("command", sql);
            self.runner.run(&invocation)?;
        }
        Ok(())
    }
}
