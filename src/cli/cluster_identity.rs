// Naming of the replication cluster from the region encoded in the
// database's id sequence

use crate::cli::command_runner::{CommandRunner, ConnectionParams, Invocation};
use crate::errors::{PgAdminError, Result};
use log::info;
use std::fmt;

pub const REGION_SEQUENCE: &str = "miq_databases_id_seq";
pub const REGION_MULTIPLIER: u64 = 1_000_000_000_000;

// psql: "connection to the server went bad"
const PSQL_CONNECTION_FAILURE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterName(String);

impl ClusterName {
    /// Same sequence value, same name.
    pub fn from_sequence_value(last_value: u64) -> Self {
        let region = last_value / REGION_MULTIPLIER;
        ClusterName(format!("miq_region_{}_cluster", region))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ClusterName> for String {
    fn from(name: ClusterName) -> String {
        name.0
    }
}

pub fn generate_cluster_name(
    runner: &dyn CommandRunner,
    connection: &ConnectionParams,
) -> Result<ClusterName> {
    if connection.database().is_none() {
        return Err(PgAdminError::configuration(
            "generating a cluster name requires a database name",
        ));
    }

    let invocation = Invocation::new("psql")
        .connection(connection)
        .switch("tuples-only")
        .switch("no-align")
        .valued(
            "command",
            &format!("SELECT last_value FROM {}", REGION_SEQUENCE),
        );

    let outcome = runner.run(&invocation).map_err(|err| match err {
        PgAdminError::ExternalCommand {
            exit_code: Some(PSQL_CONNECTION_FAILURE),
            stderr,
            ..
        } => PgAdminError::Connection(stderr),
        other => other,
    })?;

    let raw = outcome.stdout.trim();
    let last_value: u64 = raw
        .replace('_', "")
        .parse()
        .map_err(|_| PgAdminError::UnexpectedOutput {
            command: "psql".to_owned(),
            output: raw.to_owned(),
        })?;

    let name = ClusterName::from_sequence_value(last_value);
    info!("Generated cluster name {} from sequence value {}", name, last_value);
    Ok(name)
}
