// State of the local PostgreSQL server and its data directory

use crate::cli::command_runner::{CommandRunner, ConnectionParams, Invocation};
use crate::cli::sql::quote_literal;
use crate::config::ApplianceConfig;
use crate::errors::{PgAdminError, Result};
use log::info;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const RECOVERY_MARKERS: [&str; 2] = ["recovery.conf", "standby.signal"];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Primary,
    Standby,
    Stopped,
    NotInitialized,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerStatus::Primary => write!(f, "running (primary)"),
            ServerStatus::Standby => write!(f, "running (standby)"),
            ServerStatus::Stopped => write!(f, "initialized and stopped"),
            ServerStatus::NotInitialized => write!(f, "not initialized"),
        }
    }
}

/// What `status --json` prints: the server state next to the appliance
/// layout it was judged against. Unset optional settings come out as null.
#[derive(Serialize, Debug, PartialEq)]
pub struct StatusReport<'a> {
    pub status: ServerStatus,
    pub description: String,
    pub service: &'a str,
    pub data_directory: &'a Path,
    pub mount_point: Option<&'a Path>,
    pub template_directory: Option<&'a Path>,
    pub package_name: Option<&'a str>,
    pub logical_volume: PathBuf,
}

impl<'a> StatusReport<'a> {
    pub fn new(config: &'a ApplianceConfig, status: ServerStatus) -> Result<Self> {
        Ok(StatusReport {
            status,
            description: status.to_string(),
            service: config.service_name()?,
            data_directory: config.data_directory()?,
            mount_point: config.mount_point().ok(),
            template_directory: config.template_directory().ok(),
            package_name: config.package_name().ok(),
            logical_volume: config.logical_volume_path(),
        })
    }
}

pub fn local_server_status(
    config: &ApplianceConfig,
    runner: &dyn CommandRunner,
) -> Result<ServerStatus> {
    let data_directory = config.data_directory()?;

    let status = if service_running(config.service_name()?, runner)? {
        if in_recovery(data_directory) {
            ServerStatus::Standby
        } else {
            ServerStatus::Primary
        }
    } else if initialized(data_directory)? {
        ServerStatus::Stopped
    } else {
        ServerStatus::NotInitialized
    };
    Ok(status)
}

/// `systemctl is-active` exits non-zero for anything but a running unit
pub fn service_running(service: &str, runner: &dyn CommandRunner) -> Result<bool> {
    let invocation = Invocation::new("systemctl").arg("is-active").arg(service);
    match runner.run(&invocation) {
        Ok(_) => Ok(true),
        Err(PgAdminError::ExternalCommand { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn initialized(data_directory: &Path) -> Result<bool> {
    if !data_directory.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(data_directory)?.next().is_some())
}

pub fn in_recovery(data_directory: &Path) -> bool {
    RECOVERY_MARKERS
        .iter()
        .any(|marker| data_directory.join(marker).exists())
}

/// Size in bytes reported by `pg_database_size`
pub fn database_size(runner: &dyn CommandRunner, connection: &ConnectionParams) -> Result<u64> {
    let dbname = connection
        .database()
        .ok_or_else(|| PgAdminError::configuration("database size requires a database name"))?;

    let invocation = Invocation::new("psql")
        .connection(connection)
        .valued("command", &format!("SELECT pg_database_size({});", quote_literal(dbname)));
    let output = runner.run(&invocation)?.stdout;

    let size: Option<u64> = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()))
        .and_then(|line| line.parse().ok());

    size.ok_or(PgAdminError::UnexpectedOutput {
            command: "psql".to_owned(),
            output,
        })
}

/// Leaves an empty data directory owned by the service account, ready for
/// initdb.
pub fn prepare_data_directory(config: &ApplianceConfig, runner: &dyn CommandRunner) -> Result<()> {
    let data_directory = config.data_directory()?;
    if !data_directory.is_dir() {
        fs::create_dir(data_directory)?;
    }

    let owner = format!("{0}:{0}", config.service_user);
    runner.run(
        &Invocation::new("chown")
            .switch("R")
            .arg(&owner)
            .arg(&data_directory.to_string_lossy()),
    )?;

    for entry in fs::read_dir(data_directory)? {
        let path = entry?.path();
        if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    info!("Prepared data directory {}", data_directory.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command_runner::{CommandOutcome, MockCommandRunner};
    use std::path::PathBuf;

    fn config(data_directory: PathBuf) -> ApplianceConfig {
        ApplianceConfig {
            data_directory: Some(data_directory),
            service_name: Some("postgresql".into()),
            ..Default::default()
        }
    }

    fn service(active: bool) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| inv.program() == "systemctl" && inv.positional() == ["is-active", "postgresql"])
            .returning(move |_| {
                if active {
                    Ok(CommandOutcome::with_stdout("active\n"))
                } else {
                    Err(PgAdminError::ExternalCommand {
                        command: "systemctl".into(),
                        exit_code: Some(3),
                        stderr: String::new(),
                    })
                }
            });
        runner
    }

    #[test]
    fn status_display_test() {
        assert_eq!(ServerStatus::Primary.to_string(), "running (primary)");
        assert_eq!(ServerStatus::Standby.to_string(), "running (standby)");
        assert_eq!(ServerStatus::Stopped.to_string(), "initialized and stopped");
        assert_eq!(ServerStatus::NotInitialized.to_string(), "not initialized");
    }

    #[test]
    fn running_primary_and_standby() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());

        assert_eq!(
            local_server_status(&config, &service(true)).unwrap(),
            ServerStatus::Primary
        );

        fs::write(dir.path().join("recovery.conf"), "standby_mode = 'on'\n").unwrap();
        assert_eq!(
            local_server_status(&config, &service(true)).unwrap(),
            ServerStatus::Standby
        );
    }

    #[test]
    fn stopped_servers() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().join("data"));

        assert_eq!(
            local_server_status(&config, &service(false)).unwrap(),
            ServerStatus::NotInitialized
        );

        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/PG_VERSION"), "13\n").unwrap();
        assert_eq!(
            local_server_status(&config, &service(false)).unwrap(),
            ServerStatus::Stopped
        );
    }

    #[test]
    fn status_requires_configuration() {
        let runner = MockCommandRunner::new();
        let err = local_server_status(&ApplianceConfig::default(), &runner).unwrap_err();
        assert!(matches!(err, PgAdminError::Configuration(_)));
    }

    #[test]
    fn database_size_test() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.flag_value("command") == Some("SELECT pg_database_size('vmdb_production');")
            })
            .returning(|_| {
                Ok(CommandOutcome::with_stdout(
                    " pg_database_size \n------------------\n         12345678\n(1 row)\n\n",
                ))
            });

        let connection = ConnectionParams {
            dbname: Some("vmdb_production".into()),
            ..Default::default()
        };
        assert_eq!(database_size(&runner, &connection).unwrap(), 12_345_678);
    }

    #[test]
    fn database_size_quotes_the_name() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| inv.flag_value("command") == Some("SELECT pg_database_size('vmdb''prod');"))
            .times(1)
            .returning(|_| Ok(CommandOutcome::with_stdout(" pg_database_size \n 8192\n(1 row)\n")));

        let connection = ConnectionParams {
            dbname: Some("vmdb'prod".into()),
            ..Default::default()
        };
        assert_eq!(database_size(&runner, &connection).unwrap(), 8192);
    }

    #[test]
    fn status_report_test() {
        let mut config = config(PathBuf::from("/var/lib/pgsql/data"));
        config.mount_point = Some(PathBuf::from("/var/lib/pgsql"));
        config.package_name = Some("postgresql-server".into());

        let report = StatusReport::new(&config, ServerStatus::Standby).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "standby");
        assert_eq!(json["description"], "running (standby)");
        assert_eq!(json["service"], "postgresql");
        assert_eq!(json["data_directory"], "/var/lib/pgsql/data");
        assert_eq!(json["mount_point"], "/var/lib/pgsql");
        assert_eq!(json["template_directory"], serde_json::Value::Null);
        assert_eq!(json["package_name"], "postgresql-server");
        assert_eq!(json["logical_volume"], "/dev/vg_data/lv_pg");
    }

    #[test]
    fn status_report_requires_data_directory() {
        let config = ApplianceConfig {
            service_name: Some("postgresql".into()),
            ..Default::default()
        };
        assert!(matches!(
            StatusReport::new(&config, ServerStatus::Stopped),
            Err(PgAdminError::Configuration(_))
        ));
    }

    #[test]
    fn database_size_rejects_garbage() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutcome::with_stdout("(0 rows)\n")));

        let connection = ConnectionParams {
            dbname: Some("vmdb_production".into()),
            ..Default::default()
        };
        assert!(matches!(
            database_size(&runner, &connection),
            Err(PgAdminError::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn prepare_data_directory_test() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(data.join("base/1")).unwrap();
        fs::write(data.join("PG_VERSION"), "13\n").unwrap();

        let expected = data.to_string_lossy().into_owned();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |inv| {
                inv.program() == "chown"
                    && inv.has_flag("R")
                    && inv.positional() == [String::from("postgres:postgres"), expected.clone()]
            })
            .times(1)
            .returning(|_| Ok(CommandOutcome::default()));

        prepare_data_directory(&config(data.clone()), &runner).unwrap();

        assert!(data.is_dir());
        assert_eq!(fs::read_dir(&data).unwrap().count(), 0);
    }

    #[test]
    fn prepare_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutcome::default()));

        prepare_data_directory(&config(data.clone()), &runner).unwrap();
        assert!(data.is_dir());
    }
}
