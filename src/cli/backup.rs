// Physical (cluster wide) backups with pg_basebackup

use crate::cli::command_runner::{CommandRunner, ConnectionParams, Invocation};
use crate::errors::{PgAdminError, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Name pg_basebackup gives a compressed tar of the main tablespace
pub const BASE_BACKUP_FILE: &str = "base.tar.gz";

#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub connection: ConnectionParams,
    pub destination: PathBuf,
}

pub struct BackupEngine<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> BackupEngine<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        BackupEngine { runner }
    }

    /// Streams a base backup next to `destination` and moves it into place.
    pub fn backup(&self, request: &BackupRequest) -> Result<PathBuf> {
        let directory = backup_directory(&request.destination)?;

        // pg_basebackup does not connect to a specific database
        let connection = request.connection.without_database();

        let invocation = Invocation::new("pg_basebackup")
            .connection(&connection)
            .switch("z")
            .valued("format", "t")
            .valued("xlog-method", "fetch")
            .valued("pgdata", &directory.to_string_lossy());
        self.runner.run(&invocation)?;

        fs::rename(directory.join(BASE_BACKUP_FILE), &request.destination)?;
        info!("Backup written to {}", request.destination.display());

        Ok(request.destination.clone())
    }
}

fn backup_directory(destination: &Path) -> Result<&Path> {
    if destination.file_name().is_none() {
        return Err(PgAdminError::configuration(format!(
            "backup destination {} is not a file path",
            destination.display()
        )));
    }

    let directory = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if !directory.is_dir() {
        return Err(PgAdminError::configuration(format!(
            "backup directory {} does not exist",
            directory.display()
        )));
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command_runner::{CommandOutcome, MockCommandRunner};

    fn request(destination: PathBuf) -> BackupRequest {
        BackupRequest {
            connection: ConnectionParams {
                host: Some("localhost".into()),
                dbname: Some("vmdb_production".into()),
                username: Some("root".into()),
                password: Some("smartvm".into()),
                ..Default::default()
            },
            destination,
        }
    }

    #[test]
    fn backup_drops_database_and_renames_archive() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("nightly.tar.gz");
        let pgdata = dir.path().to_string_lossy().into_owned();
        let produced = dir.path().join(BASE_BACKUP_FILE);

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |inv| {
                inv.program() == "pg_basebackup"
                    && !inv.has_flag("dbname")
                    && !inv.args().iter().any(|a| a.contains("vmdb_production"))
                    && inv.has_flag("z")
                    && inv.flag_value("format") == Some("t")
                    && inv.flag_value("xlog-method") == Some("fetch")
                    && inv.flag_value("pgdata") == Some(pgdata.as_str())
                    && inv.flag_value("host") == Some("localhost")
                    && inv.has_flag("no-password")
            })
            .times(1)
            .returning(move |_| {
                fs::write(&produced, b"archive").unwrap();
                Ok(CommandOutcome::default())
            });

        let path = BackupEngine::new(&runner)
            .backup(&request(destination.clone()))
            .unwrap();

        assert_eq!(path, destination);
        assert_eq!(fs::read(&destination).unwrap(), b"archive");
        assert!(!dir.path().join(BASE_BACKUP_FILE).exists());
    }

    #[test]
    fn tool_failure_propagates_unchanged() {
        let dir = tempfile::tempdir().unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Err(PgAdminError::ExternalCommand {
                command: "pg_basebackup".into(),
                exit_code: Some(1),
                stderr: "could not connect".into(),
            })
        });

        let err = BackupEngine::new(&runner)
            .backup(&request(dir.path().join("backup.tar.gz")))
            .unwrap_err();

        match err {
            PgAdminError::ExternalCommand {
                command, exit_code, ..
            } => {
                assert_eq!(command, "pg_basebackup");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn missing_directory_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockCommandRunner::new();

        let err = BackupEngine::new(&runner)
            .backup(&request(dir.path().join("missing/backup.tar.gz")))
            .unwrap_err();

        assert!(matches!(err, PgAdminError::Configuration(_)));
    }
}
