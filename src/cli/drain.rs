// Detaching pglogical from a database before it is recreated

use crate::cli::cancellation::{Cancellation, Pause};
use crate::cli::command_runner::{CommandRunner, ConnectionParams, Invocation};
use crate::config::DrainSettings;
use crate::errors::{PgAdminError, Result};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use std::time::Duration;

lazy_static! {
    static ref ROW_COUNT_FOOTER: Regex = Regex::new(r"(?m)^\((\d+) rows?\)").unwrap();
}

pub const MANAGER_APPLICATION_PREFIX: &str = "pglogical manager";

const DROP_SUBSCRIPTIONS_SQL: &str = "SELECT drop_subscription \
     FROM pglogical.subscription subs, \
     LATERAL pglogical.drop_subscription(subs.sub_name)";

const DROP_EXTENSION_SQL: &str = "DROP EXTENSION pglogical CASCADE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiescePollState {
    pub remaining_attempts: u32,
    pub connection_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Unloading,
    Waiting(QuiescePollState),
    Drained,
    Failed,
}

/// How the drain ended. Only `Cancelled` should stop a caller; the rest are
/// informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Drained { attempts: u32 },
    TimedOut { attempts: u32, remaining_connections: u64 },
    /// pglogical could not be unloaded, usually because it was never there
    Failed,
    Cancelled,
}

pub struct LogicalReplicationDrain<'a> {
    runner: &'a dyn CommandRunner,
    pause: &'a dyn Pause,
    cancellation: Cancellation,
    interval: Duration,
    max_attempts: u32,
}

impl<'a> LogicalReplicationDrain<'a> {
    pub fn new(runner: &'a dyn CommandRunner, pause: &'a dyn Pause, settings: &DrainSettings) -> Self {
        LogicalReplicationDrain {
            runner,
            pause,
            cancellation: Cancellation::new(),
            interval: settings.poll_interval(),
            max_attempts: settings.max_attempts,
        }
    }

    /// Watch `cancellation` between steps, so an abort that kills a psql
    /// run ends the drain as `Cancelled` rather than `Failed`.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Drops subscriptions and the extension, then waits (bounded) for the
    /// pglogical manager connections to go away.
    ///
    /// Failing tool invocations are logged and reported as
    /// `DrainOutcome::Failed`; only errors that are not tool failures
    /// propagate.
    pub fn drain(&self, connection: &ConnectionParams) -> Result<DrainOutcome> {
        let mut state = DrainState::Unloading;
        let mut attempts = 0;

        loop {
            if self.cancellation.is_cancelled() {
                warn!("pglogical drain abandoned by operator");
                return Ok(DrainOutcome::Cancelled);
            }

            state = match state {
                DrainState::Unloading => match self.unload(connection) {
                    Ok(()) => DrainState::Waiting(QuiescePollState {
                        remaining_attempts: self.max_attempts,
                        connection_count: 0,
                    }),
                    Err(err) => absorb(err)?,
                },
                DrainState::Waiting(poll) if poll.remaining_attempts == 0 => {
                    warn!(
                        "Gave up waiting on {} pglogical connections after {} attempts",
                        poll.connection_count, attempts
                    );
                    return Ok(DrainOutcome::TimedOut {
                        attempts,
                        remaining_connections: poll.connection_count,
                    });
                }
                DrainState::Waiting(poll) => match self.manager_connections(connection) {
                    Err(err) => absorb(err)?,
                    Ok(0) => {
                        attempts += 1;
                        DrainState::Drained
                    }
                    Ok(count) => {
                        attempts += 1;
                        info!("Waiting on {} pglogical connections to close...", count);

                        let remaining_attempts = poll.remaining_attempts - 1;
                        if remaining_attempts > 0 {
                            match self.pause.pause(self.interval) {
                                Ok(()) => {}
                                Err(PgAdminError::Cancelled) => {
                                    warn!("pglogical drain abandoned by operator");
                                    return Ok(DrainOutcome::Cancelled);
                                }
                                Err(err) => return Err(err),
                            }
                        }
                        DrainState::Waiting(QuiescePollState {
                            remaining_attempts,
                            connection_count: count,
                        })
                    }
                },
                DrainState::Drained => return Ok(DrainOutcome::Drained { attempts }),
                DrainState::Failed => {
                    info!("Ignoring failure to remove pglogical before restore ...");
                    return Ok(DrainOutcome::Failed);
                }
            };
        }
    }

    fn unload(&self, connection: &ConnectionParams) -> Result<()> {
        self.psql(connection, DROP_SUBSCRIPTIONS_SQL)?;
        self.psql(connection, DROP_EXTENSION_SQL)?;
        Ok(())
    }

    fn manager_connections(&self, connection: &ConnectionParams) -> Result<u64> {
        let sql = format!(
            "SELECT application_name FROM pg_stat_activity WHERE application_name LIKE '{}%'",
            MANAGER_APPLICATION_PREFIX
        );
        let output = self.psql(connection, &sql)?;
        Ok(parse_row_count(&output))
    }

    fn psql(&self, connection: &ConnectionParams, sql: &str) -> Result<String> {
        let invocation = Invocation::new("psql")
            .connection(connection)
            .valued("command", sql);
        Ok(self.runner.run(&invocation)?.stdout)
    }
}

fn absorb(err: PgAdminError) -> Result<DrainState> {
    match err {
        PgAdminError::ExternalCommand { .. } => {
            info!("pglogical cleanup failed: {}", err);
            Ok(DrainState::Failed)
        }
        other => Err(other),
    }
}

/// Row count from psql's "(N rows)" footer; no footer means no rows.
pub fn parse_row_count(output: &str) -> u64 {
    ROW_COUNT_FOOTER
        .captures(output)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}
