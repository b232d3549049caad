// vacuumdb / reindexdb housekeeping

use crate::cli::command_runner::{CommandOutcome, CommandRunner, ConnectionParams, Invocation};
use crate::errors::{PgAdminError, Result};
use log::info;

/// A named bundle of vacuum/reindex defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcPreset {
    pub analyze: bool,
    pub full: bool,
    pub verbose: bool,
    pub reindex: bool,
}

pub const LIGHT: GcPreset = GcPreset {
    analyze: false,
    full: false,
    verbose: false,
    reindex: false,
};

pub const AGGRESSIVE: GcPreset = GcPreset {
    analyze: true,
    full: true,
    verbose: false,
    reindex: true,
};

/// Per call choices. `None` means "whatever the preset says".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcOptions {
    pub aggressive: bool,
    pub analyze: Option<bool>,
    pub full: Option<bool>,
    pub verbose: Option<bool>,
    pub reindex: Option<bool>,
    pub table: Option<String>,
}

impl GcOptions {
    pub fn preset(&self) -> GcPreset {
        if self.aggressive {
            AGGRESSIVE
        } else {
            LIGHT
        }
    }

    /// The preset with every explicit override applied on top
    pub fn resolve(&self) -> GcPreset {
        let preset = self.preset();
        GcPreset {
            analyze: self.analyze.unwrap_or(preset.analyze),
            full: self.full.unwrap_or(preset.full),
            verbose: self.verbose.unwrap_or(preset.verbose),
            reindex: self.reindex.unwrap_or(preset.reindex),
        }
    }
}

pub struct MaintenanceRunner<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> MaintenanceRunner<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        MaintenanceRunner { runner }
    }

    /// Vacuums, then reindexes if asked to. A failed vacuum does not stop
    /// the reindex from being attempted; the first failure is returned.
    pub fn gc(&self, connection: &ConnectionParams, options: &GcOptions) -> Result<()> {
        if connection.database().is_none() {
            return Err(PgAdminError::configuration("vacuum requires a database name"));
        }

        let plan = options.resolve();
        let table = options.table.as_deref();

        let vacuum = self.vacuum(connection, &plan, table).map(log_output);
        let reindex = if plan.reindex {
            Some(self.reindex(connection, table).map(log_output))
        } else {
            None
        };

        vacuum?;
        reindex.transpose()?;
        Ok(())
    }

    pub fn vacuum(
        &self,
        connection: &ConnectionParams,
        plan: &GcPreset,
        table: Option<&str>,
    ) -> Result<CommandOutcome> {
        let mut invocation = Invocation::new("vacuumdb").connection(connection);
        if plan.analyze {
            invocation = invocation.switch("analyze");
        }
        if plan.full {
            invocation = invocation.switch("full");
        }
        if plan.verbose {
            invocation = invocation.switch("verbose");
        }
        if let Some(table) = table {
            invocation = invocation.valued("table", table);
        }
        self.runner.run(&invocation)
    }

    pub fn reindex(
        &self,
        connection: &ConnectionParams,
        table: Option<&str>,
    ) -> Result<CommandOutcome> {
        let mut invocation = Invocation::new("reindexdb").connection(connection);
        if let Some(table) = table {
            invocation = invocation.valued("table", table);
        }
        self.runner.run(&invocation)
    }
}

fn log_output(outcome: CommandOutcome) {
    let output = outcome.stdout.trim();
    if !output.is_empty() {
        info!("Output... {}", output);
    }
}
