use crate::cmd::{AppContext, ConnectionArgs};
use clap::Args;
use pg_admin::cli::command_runner::ConnectionParams;
use pg_admin::cli::maintenance::{GcOptions, MaintenanceRunner};

/// Vacuum (and optionally reindex) a database
#[derive(Args)]
pub struct GcCommand {
    /// Start from the aggressive preset: full vacuum, analyze and reindex
    #[clap(long)]
    pub aggressive: bool,

    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub analyze: Option<bool>,

    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub full: Option<bool>,

    #[clap(long = "vacuum-verbose", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub vacuum_verbose: Option<bool>,

    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub reindex: Option<bool>,

    /// Only process this table
    #[clap(long)]
    pub table: Option<String>,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

impl From<&GcCommand> for GcOptions {
    fn from(cmd: &GcCommand) -> Self {
        GcOptions {
            aggressive: cmd.aggressive,
            analyze: cmd.analyze,
            full: cmd.full,
            verbose: cmd.vacuum_verbose,
            reindex: cmd.reindex,
            table: cmd.table.clone(),
        }
    }
}

pub fn execute(ctx: &AppContext, cmd: &GcCommand) -> Result<(), anyhow::Error> {
    let connection = ConnectionParams::from(&cmd.connection);
    let options = GcOptions::from(cmd);

    let maintenance = MaintenanceRunner::new(&ctx.runner);
    ctx.with_spinner("Vacuuming database", || maintenance.gc(&connection, &options))?;

    println!("- Maintenance finished");
    Ok(())
}
