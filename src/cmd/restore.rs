use crate::cmd::{AppContext, ConnectionArgs};
use clap::Args;
use pg_admin::cli::command_runner::ConnectionParams;
use pg_admin::cli::drain::LogicalReplicationDrain;
use pg_admin::cli::restore::{RestoreEngine, RestoreRequest};
use std::path::PathBuf;

/// Drop and recreate a database, then load a backup archive into it
#[derive(Args)]
pub struct RestoreCommand {
    /// Archive to load
    #[clap(short, long)]
    pub file: PathBuf,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

pub fn execute(ctx: &AppContext, cmd: &RestoreCommand) -> Result<(), anyhow::Error> {
    let request = RestoreRequest {
        connection: ConnectionParams::from(&cmd.connection),
        source: cmd.file.clone(),
    };

    let drain = LogicalReplicationDrain::new(&ctx.runner, &ctx.sleep, &ctx.config.drain)
        .with_cancellation(ctx.cancellation.clone());
    let engine = RestoreEngine::new(&ctx.runner, drain);
    let source = ctx.with_spinner("Restoring database", || engine.restore(&request))?;

    println!("- Restored {}", source.display());
    Ok(())
}
