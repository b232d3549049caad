use crate::cmd::{AppContext, ConnectionArgs};
use clap::Args;
use pg_admin::cli::command_runner::ConnectionParams;
use pg_admin::cli::server::database_size;

/// Print the size of a database in bytes
#[derive(Args)]
pub struct DbSizeCommand {
    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

pub fn execute(ctx: &AppContext, cmd: &DbSizeCommand) -> Result<(), anyhow::Error> {
    let connection = ConnectionParams::from(&cmd.connection);
    let size = database_size(&ctx.runner, &connection)?;
    println!("{}", size);

    Ok(())
}
