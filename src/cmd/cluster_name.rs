use crate::cmd::{AppContext, ConnectionArgs};
use clap::Args;
use pg_admin::cli::cluster_identity::generate_cluster_name;
use pg_admin::cli::command_runner::ConnectionParams;

/// Print the replication cluster name derived from the database region
#[derive(Args)]
pub struct ClusterNameCommand {
    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

pub fn execute(ctx: &AppContext, cmd: &ClusterNameCommand) -> Result<(), anyhow::Error> {
    let name = generate_cluster_name(&ctx.runner, &ConnectionParams::from(&cmd.connection))?;
    println!("{}", name);

    Ok(())
}
