use crate::cmd::AppContext;
use clap::Args;
use pg_admin::cli::server::{local_server_status, StatusReport};

/// Show whether the local server is running, and as what
#[derive(Args)]
pub struct StatusCommand {
    /// Print the status and appliance layout as JSON
    #[clap(long)]
    pub json: bool,
}

pub fn execute(ctx: &AppContext, cmd: &StatusCommand) -> Result<(), anyhow::Error> {
    let status = local_server_status(&ctx.config, &ctx.runner)?;

    if cmd.json {
        let report = StatusReport::new(&ctx.config, status)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Local database server: {}", status);
    }

    Ok(())
}
