use crate::cmd::AppContext;
use clap::Args;
use pg_admin::cli::server::prepare_data_directory;

/// Empty the data directory and hand it to the service account for initdb
#[derive(Args)]
pub struct PrepDataDirCommand {}

pub fn execute(ctx: &AppContext, _cmd: &PrepDataDirCommand) -> Result<(), anyhow::Error> {
    prepare_data_directory(&ctx.config, &ctx.runner)?;
    println!(
        "- Data directory {} is ready",
        ctx.config.data_directory()?.display()
    );

    Ok(())
}
