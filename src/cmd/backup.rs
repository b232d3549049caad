use crate::cmd::{AppContext, ConnectionArgs};
use chrono::Utc;
use clap::Args;
use pg_admin::cli::backup::{BackupEngine, BackupRequest};
use pg_admin::cli::command_runner::ConnectionParams;
use std::path::{Path, PathBuf};

/// Take a compressed physical backup of the whole cluster
#[derive(Args)]
pub struct BackupCommand {
    /// Archive to write; a directory gets a timestamped file name
    #[clap(short, long)]
    pub file: PathBuf,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

pub fn execute(ctx: &AppContext, cmd: &BackupCommand) -> Result<(), anyhow::Error> {
    let request = BackupRequest {
        connection: ConnectionParams::from(&cmd.connection),
        destination: destination(&cmd.file),
    };

    let engine = BackupEngine::new(&ctx.runner);
    let path = ctx.with_spinner("Taking base backup", || engine.backup(&request))?;

    println!("- Backup written to {}", path.display());
    Ok(())
}

fn destination(file: &Path) -> PathBuf {
    if file.is_dir() {
        file.join(format!(
            "pg_backup_{}.tar.gz",
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    } else {
        file.to_path_buf()
    }
}
