use crate::cmd::{backup, cluster_name, db_size, gc, prep, replication, restore, status, AppContext};
use anyhow::Context;
use clap::{crate_authors, crate_version, Args, Parser, Subcommand};
use pg_admin::cli::cancellation::Cancellation;
use pg_admin::config::ApplianceConfig;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[clap(author = crate_authors!("\n"), version = crate_version!(), about = "Appliance PostgreSQL administration", long_about = None)]
struct App {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: SubCommands,
}

// Enum representing all available commands
#[derive(Subcommand)]
enum SubCommands {
    Status(status::StatusCommand),
    DbSize(db_size::DbSizeCommand),
    PrepDataDir(prep::PrepDataDirCommand),
    Backup(backup::BackupCommand),
    Restore(restore::RestoreCommand),
    Gc(gc::GcCommand),
    ClusterName(cluster_name::ClusterNameCommand),
    Replication(replication::ReplicationCommand),
}

#[derive(Args)]
struct GlobalOpts {
    /// Show more information in command output
    #[clap(short, long, global = true)]
    verbose: bool,

    /// TOML file with appliance settings; environment variables take precedence
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    let app = App::parse();

    let level = if app.global_opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        ConfigBuilder::new().build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let config = ApplianceConfig::load(app.global_opts.config.as_deref())
        .context("could not load appliance configuration")?;

    let cancellation = Cancellation::new();
    cancellation.register_signals()?;

    let ctx = AppContext::new(config, cancellation, app.global_opts.verbose);

    match app.command {
        SubCommands::Status(cmd) => status::execute(&ctx, &cmd)?,
        SubCommands::DbSize(cmd) => db_size::execute(&ctx, &cmd)?,
        SubCommands::PrepDataDir(cmd) => prep::execute(&ctx, &cmd)?,
        SubCommands::Backup(cmd) => backup::execute(&ctx, &cmd)?,
        SubCommands::Restore(cmd) => restore::execute(&ctx, &cmd)?,
        SubCommands::Gc(cmd) => gc::execute(&ctx, &cmd)?,
        SubCommands::ClusterName(cmd) => cluster_name::execute(&ctx, &cmd)?,
        SubCommands::Replication(cmd) => replication::execute(&ctx, &cmd)?,
    }

    Ok(())
}
