use clap::Args;
use pg_admin::cli::cancellation::{Cancellation, InterruptibleSleep};
use pg_admin::cli::command_runner::{ConnectionParams, ProcessRunner};
use pg_admin::config::ApplianceConfig;
use spinners::{Spinner, Spinners};

pub mod backup;
pub mod cluster_name;
pub mod db_size;
pub mod gc;
pub mod prep;
pub mod replication;
pub mod restore;
pub mod status;

/// What every subcommand gets handed by main
pub struct AppContext {
    pub config: ApplianceConfig,
    pub runner: ProcessRunner,
    pub cancellation: Cancellation,
    pub sleep: InterruptibleSleep,
    pub verbose: bool,
}

impl AppContext {
    pub fn new(config: ApplianceConfig, cancellation: Cancellation, verbose: bool) -> Self {
        AppContext {
            config,
            runner: ProcessRunner,
            sleep: InterruptibleSleep::new(cancellation.clone()),
            cancellation,
            verbose,
        }
    }

    /// Runs `f` behind a spinner unless verbose output is on
    pub fn with_spinner<T>(&self, message: &str, f: impl FnOnce() -> T) -> T {
        if self.verbose {
            return f();
        }
        let mut sp = Spinner::new(Spinners::Line, message.into());
        let result = f();
        sp.stop_with_newline();
        result
    }
}

// Connection flags shared by every command that talks to the server
#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// Database server host
    #[clap(long)]
    pub host: Option<String>,

    /// Database server port
    #[clap(long)]
    pub port: Option<u16>,

    /// Database name
    #[clap(short, long)]
    pub dbname: Option<String>,

    /// Database user
    #[clap(short = 'U', long, env = "PGUSER")]
    pub username: Option<String>,

    /// Database password. Read from PGPASSWORD; the flag is hidden because
    /// its value would show up in process listings.
    #[clap(long, env = "PGPASSWORD", hide = true, hide_env_values = true)]
    pub password: Option<String>,
}

impl From<&ConnectionArgs> for ConnectionParams {
    fn from(args: &ConnectionArgs) -> Self {
        ConnectionParams {
            host: args.host.clone(),
            port: args.port,
            dbname: args.dbname.clone(),
            username: args.username.clone(),
            password: args.password.clone(),
        }
    }
}
