use crate::cmd::AppContext;
use anyhow::bail;
use clap::{Args, Subcommand};
use pg_admin::cli::cluster_identity::generate_cluster_name;
use pg_admin::cli::command_runner::ConnectionParams;
use pg_admin::cli::replication_config::{
    render_config, write_config_file, write_credentials_file, ClusterNode,
};

/// Configure repmgr streaming replication for this node
#[derive(Args)]
pub struct ReplicationCommand {
    #[clap(subcommand)]
    pub subcommand: ReplicationSubCommand,
}

#[derive(Subcommand)]
pub enum ReplicationSubCommand {
    /// Print the repmgr configuration for this node
    Render(NodeArgs),
    /// Write the repmgr configuration and the .pgpass file
    Write(NodeArgs),
}

#[derive(Args)]
pub struct NodeArgs {
    /// Number uniquely identifying this node in the cluster
    #[clap(long)]
    pub node: u32,

    /// Hostname or IP address of this node
    #[clap(long)]
    pub node_host: String,

    /// Hostname or IP address of the primary
    #[clap(long)]
    pub primary_host: String,

    /// Cluster name; derived from the primary's database when omitted
    #[clap(long)]
    pub cluster_name: Option<String>,

    #[clap(long, default_value = "vmdb_production")]
    pub dbname: String,

    #[clap(long, default_value = "root")]
    pub user: String,

    /// Read from PGPASSWORD; hidden so the secret stays out of `ps` output
    #[clap(long, env = "PGPASSWORD", hide = true, hide_env_values = true)]
    pub password: Option<String>,
}

pub fn execute(ctx: &AppContext, cmd: &ReplicationCommand) -> Result<(), anyhow::Error> {
    match &cmd.subcommand {
        ReplicationSubCommand::Render(args) => {
            let node = cluster_node(ctx, args)?;
            print!("{}", render_config(&node, &args.node_host)?);
        }
        ReplicationSubCommand::Write(args) => {
            if args.password.is_none() {
                bail!("a password is required to write the credentials file (set PGPASSWORD)");
            }
            let node = cluster_node(ctx, args)?;
            write_config_file(&node, &args.node_host, &ctx.config.repmgr_config)?;
            write_credentials_file(
                &node,
                &ctx.config.pgpass_file,
                &ctx.config.service_user,
                &ctx.runner,
            )?;
            println!(
                "- Node {} configured for cluster {}",
                node.node_number, node.cluster_name
            );
        }
    }

    Ok(())
}

fn cluster_node(ctx: &AppContext, args: &NodeArgs) -> Result<ClusterNode, anyhow::Error> {
    let cluster_name = match &args.cluster_name {
        Some(name) => name.clone(),
        None => {
            let primary = ConnectionParams {
                host: Some(args.primary_host.clone()),
                dbname: Some(args.dbname.clone()),
                username: Some(args.user.clone()),
                password: args.password.clone(),
                ..Default::default()
            };
            generate_cluster_name(&ctx.runner, &primary)?.into()
        }
    };

    Ok(ClusterNode {
        node_number: args.node,
        cluster_name,
        database_name: args.dbname.clone(),
        database_user: args.user.clone(),
        database_password: args.password.clone().unwrap_or_default(),
        primary_host: args.primary_host.clone(),
    })
}
