// repmgr configuration and the .pgpass file a replication node needs

use crate::cli::command_runner::{CommandRunner, Invocation};
use crate::errors::{PgAdminError, Result};
use log::info;
use std::fmt;
use std::fs::{OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::NamedTempFile;
use tera::Tera;

const TEMPLATE_NAME: &str = "repmgr.conf";

const REPMGR_TEMPLATE: &str = "cluster={{ cluster }}
node={{ node }}
node_name={{ node_name }}
conninfo='host={{ node_name }} user={{ user }} dbname={{ dbname }}'
use_replication_slots=1
pg_basebackup_options='--xlog-method=stream'
failover=automatic
promote_command='repmgr standby promote'
follow_command='repmgr standby follow'
logfile=/var/log/repmgr/repmgrd.log";

pub const CREDENTIALS_MODE: u32 = 0o600;
pub const REPLICATION_PSEUDO_DATABASE: &str = "replication";

/// One member of the primary/standby pair.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterNode {
    pub node_number: u32,
    pub cluster_name: String,
    pub database_name: String,
    pub database_user: String,
    pub database_password: String,
    pub primary_host: String,
}

impl fmt::Debug for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClusterNode")
            .field("node_number", &self.node_number)
            .field("cluster_name", &self.cluster_name)
            .field("database_name", &self.database_name)
            .field("database_user", &self.database_user)
            .field("primary_host", &self.primary_host)
            .finish_non_exhaustive()
    }
}

impl ClusterNode {
    pub fn validate(&self) -> Result<()> {
        if self.node_number == 0 {
            return Err(PgAdminError::configuration(
                "node number must be a positive integer",
            ));
        }
        for (field, value) in [
            ("cluster name", &self.cluster_name),
            ("database name", &self.database_name),
            ("database user", &self.database_user),
            ("primary host", &self.primary_host),
        ] {
            if value.trim().is_empty() {
                return Err(PgAdminError::configuration(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Renders the repmgr.conf for `node` running on `node_host`.
///
/// The output depends on nothing but its arguments, so every node can
/// regenerate and diff it.
pub fn render_config(node: &ClusterNode, node_host: &str) -> Result<String> {
    node.validate()?;
    if node_host.trim().is_empty() {
        return Err(PgAdminError::configuration("node host must not be empty"));
    }

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, REPMGR_TEMPLATE)?;

    let mut context = tera::Context::new();
    context.insert("cluster", &node.cluster_name);
    context.insert("node", &node.node_number);
    context.insert("node_name", node_host);
    context.insert("user", &node.database_user);
    context.insert("dbname", &node.database_name);

    let mut document = tera.render(TEMPLATE_NAME, &context)?.trim_end().to_owned();
    document.push('\n');
    Ok(document)
}

pub fn write_config_file(node: &ClusterNode, node_host: &str, path: &Path) -> Result<()> {
    let document = render_config(node, node_host)?;
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(document.as_bytes())?;
    }
    info!("Wrote replication config to {}", path.display());
    Ok(())
}

pub fn credentials_contents(node: &ClusterNode) -> String {
    [node.database_name.as_str(), REPLICATION_PSEUDO_DATABASE]
        .iter()
        .map(|db| {
            format!(
                "*:*:{}:{}:{}\n",
                db, node.database_user, node.database_password
            )
        })
        .collect()
}

/// Writes the .pgpass lines for the application database and replication,
/// readable by its owner only and owned by `service_user`.
///
/// The lines go to a private temporary file next to `path` which then
/// replaces it, so an existing file with looser permissions never holds
/// the password.
pub fn write_credentials_file(
    node: &ClusterNode,
    path: &Path,
    service_user: &str,
    runner: &dyn CommandRunner,
) -> Result<()> {
    node.validate()?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    file.as_file()
        .set_permissions(Permissions::from_mode(CREDENTIALS_MODE))?;
    file.write_all(credentials_contents(node).as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;

    let owner = format!("{0}:{0}", service_user);
    runner.run(
        &Invocation::new("chown")
            .arg(&owner)
            .arg(&path.to_string_lossy()),
    )?;

    info!("Wrote credentials file {} owned by {}", path.display(), owner);
    Ok(())
}
