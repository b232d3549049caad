use crate::errors::{PgAdminError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATA_DIRECTORY_VAR: &str = "APPLIANCE_PG_DATA";
pub const MOUNT_POINT_VAR: &str = "APPLIANCE_PG_MOUNT_POINT";
pub const TEMPLATE_DIRECTORY_VAR: &str = "APPLIANCE_TEMPLATE_DIRECTORY";
pub const SERVICE_NAME_VAR: &str = "APPLIANCE_PG_SERVICE";
pub const PACKAGE_NAME_VAR: &str = "APPLIANCE_PG_PACKAGE_NAME";

pub const LOGICAL_VOLUME_NAME: &str = "lv_pg";
pub const VOLUME_GROUP_NAME: &str = "vg_data";
pub const DATABASE_DISK_FILESYSTEM: &str = "xfs";

/// Everything the appliance knows about where its PostgreSQL lives.
///
/// Built once by the caller and handed to whatever needs it; nothing in the
/// library reads the process environment on its own.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApplianceConfig {
    pub data_directory: Option<PathBuf>,
    pub mount_point: Option<PathBuf>,
    pub template_directory: Option<PathBuf>,
    pub service_name: Option<String>,
    pub package_name: Option<String>,
    /// Unprivileged account the server runs as
    pub service_user: String,
    pub repmgr_config: PathBuf,
    pub pgpass_file: PathBuf,
    pub drain: DrainSettings,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DrainSettings {
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_attempts: 60,
        }
    }
}

impl DrainSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            data_directory: None,
            mount_point: None,
            template_directory: None,
            service_name: None,
            package_name: None,
            service_user: "postgres".to_owned(),
            repmgr_config: PathBuf::from("/etc/repmgr.conf"),
            pgpass_file: PathBuf::from("/var/lib/pgsql/.pgpass"),
            drain: DrainSettings::default(),
        }
    }
}

impl ApplianceConfig {
    /// Defaults, then the optional TOML file, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config = match file {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };

        Ok(config.with_env_overrides(|key| env::var(key).ok()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| PgAdminError::configuration(format!("invalid config file: {}", e)))
    }

    /// Overlay values from `lookup`; empty values count as unset
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = lookup(DATA_DIRECTORY_VAR) {
            self.data_directory = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(MOUNT_POINT_VAR) {
            self.mount_point = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(TEMPLATE_DIRECTORY_VAR) {
            self.template_directory = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(SERVICE_NAME_VAR) {
            self.service_name = Some(v);
        }
        if let Some(v) = lookup(PACKAGE_NAME_VAR) {
            self.package_name = Some(v);
        }
        self
    }

    pub fn data_directory(&self) -> Result<&Path> {
        required(self.data_directory.as_deref(), DATA_DIRECTORY_VAR)
    }

    pub fn mount_point(&self) -> Result<&Path> {
        required(self.mount_point.as_deref(), MOUNT_POINT_VAR)
    }

    pub fn template_directory(&self) -> Result<&Path> {
        required(self.template_directory.as_deref(), TEMPLATE_DIRECTORY_VAR)
    }

    pub fn service_name(&self) -> Result<&str> {
        required(self.service_name.as_deref(), SERVICE_NAME_VAR)
    }

    pub fn package_name(&self) -> Result<&str> {
        required(self.package_name.as_deref(), PACKAGE_NAME_VAR)
    }

    pub fn logical_volume_path(&self) -> PathBuf {
        Path::new("/dev")
            .join(VOLUME_GROUP_NAME)
            .join(LOGICAL_VOLUME_NAME)
    }
}

fn required<'a, T: ?Sized>(value: Option<&'a T>, var: &str) -> Result<&'a T> {
    value.ok_or_else(|| PgAdminError::configuration(format!("{} must be set", var)))
}
