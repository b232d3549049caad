// Invocation of the PostgreSQL client binaries (psql, pg_basebackup, ...)

use crate::errors::{PgAdminError, Result};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use std::fmt;
use std::process::Command as ShellCommand;

pub const USER_ENV: &str = "PGUSER";
pub const PASSWORD_ENV: &str = "PGPASSWORD";

const REDACTED: &str = "[REDACTED]";

/// Where and as whom a tool connects. The password only ever travels through
/// the child's environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl ConnectionParams {
    pub fn with_database(&self, dbname: &str) -> ConnectionParams {
        ConnectionParams {
            dbname: Some(dbname.to_owned()),
            ..self.clone()
        }
    }

    pub fn without_database(&self) -> ConnectionParams {
        ConnectionParams {
            dbname: None,
            ..self.clone()
        }
    }

    /// Database name, if one was given and it is not blank
    pub fn database(&self) -> Option<&str> {
        self.dbname.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// A single command line option: `--name` or `--name=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    Switch,
    Valued(String),
}

/// A fully described call of one external tool.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    flags: Vec<(String, Flag)>,
    positional: Vec<String>,
    env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Invocation {
            program: program.to_owned(),
            flags: Vec::new(),
            positional: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Adds the non-interactive connection flags and the credential env vars
    pub fn connection(mut self, params: &ConnectionParams) -> Self {
        self = self.switch("no-password");
        if let Some(dbname) = params.database() {
            self = self.valued("dbname", dbname);
        }
        if let Some(host) = &params.host {
            self = self.valued("host", host);
        }
        if let Some(port) = params.port {
            self = self.valued("port", &port.to_string());
        }
        if let Some(username) = &params.username {
            self = self.env(USER_ENV, username);
        }
        if let Some(password) = &params.password {
            self = self.env(PASSWORD_ENV, password);
        }
        self
    }

    pub fn switch(mut self, name: &str) -> Self {
        self.flags.push((name.to_owned(), Flag::Switch));
        self
    }

    pub fn valued(mut self, name: &str, value: &str) -> Self {
        self.flags
            .push((name.to_owned(), Flag::Valued(value.to_owned())));
        self
    }

    pub fn arg(mut self, value: &str) -> Self {
        self.positional.push(value.to_owned());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn flag(&self, name: &str) -> Option<&Flag> {
        self.flags
            .iter()
            .find(|(flag, _)| flag == name)
            .map(|(_, value)| value)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flag(name).is_some()
    }

    /// The value of `--name=value`, `None` for switches and absent flags
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        match self.flag(name) {
            Some(Flag::Valued(v)) => Some(v),
            _ => None,
        }
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Flags first, in insertion order, then positional arguments
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        for (name, flag) in &self.flags {
            args.extend(render_flag(name, flag));
        }
        args.extend(self.positional.iter().cloned());
        args
    }

    /// Printable command line with anything password-like masked
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        for (name, flag) in &self.flags {
            let flag = match flag {
                Flag::Valued(_) if name.contains("password") => {
                    Flag::Valued(REDACTED.to_owned())
                }
                other => other.clone(),
            };
            parts.extend(render_flag(name, &flag).iter().map(|a| quote(a)));
        }
        parts.extend(self.positional.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Invocation")
            .field("command_line", &self.command_line())
            .field("env", &env)
            .finish()
    }
}

fn render_flag(name: &str, flag: &Flag) -> Vec<String> {
    let short = name.chars().count() == 1;
    match (flag, short) {
        (Flag::Switch, true) => vec![format!("-{}", name)],
        (Flag::Switch, false) => vec![format!("--{}", name)],
        (Flag::Valued(value), true) => vec![format!("-{}", name), value.clone()],
        (Flag::Valued(value), false) => vec![format!("--{}={}", name, value)],
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_owned()
    }
}

/// What a successful invocation left behind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn with_stdout(stdout: &str) -> Self {
        CommandOutcome {
            status: Some(0),
            stdout: stdout.to_owned(),
            stderr: String::new(),
        }
    }
}

#[cfg_attr(test, automock)]
pub trait CommandRunner {
    /// Runs the tool to completion; a non-zero exit is `ExternalCommand`
    fn run(&self, invocation: &Invocation) -> Result<CommandOutcome>;
}

/// Runs tools as child processes of this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutcome> {
        info!("Running command... {}", invocation.command_line());

        let output = ShellCommand::new(&invocation.program)
            .args(invocation.args())
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .output()
            .map_err(|source| PgAdminError::Spawn {
                command: invocation.program.clone(),
                source,
            })?;

        let outcome = CommandOutcome {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(PgAdminError::ExternalCommand {
                command: invocation.program.clone(),
                exit_code: outcome.status,
                stderr: outcome.stderr.trim().to_owned(),
            });
        }

        debug!("{} exited with {:?}", invocation.program, outcome.status);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: Some("db.example.com".into()),
            port: None,
            dbname: Some("vmdb_production".into()),
            username: Some("root".into()),
            password: Some("smartvm".into()),
        }
    }

    #[test]
    fn renders_switches_and_valued_flags() {
        let invocation = Invocation::new("pg_basebackup")
            .switch("z")
            .valued("format", "t")
            .switch("verbose")
            .valued("pgdata", "/backups")
            .arg("trailing");

        assert_eq!(
            invocation.args(),
            vec!["-z", "--format=t", "--verbose", "--pgdata=/backups", "trailing"]
        );
    }

    #[test]
    fn credentials_travel_through_env_only() {
        let invocation = Invocation::new("psql")
            .connection(&params())
            .valued("command", "SELECT 1");

        let args = invocation.args();
        assert_eq!(
            args,
            vec![
                "--no-password",
                "--dbname=vmdb_production",
                "--host=db.example.com",
                "--command=SELECT 1"
            ]
        );
        assert!(!args.iter().any(|a| a.contains("smartvm") || a.contains("root")));
        assert_eq!(invocation.env_var(USER_ENV), Some("root"));
        assert_eq!(invocation.env_var(PASSWORD_ENV), Some("smartvm"));
    }

    #[test]
    fn blank_database_is_not_forwarded() {
        let mut p = params();
        p.dbname = Some("  ".into());
        let invocation = Invocation::new("psql").connection(&p);

        assert!(!invocation.has_flag("dbname"));
    }

    #[test]
    fn command_line_is_quoted_and_redacted() {
        let invocation = Invocation::new("psql")
            .connection(&params())
            .valued("command", "SELECT 1")
            .valued("password", "hunter2");

        let line = invocation.command_line();
        assert!(line.starts_with("psql --no-password"));
        assert!(line.contains("'--command=SELECT 1'"));
        assert!(line.contains("--password=[REDACTED]"));
        assert!(!line.contains("hunter2"));
        assert!(!line.contains("smartvm"));
        assert!(!format!("{:?}", invocation).contains("smartvm"));
    }

    #[test]
    fn debug_hides_password() {
        let debug = format!("{:?}", params());
        assert!(!debug.contains("smartvm"));
        assert!(debug.contains(REDACTED));
    }

    #[test]
    fn process_runner_captures_stdout() {
        let outcome = ProcessRunner
            .run(&Invocation::new("sh").valued("c", "echo hello"))
            .unwrap();

        assert_eq!(outcome.status, Some(0));
        assert_eq!(outcome.stdout, "hello\n");
    }

    #[test]
    fn process_runner_maps_non_zero_exit() {
        let err = ProcessRunner
            .run(&Invocation::new("sh").valued("c", "echo broken >&2; exit 3"))
            .unwrap_err();

        match err {
            PgAdminError::ExternalCommand {
                command,
                exit_code,
                stderr,
            } => {
                assert_eq!(command, "sh");
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn process_runner_reports_missing_binary() {
        let err = ProcessRunner
            .run(&Invocation::new("definitely-not-a-real-binary-pgadmin"))
            .unwrap_err();

        assert!(matches!(err, PgAdminError::Spawn { .. }));
    }

    #[test]
    fn process_runner_scopes_env_to_the_child() {
        let outcome = ProcessRunner
            .run(
                &Invocation::new("sh")
                    .valued("c", "printf %s \"$PGUSER\"")
                    .env(USER_ENV, "someuser"),
            )
            .unwrap();

        assert_eq!(outcome.stdout, "someuser");
        assert!(std::env::var(USER_ENV).map(|v| v != "someuser").unwrap_or(true));
    }
}
