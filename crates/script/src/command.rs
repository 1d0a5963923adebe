//! Typed command variants for every supported directive
//!
//! Each variant validates its own argument map at construction and is
//! immutable afterwards. Preambles configure the run; actions are the
//! ordered work list.

use crate::defaults;
use crate::directive::{ArgMap, Directive};
use crate::tokenizer::tokenize;
use std::fmt;
use std::path::PathBuf;
use triage_errors::{Error, ScriptError};

/// One execution target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Machine {
    /// The machine triage itself runs on
    Local,
    /// A machine reachable over SSH
    Remote { host: String, port: u16 },
}

impl Machine {
    /// Parse a machine token: `local`, `host`, or `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::InvalidMachine`] for empty hosts and
    /// unparseable ports.
    pub fn parse(token: &str, line: usize) -> Result<Self, Error> {
        if token == defaults::LOCAL_ADDRESS {
            return Ok(Self::Local);
        }
        let (host, port) = match token.split_once(':') {
            None => (token, defaults::SSH_PORT),
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| ScriptError::InvalidMachine {
                    line,
                    address: token.to_string(),
                    reason: format!("bad port: {e}"),
                })?;
                (host, port)
            }
        };
        if host.is_empty() {
            return Err(ScriptError::InvalidMachine {
                line,
                address: token.to_string(),
                reason: "empty host".to_string(),
            }
            .into());
        }
        Ok(Self::Remote {
            host: host.to_string(),
            port,
        })
    }

    /// Address string: the `local` sentinel or `host:port`
    #[must_use]
    pub fn address(&self) -> String {
        match self {
            Self::Local => defaults::LOCAL_ADDRESS.to_string(),
            Self::Remote { host, port } => format!("{host}:{port}"),
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

/// FROM: the machines a run targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromCommand {
    pub line: usize,
    pub machines: Vec<Machine>,
}

impl FromCommand {
    /// Parse a FROM directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when no machine is given or one fails
    /// to parse.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["machines"], Some("machines"))?;
        let spec = args.require("FROM", "machines")?;
        let machines = tokenize(spec)
            .iter()
            .map(|token| Machine::parse(token, directive.line))
            .collect::<Result<Vec<_>, _>>()?;
        if machines.is_empty() {
            return Err(ScriptError::MissingArgument {
                line: directive.line,
                directive: "FROM",
                argument: "machines",
            }
            .into());
        }
        Ok(Self {
            line: directive.line,
            machines,
        })
    }

    /// Synthesized default: the local machine only
    #[must_use]
    pub fn local() -> Self {
        Self {
            line: 0,
            machines: vec![Machine::Local],
        }
    }
}

/// AS: identity used for local execution (and SSH fallback username)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsCommand {
    pub line: usize,
    /// Numeric uid or login name; `None` inherits the invoking process
    pub userid: Option<String>,
    /// Numeric gid or group name; `None` inherits the invoking process
    pub groupid: Option<String>,
}

impl AsCommand {
    /// Parse an AS directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] for malformed parameters.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["userid", "groupid"], Some("userid"))?;
        Ok(Self {
            line: directive.line,
            userid: args.get("userid").map(ToString::to_string),
            groupid: args.get("groupid").map(ToString::to_string),
        })
    }
}

/// WORKDIR: root directory for collected output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdirCommand {
    pub line: usize,
    pub path: PathBuf,
}

impl WorkdirCommand {
    /// Parse a WORKDIR directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when the path argument is missing.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["path"], Some("path"))?;
        let path = args.require("WORKDIR", "path")?;
        Ok(Self {
            line: directive.line,
            path: PathBuf::from(path),
        })
    }
}

impl Default for WorkdirCommand {
    fn default() -> Self {
        Self {
            line: 0,
            path: PathBuf::from(defaults::WORKDIR),
        }
    }
}

/// ENV: variables added to every command's execution environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvCommand {
    pub line: usize,
    /// `key=value` pairs in declaration order
    pub vars: Vec<(String, String)>,
}

impl EnvCommand {
    /// Parse an ENV directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when a token is not `key=value`.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["vars"], Some("vars"))?;
        let spec = args.require("ENV", "vars")?;
        let mut vars = Vec::new();
        for token in tokenize(spec) {
            let Some((key, value)) = token.split_once('=') else {
                return Err(ScriptError::InvalidArgument {
                    line: directive.line,
                    message: format!("ENV entry is not key=value: {token}"),
                }
                .into());
            };
            if key.is_empty() {
                return Err(ScriptError::InvalidArgument {
                    line: directive.line,
                    message: format!("ENV entry has an empty key: {token}"),
                }
                .into());
            }
            vars.push((key.to_string(), value.to_string()));
        }
        Ok(Self {
            line: directive.line,
            vars,
        })
    }
}

/// AUTHCONFIG/SSHCONFIG: SSH login and private key
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthConfigCommand {
    pub line: usize,
    /// SSH login name; `None` falls back to AS, then the current user
    pub username: Option<String>,
    /// Path to the private key; required for remote machines
    pub private_key: Option<PathBuf>,
}

impl AuthConfigCommand {
    /// Parse an AUTHCONFIG/SSHCONFIG directive.
    ///
    /// The key path is taken as-is here; readability is checked at
    /// credential resolution, before any machine is touched.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when `private-key` is missing.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(
            directive,
            &["username", "private-key"],
            Some("private-key"),
        )?;
        let key = PathBuf::from(args.require("AUTHCONFIG", "private-key")?);
        Ok(Self {
            line: directive.line,
            username: args.get("username").map(ToString::to_string),
            private_key: Some(key),
        })
    }
}

/// OUTPUT: where the final archive is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCommand {
    pub line: usize,
    pub path: PathBuf,
}

impl OutputCommand {
    /// Parse an OUTPUT directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when the path argument is missing.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["path"], Some("path"))?;
        let path = args.require("OUTPUT", "path")?;
        Ok(Self {
            line: directive.line,
            path: PathBuf::from(path),
        })
    }
}

impl Default for OutputCommand {
    fn default() -> Self {
        Self {
            line: 0,
            path: PathBuf::from(defaults::OUTPUT_FILE),
        }
    }
}

/// KUBECONFIG: cluster access for KUBEGET actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeConfigCommand {
    pub line: usize,
    /// Existence is checked at execution time, not here; a missing file
    /// downgrades cluster collection to a warning.
    pub path: PathBuf,
}

impl KubeConfigCommand {
    /// Parse a KUBECONFIG directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when the path argument is missing.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["path"], Some("path"))?;
        let path = args.require("KUBECONFIG", "path")?;
        Ok(Self {
            line: directive.line,
            path: PathBuf::from(path),
        })
    }
}

/// CAPTURE/RUN: a command executed on each target machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub line: usize,
    /// Command string as written; context variables expand at exec time
    pub cmd: String,
    /// Optional shell wrapper (`shell -c cmd`)
    pub shell: Option<String>,
    /// Whether RUN echoes the command and its result
    pub echo: bool,
}

impl CommandSpec {
    /// Parse a CAPTURE or RUN directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when the command string is missing or
    /// tokenizes to nothing.
    pub fn parse(directive: &Directive, name: &'static str) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["cmd", "shell", "echo"], Some("cmd"))?;
        let cmd = args.require(name, "cmd")?.to_string();
        if tokenize(&cmd).is_empty() {
            return Err(ScriptError::InvalidArgument {
                line: directive.line,
                message: format!("{name} command is empty"),
            }
            .into());
        }
        Ok(Self {
            line: directive.line,
            cmd,
            shell: args.get("shell").map(ToString::to_string),
            echo: args.get("echo").is_some_and(parse_bool),
        })
    }
}

/// COPY: files or directories fetched from each target machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCommand {
    pub line: usize,
    /// Paths as written; a `*` switches that path to directory-mode copy
    pub paths: Vec<String>,
}

impl CopyCommand {
    /// Parse a COPY directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when no path is given.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(directive, &["paths"], Some("paths"))?;
        let paths = tokenize(args.require("COPY", "paths")?);
        if paths.is_empty() {
            return Err(ScriptError::MissingArgument {
                line: directive.line,
                directive: "COPY",
                argument: "paths",
            }
            .into());
        }
        Ok(Self {
            line: directive.line,
            paths,
        })
    }
}

/// What KUBEGET collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KubeGetWhat {
    Objects,
    Logs,
    All,
}

impl KubeGetWhat {
    fn parse(value: &str, line: usize) -> Result<Self, Error> {
        match value.to_lowercase().as_str() {
            "objects" => Ok(Self::Objects),
            "logs" => Ok(Self::Logs),
            "all" => Ok(Self::All),
            other => Err(ScriptError::InvalidArgument {
                line,
                message: format!("KUBEGET what must be objects, logs, or all, got {other}"),
            }
            .into()),
        }
    }
}

/// KUBEGET: cluster objects and pod logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeGetCommand {
    pub line: usize,
    pub what: KubeGetWhat,
    pub groups: Vec<String>,
    pub kinds: Vec<String>,
    pub namespaces: Vec<String>,
    pub versions: Vec<String>,
    pub names: Vec<String>,
    pub labels: Vec<String>,
    pub containers: Vec<String>,
}

impl KubeGetCommand {
    /// Parse a KUBEGET directive.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] when the `what` argument is missing or
    /// not one of `objects`, `logs`, `all`.
    pub fn parse(directive: &Directive) -> Result<Self, Error> {
        let args = ArgMap::build(
            directive,
            &[
                "what",
                "groups",
                "kinds",
                "namespaces",
                "versions",
                "names",
                "labels",
                "containers",
            ],
            Some("what"),
        )?;
        let what = KubeGetWhat::parse(args.require("KUBEGET", "what")?, directive.line)?;
        Ok(Self {
            line: directive.line,
            what,
            groups: list_arg(args.get("groups")),
            kinds: list_arg(args.get("kinds")),
            namespaces: list_arg(args.get("namespaces")),
            versions: list_arg(args.get("versions")),
            names: list_arg(args.get("names")),
            labels: list_arg(args.get("labels")),
            containers: list_arg(args.get("containers")),
        })
    }
}

/// An ordered work item executed once per target machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Capture(CommandSpec),
    Run(CommandSpec),
    Copy(CopyCommand),
    KubeGet(KubeGetCommand),
}

impl Action {
    /// Source line of the underlying directive
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Capture(c) | Self::Run(c) => c.line,
            Self::Copy(c) => c.line,
            Self::KubeGet(c) => c.line,
        }
    }

    /// Directive name, for logs and reports
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Capture(_) => "CAPTURE",
            Self::Run(_) => "RUN",
            Self::Copy(_) => "COPY",
            Self::KubeGet(_) => "KUBEGET",
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn list_arg(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(name: &str, raw: &str) -> Directive {
        Directive {
            name: name.to_string(),
            raw: raw.to_string(),
            line: 3,
        }
    }

    #[test]
    fn machine_parses_local_and_remote_forms() {
        assert_eq!(Machine::parse("local", 1).expect("local"), Machine::Local);
        assert_eq!(
            Machine::parse("10.0.0.5", 1).expect("host"),
            Machine::Remote {
                host: "10.0.0.5".to_string(),
                port: 22
            }
        );
        assert_eq!(
            Machine::parse("10.0.0.5:2222", 1).expect("host:port"),
            Machine::Remote {
                host: "10.0.0.5".to_string(),
                port: 2222
            }
        );
        assert!(Machine::parse("10.0.0.5:ssh", 1).is_err());
        assert!(Machine::parse(":22", 1).is_err());
    }

    #[test]
    fn from_accepts_multiple_machines() {
        let from = FromCommand::parse(&directive("FROM", "local 10.0.0.5:2222")).expect("from");
        assert_eq!(from.machines.len(), 2);
        assert_eq!(from.machines[0], Machine::Local);
        assert_eq!(from.machines[1].address(), "10.0.0.5:2222");
    }

    #[test]
    fn command_spec_parses_shell_and_echo() {
        let spec = CommandSpec::parse(
            &directive("RUN", "cmd:\"/bin/date -u\" shell:/bin/bash echo:true"),
            "RUN",
        )
        .expect("spec");
        assert_eq!(spec.cmd, "/bin/date -u");
        assert_eq!(spec.shell.as_deref(), Some("/bin/bash"));
        assert!(spec.echo);

        let plain = CommandSpec::parse(&directive("CAPTURE", "/bin/echo HELLO"), "CAPTURE")
            .expect("plain");
        assert_eq!(plain.cmd, "/bin/echo HELLO");
        assert_eq!(plain.shell, None);
        assert!(!plain.echo);
    }

    #[test]
    fn env_requires_key_value_entries() {
        let env = EnvCommand::parse(&directive("ENV", "A=1 B=two")).expect("env");
        assert_eq!(env.vars, vec![
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "two".to_string())
        ]);
        assert!(EnvCommand::parse(&directive("ENV", "NOT_A_PAIR")).is_err());
    }

    #[test]
    fn copy_splits_paths_preserving_quoted_spaces() {
        let copy = CopyCommand::parse(&directive("COPY", "/var/log \"/tmp/a file\"")).expect("copy");
        assert_eq!(copy.paths, vec!["/var/log", "/tmp/a file"]);
    }

    #[test]
    fn kubeget_parses_what_and_lists() {
        let kube = KubeGetCommand::parse(&directive(
            "KUBEGET",
            "objects namespaces:\"kube-system default\" kinds:pods,services",
        ))
        .expect("kubeget");
        assert_eq!(kube.what, KubeGetWhat::Objects);
        assert_eq!(kube.namespaces, vec!["kube-system", "default"]);
        assert_eq!(kube.kinds, vec!["pods", "services"]);
        assert!(KubeGetCommand::parse(&directive("KUBEGET", "everything")).is_err());
    }

    #[test]
    fn authconfig_requires_the_key_parameter() {
        let err = AuthConfigCommand::parse(&directive("AUTHCONFIG", "username:ops"))
            .expect_err("missing key");
        assert!(matches!(
            err,
            Error::Script(ScriptError::MissingArgument { line: 3, .. })
        ));

        let auth = AuthConfigCommand::parse(&directive(
            "AUTHCONFIG",
            "username:ops private-key:/etc/keys/id_ed25519",
        ))
        .expect("auth");
        assert_eq!(auth.username.as_deref(), Some("ops"));
        assert_eq!(
            auth.private_key.as_deref(),
            Some(std::path::Path::new("/etc/keys/id_ed25519"))
        );
    }
}
