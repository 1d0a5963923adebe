//! Script assembly: preamble accumulation, action ordering, defaults

use crate::command::{
    Action, AsCommand, AuthConfigCommand, CommandSpec, CopyCommand, EnvCommand, FromCommand,
    KubeConfigCommand, KubeGetCommand, OutputCommand, WorkdirCommand,
};
use crate::directive::{scan, Directive};
use triage_errors::{Error, ScriptError};

/// A fully assembled script: resolved preambles plus the ordered action
/// list. Immutable once parsed; the execution engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub from: FromCommand,
    pub workdir: WorkdirCommand,
    pub as_user: AsCommand,
    pub auth: AuthConfigCommand,
    pub output: OutputCommand,
    pub kube_config: Option<KubeConfigCommand>,
    pub env: Vec<EnvCommand>,
    pub actions: Vec<Action>,
}

impl Script {
    /// Parse script text into a `Script`.
    ///
    /// Preambles are single-valued with last-write-wins semantics,
    /// except FROM which may only appear once; ENV is multi-valued in
    /// declaration order. After the full text is consumed, omitted
    /// preambles are synthesized with their documented defaults.
    ///
    /// # Errors
    ///
    /// Returns a line-numbered [`ScriptError`] on the first malformed
    /// directive, unsupported name, or failed command validation. No
    /// partial script is produced.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut assembler = Assembler::default();
        for directive in scan(text)? {
            assembler.apply(&directive)?;
        }
        let script = assembler.finish();
        tracing::debug!(
            machines = script.from.machines.len(),
            actions = script.actions.len(),
            "script parsed"
        );
        Ok(script)
    }

    /// Whether any target machine requires SSH
    #[must_use]
    pub fn has_remote_machines(&self) -> bool {
        self.from.machines.iter().any(|m| !m.is_local())
    }
}

#[derive(Default)]
struct Assembler {
    from: Option<FromCommand>,
    workdir: Option<WorkdirCommand>,
    as_user: Option<AsCommand>,
    auth: Option<AuthConfigCommand>,
    output: Option<OutputCommand>,
    kube_config: Option<KubeConfigCommand>,
    env: Vec<EnvCommand>,
    actions: Vec<Action>,
}

impl Assembler {
    fn apply(&mut self, directive: &Directive) -> Result<(), Error> {
        match directive.name.as_str() {
            "FROM" => {
                if let Some(previous) = &self.from {
                    return Err(ScriptError::FromRedefined {
                        line: directive.line,
                        previous: previous.line,
                    }
                    .into());
                }
                self.from = Some(FromCommand::parse(directive)?);
            }
            "AS" => self.as_user = Some(AsCommand::parse(directive)?),
            "WORKDIR" => self.workdir = Some(WorkdirCommand::parse(directive)?),
            "ENV" => self.env.push(EnvCommand::parse(directive)?),
            "AUTHCONFIG" | "SSHCONFIG" => {
                self.auth = Some(AuthConfigCommand::parse(directive)?);
            }
            "OUTPUT" => self.output = Some(OutputCommand::parse(directive)?),
            "KUBECONFIG" => self.kube_config = Some(KubeConfigCommand::parse(directive)?),
            "CAPTURE" => {
                let spec = CommandSpec::parse(directive, "CAPTURE")?;
                self.actions.push(Action::Capture(spec));
            }
            "RUN" => {
                let spec = CommandSpec::parse(directive, "RUN")?;
                self.actions.push(Action::Run(spec));
            }
            "COPY" => self.actions.push(Action::Copy(CopyCommand::parse(directive)?)),
            "KUBEGET" => {
                let kube = KubeGetCommand::parse(directive)?;
                self.actions.push(Action::KubeGet(kube));
            }
            _ => {
                return Err(ScriptError::UnsupportedDirective {
                    line: directive.line,
                    name: directive.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn finish(self) -> Script {
        Script {
            from: self.from.unwrap_or_else(FromCommand::local),
            workdir: self.workdir.unwrap_or_default(),
            as_user: self.as_user.unwrap_or_default(),
            auth: self.auth.unwrap_or_default(),
            output: self.output.unwrap_or_default(),
            kube_config: self.kube_config,
            env: self.env,
            actions: self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Machine;
    use crate::defaults;
    use std::path::Path;

    #[test]
    fn omitted_preambles_are_default_filled() {
        let script = Script::parse("CAPTURE /bin/echo HELLO\n").expect("parse");
        assert_eq!(script.from.machines, vec![Machine::Local]);
        assert_eq!(script.workdir.path, Path::new(defaults::WORKDIR));
        assert_eq!(script.output.path, Path::new(defaults::OUTPUT_FILE));
        assert_eq!(script.as_user, AsCommand::default());
        assert_eq!(script.auth, AuthConfigCommand::default());
        assert!(script.kube_config.is_none());
        assert_eq!(script.actions.len(), 1);
    }

    #[test]
    fn actions_keep_script_order() {
        let script = Script::parse("RUN a\nRUN b\n").expect("parse");
        match (&script.actions[0], &script.actions[1]) {
            (Action::Run(first), Action::Run(second)) => {
                assert_eq!(first.cmd, "a");
                assert_eq!(second.cmd, "b");
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn later_preambles_override_earlier_ones() {
        let script = Script::parse("WORKDIR /tmp/first\nWORKDIR /tmp/second\n").expect("parse");
        assert_eq!(script.workdir.path, Path::new("/tmp/second"));
        assert_eq!(script.workdir.line, 2);
    }

    #[test]
    fn from_redefinition_is_an_error() {
        let err = Script::parse("FROM local\nFROM 10.0.0.5\n").expect_err("redefined");
        assert!(matches!(
            err,
            Error::Script(ScriptError::FromRedefined {
                line: 2,
                previous: 1
            })
        ));
    }

    #[test]
    fn env_accumulates_in_order() {
        let script = Script::parse("ENV A=1\nENV B=2 C=3\n").expect("parse");
        assert_eq!(script.env.len(), 2);
        assert_eq!(script.env[0].vars, vec![("A".to_string(), "1".to_string())]);
        assert_eq!(script.env[1].vars.len(), 2);
    }

    #[test]
    fn unknown_directive_reports_its_line() {
        let err = Script::parse("FOO bar\n").expect_err("unsupported");
        match err {
            Error::Script(ScriptError::UnsupportedDirective { line, name }) => {
                assert_eq!(line, 1);
                assert_eq!(name, "FOO");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "FROM local\nWORKDIR /tmp/diag\nENV A=1\nRUN /bin/echo hi\nCOPY /var/log\n";
        let first = Script::parse(text).expect("first");
        let second = Script::parse(text).expect("second");
        assert_eq!(first, second);
    }
}
