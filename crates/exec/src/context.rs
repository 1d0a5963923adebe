//! Per-machine execution context
//!
//! Carries the environment ENV directives build up, the machine's output
//! directory, and the last RUN result threaded between sequential RUN
//! actions. One context per machine; nothing here touches the process
//! environment, so machines can never observe each other's state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use triage_errors::{Error, ExecError};
use triage_script::{defaults, tokenize, CommandSpec, EnvCommand};

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    workdir: PathBuf,
    env: HashMap<String, String>,
}

impl ExecutionContext {
    /// Build the context for one machine.
    ///
    /// ENV directive values are expanded left to right, so later entries
    /// can reference earlier ones (and the process environment). The
    /// extra pairs come from the CLI and are applied literally, after
    /// the script's own entries.
    #[must_use]
    pub fn new(
        workdir: PathBuf,
        env_commands: &[EnvCommand],
        extra_env: &[(String, String)],
    ) -> Self {
        let mut ctx = Self {
            workdir,
            env: HashMap::new(),
        };
        for command in env_commands {
            for (key, value) in &command.vars {
                let expanded = ctx.expand(value);
                ctx.env.insert(key.clone(), expanded);
            }
        }
        for (key, value) in extra_env {
            ctx.env.insert(key.clone(), value.clone());
        }
        ctx
    }

    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[must_use]
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Store a RUN result for later `${CMD_RESULT}` expansion
    pub fn set_result(&mut self, value: &str) {
        self.env
            .insert(defaults::RESULT_VAR.to_string(), value.trim().to_string());
    }

    /// The last stored RUN result, if any
    #[must_use]
    pub fn last_result(&self) -> Option<&str> {
        self.env.get(defaults::RESULT_VAR).map(String::as_str)
    }

    /// Expand `${VAR}` and `$VAR` references.
    ///
    /// Context variables win over the process environment; an unknown
    /// variable expands to the empty string.
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '$' {
                out.push(ch);
                continue;
            }
            match chars.peek() {
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if closed {
                        out.push_str(&self.lookup(&name));
                    } else {
                        // Unterminated reference stays literal
                        out.push_str("${");
                        out.push_str(&name);
                    }
                }
                Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push_str(&self.lookup(&name));
                }
                _ => out.push('$'),
            }
        }
        out
    }

    /// Resolve a CAPTURE/RUN spec into a spawnable program and args.
    ///
    /// Context variables expand first; the shell wrapper, when present,
    /// receives the whole expanded string via `-c`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::EmptyCommand`] when the expanded command
    /// tokenizes to nothing.
    pub fn resolve_command(&self, spec: &CommandSpec) -> Result<(String, Vec<String>), Error> {
        let expanded = self.expand(&spec.cmd);
        if let Some(shell) = &spec.shell {
            return Ok((shell.clone(), vec!["-c".to_string(), expanded]));
        }
        let mut words = tokenize(&expanded).into_iter();
        let Some(program) = words.next() else {
            return Err(ExecError::EmptyCommand.into());
        };
        Ok((program, words.collect()))
    }

    /// The expanded command as one string, for SSH exec and display
    #[must_use]
    pub fn command_line(&self, spec: &CommandSpec) -> String {
        let expanded = self.expand(&spec.cmd);
        match &spec.shell {
            Some(shell) => format!("{shell} -c {}", triage_script::quote(&expanded)),
            None => expanded,
        }
    }

    fn lookup(&self, name: &str) -> String {
        self.env
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_script::Script;

    fn context_for(text: &str) -> ExecutionContext {
        let script = Script::parse(text).expect("parse");
        ExecutionContext::new(PathBuf::from("/tmp/t"), &script.env, &[])
    }

    #[test]
    fn env_entries_expand_against_earlier_entries() {
        let ctx = context_for("ENV A=1 B=${A}2\nCAPTURE /bin/true\n");
        assert_eq!(ctx.env().get("A").map(String::as_str), Some("1"));
        assert_eq!(ctx.env().get("B").map(String::as_str), Some("12"));
    }

    #[test]
    fn env_entries_expand_against_the_process_environment() {
        // PATH is always present
        let ctx = context_for("ENV MYPATH=$PATH\nCAPTURE /bin/true\n");
        let expected = std::env::var("PATH").expect("PATH set");
        assert_eq!(ctx.env().get("MYPATH").map(String::as_str), Some(expected.as_str()));
    }

    #[test]
    fn run_results_thread_through_expansion() {
        let mut ctx = context_for("CAPTURE /bin/true\n");
        assert!(ctx.last_result().is_none());
        ctx.set_result("hi\n");
        assert_eq!(ctx.last_result(), Some("hi"));
        assert_eq!(ctx.expand("echo ${CMD_RESULT} there"), "echo hi there");
        assert_eq!(ctx.expand("echo $CMD_RESULT there"), "echo hi there");
    }

    #[test]
    fn unknown_variables_expand_to_empty() {
        let ctx = context_for("CAPTURE /bin/true\n");
        assert_eq!(ctx.expand("a ${DOES_NOT_EXIST_XYZ} b"), "a  b");
        assert_eq!(ctx.expand("cost: 5$"), "cost: 5$");
        assert_eq!(ctx.expand("${unclosed"), "${unclosed");
    }

    #[test]
    fn resolve_command_splits_or_wraps_in_shell() {
        let ctx = context_for("CAPTURE /bin/true\n");

        let plain = CommandSpec {
            line: 1,
            cmd: "/bin/echo HELLO".to_string(),
            shell: None,
            echo: false,
        };
        let (program, args) = ctx.resolve_command(&plain).expect("plain");
        assert_eq!(program, "/bin/echo");
        assert_eq!(args, vec!["HELLO"]);

        let shelled = CommandSpec {
            line: 1,
            cmd: "echo $HOME".to_string(),
            shell: Some("/bin/sh".to_string()),
            echo: false,
        };
        let (program, args) = ctx.resolve_command(&shelled).expect("shelled");
        assert_eq!(program, "/bin/sh");
        assert_eq!(args[0], "-c");
    }
}
