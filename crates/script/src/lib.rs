#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Script parsing for triage
//!
//! A triage script is a line-oriented list of directives. Preamble
//! directives (FROM, AS, WORKDIR, ENV, AUTHCONFIG, OUTPUT, KUBECONFIG)
//! configure the run; action directives (CAPTURE, COPY, RUN, KUBEGET)
//! form the ordered work list executed once per target machine.
//!
//! Parsing is a single left-to-right pass over the source: the scanner
//! splits each line into a directive name and raw arguments, the
//! tokenizer breaks the arguments into quote-aware words and `name:value`
//! pairs, and each command variant validates its own argument map at
//! construction. Omitted preambles are synthesized with their documented
//! defaults after the whole script has been consumed.

pub mod defaults;

mod command;
mod directive;
mod script;
mod tokenizer;

pub use command::{
    Action, AsCommand, AuthConfigCommand, CommandSpec, CopyCommand, EnvCommand, FromCommand,
    KubeConfigCommand, KubeGetCommand, KubeGetWhat, Machine, OutputCommand, WorkdirCommand,
};
pub use directive::{scan, ArgMap, Directive};
pub use script::Script;
pub use tokenizer::{is_quoted, join_tokens, quote, split_named_param, tokenize, trim_quotes};
