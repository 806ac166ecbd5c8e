use std::env;
use std::ffi::CString;
use std::path::PathBuf;

use crate::error::ShellError;
use crate::parser::Pipeline;

/// One pipeline stage: the program name followed by its arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
}

impl Command {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Argument vector for `execvp`. Built before forking so the child
    /// never allocates.
    pub fn to_argv(&self) -> Result<Vec<CString>, ShellError> {
        if self.is_empty() {
            return Err(ShellError::EmptyCommand);
        }
        self.args
            .iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| ShellError::NulByte))
            .collect()
    }
}

/// Commands the shell runs in its own process instead of spawning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd(Option<String>),
}

impl Builtin {
    /// Looks only at the first word of the first stage, so `cd /tmp | cat`
    /// is still a `cd`.
    pub fn detect(pipeline: &Pipeline) -> Option<Self> {
        let first = pipeline.commands.first()?;
        match first.program()? {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd(first.args.get(1).cloned())),
            _ => None,
        }
    }

    /// Runs a non-terminating builtin. `exit` is handled by the loop since it
    /// ends the shell.
    pub fn execute(&self) -> Result<(), ShellError> {
        match self {
            Builtin::Exit => Ok(()),
            Builtin::Cd(path) => {
                let target = match path {
                    Some(dir) => PathBuf::from(dir),
                    None => PathBuf::from(env::var("HOME").unwrap_or_else(|_| "/".to_string())),
                };
                env::set_current_dir(&target).map_err(|source| ShellError::ChangeDir {
                    path: target,
                    source,
                })
            }
        }
    }
}
