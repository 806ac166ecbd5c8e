use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Everything that can go wrong while running one input line.
///
/// All variants are local to the line that produced them, except
/// [`ShellError::Fork`]: without process creation the shell cannot do
/// anything useful, so the loop terminates on it.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{}", Errno::EINVAL.desc())]
    EmptyCommand,

    #[error("{}: argument contains a NUL byte", Errno::EINVAL.desc())]
    NulByte,

    #[error("{}: {source}", .path.display())]
    Redirect { path: PathBuf, source: io::Error },

    #[error("Failed to create pipe: {}", .0.desc())]
    Pipe(Errno),

    #[error("Fork failed: {}", .0.desc())]
    Fork(Errno),

    #[error("waitpid: {}", .0.desc())]
    Wait(Errno),

    #[error("cd: {}: {source}", .path.display())]
    ChangeDir { path: PathBuf, source: io::Error },
}

impl ShellError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fork(_))
    }

    /// errno-style return code for the line.
    pub fn code(&self) -> i32 {
        match self {
            ShellError::EmptyCommand | ShellError::NulByte => Errno::EINVAL as i32,
            ShellError::Redirect { source, .. } | ShellError::ChangeDir { source, .. } => {
                source.raw_os_error().unwrap_or(Errno::EIO as i32)
            }
            ShellError::Pipe(errno) | ShellError::Fork(errno) | ShellError::Wait(errno) => {
                *errno as i32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_reads_as_invalid_argument() {
        let err = ShellError::EmptyCommand;
        assert_eq!(err.to_string(), "Invalid argument");
        assert_eq!(err.code(), libc::EINVAL);
        assert!(!err.is_fatal());
    }

    #[test]
    fn only_fork_failure_is_fatal() {
        assert!(ShellError::Fork(Errno::EAGAIN).is_fatal());
        assert!(!ShellError::Pipe(Errno::EMFILE).is_fatal());
        assert!(!ShellError::Wait(Errno::ECHILD).is_fatal());
    }

    #[test]
    fn redirect_error_carries_os_code() {
        let err = ShellError::Redirect {
            path: PathBuf::from("missing.txt"),
            source: io::Error::from_raw_os_error(libc::ENOENT),
        };
        assert_eq!(err.code(), libc::ENOENT);
        assert!(err.to_string().starts_with("missing.txt: "));
    }
}
