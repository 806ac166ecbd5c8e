use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::error::ShellError;
use crate::parser::Pipeline;

const OUTPUT_MODE: u32 = 0o644;

/// Files backing the `<` and `>` redirections of one pipeline.
///
/// Opened by the shell before any child is forked; each child dups the one it
/// needs and closes both, the shell drops them once the spawn loop is done.
#[derive(Debug, Default)]
pub struct Redirections {
    input: Option<File>,
    output: Option<File>,
}

impl Redirections {
    pub fn open(pipeline: &Pipeline) -> Result<Self, ShellError> {
        let input = pipeline.input.as_deref().map(open_input).transpose()?;
        let output = pipeline.output.as_deref().map(open_output).transpose()?;
        Ok(Self { input, output })
    }

    pub fn input_fd(&self) -> Option<RawFd> {
        self.input.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn output_fd(&self) -> Option<RawFd> {
        self.output.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.input_fd().into_iter().chain(self.output_fd())
    }
}

fn open_input(path: &Path) -> Result<File, ShellError> {
    File::open(path).map_err(|source| ShellError::Redirect {
        path: path.to_path_buf(),
        source,
    })
}

fn open_output(path: &Path) -> Result<File, ShellError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(path)
        .map_err(|source| ShellError::Redirect {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn no_redirections_opens_nothing() {
        let redirections = Redirections::open(&parse_line("ls")).unwrap();
        assert_eq!(redirections.raw_fds().count(), 0);
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let line = format!("cat < {}", dir.path().join("nope").display());
        let err = Redirections::open(&parse_line(&line)).unwrap_err();
        assert!(matches!(err, ShellError::Redirect { .. }));
        assert_eq!(err.code(), libc::ENOENT);
    }

    #[test]
    fn output_file_is_created_with_0644_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        fs::write(&out, "old contents that are long").unwrap();
        fs::set_permissions(&out, fs::Permissions::from_mode(0o600)).unwrap();

        let line = format!("echo > {}", out.display());
        let redirections = Redirections::open(&parse_line(&line)).unwrap();
        assert!(redirections.output_fd().is_some());
        drop(redirections);
        assert_eq!(fs::read(&out).unwrap(), b"");

        let fresh = dir.path().join("fresh.txt");
        let line = format!("echo > {}", fresh.display());
        drop(Redirections::open(&parse_line(&line)).unwrap());
        let mode = fs::metadata(&fresh).unwrap().permissions().mode() & 0o777;
        // umask can only remove bits
        assert_eq!(mode & !0o644, 0);
    }
}
