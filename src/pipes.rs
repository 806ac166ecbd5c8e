use std::ffi::CString;
use std::fmt;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, pipe2, ForkResult, Pid};

use crate::command::Command;
use crate::error::ShellError;
use crate::parser::Pipeline;
use crate::redirects::Redirections;
use crate::signal_handler;

/// How a foreground pipeline finished, as observed on its last stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
}

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus::Exited(0);

    /// Shell-style numeric code: the exit code, or 128 + signal number.
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Signaled(sig) => 128 + *sig as i32,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "Exited with status {}", code),
            ExitStatus::Signaled(sig) => write!(f, "Terminated by signal {}", sig),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed(ExitStatus),
    /// Spawned and left running; the pids belong to the caller now.
    Background(Vec<Pid>),
}

struct Channel {
    read: OwnedFd,
    write: OwnedFd,
}

/// Every pipe of one pipeline. Channel `i` joins stage `i`'s stdout to stage
/// `i + 1`'s stdin.
///
/// The whole table is allocated before the first fork, so each child inherits
/// all ends and must close the ones it does not use. The parent drops the
/// table after the last fork.
pub struct Channels {
    channels: Vec<Channel>,
}

impl Channels {
    /// Allocates `stages - 1` pipes. On failure the pipes created so far are
    /// closed and nothing is returned.
    pub fn open(stages: usize) -> Result<Self, ShellError> {
        let count = stages.saturating_sub(1);
        let mut channels = Vec::with_capacity(count);
        for _ in 0..count {
            // close-on-exec is a backstop; children still close every end
            let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
            channels.push(Channel { read, write });
        }
        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Read end feeding `stage`, if it has a predecessor.
    pub fn reader_for(&self, stage: usize) -> Option<RawFd> {
        let index = stage.checked_sub(1)?;
        self.channels.get(index).map(|c| c.read.as_raw_fd())
    }

    /// Write end `stage` produces into, if it has a successor.
    pub fn writer_for(&self, stage: usize) -> Option<RawFd> {
        self.channels.get(stage).map(|c| c.write.as_raw_fd())
    }

    pub fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.channels
            .iter()
            .flat_map(|c| [c.read.as_raw_fd(), c.write.as_raw_fd()])
    }
}

/// Executes a parsed line. One code path serves every stage count; a single
/// command is just a pipeline without channels.
pub fn run_pipeline(pipeline: &Pipeline) -> Result<Outcome, ShellError> {
    if pipeline.is_noop() {
        return Ok(Outcome::Completed(ExitStatus::SUCCESS));
    }

    let children = spawn_pipeline(pipeline)?;
    if pipeline.background {
        debug!("left {} process(es) running in background", children.len());
        return Ok(Outcome::Background(children));
    }

    wait_pipeline(&children).map(Outcome::Completed)
}

/// Forks one child per stage, in order, and returns their pids. Every
/// descriptor the parent opened for the pipeline is closed on return.
pub fn spawn_pipeline(pipeline: &Pipeline) -> Result<Vec<Pid>, ShellError> {
    let argvs = pipeline
        .commands
        .iter()
        .map(Command::to_argv)
        .collect::<Result<Vec<_>, _>>()?;
    if argvs.is_empty() {
        return Err(ShellError::EmptyCommand);
    }

    let redirections = Redirections::open(pipeline)?;
    let channels = Channels::open(argvs.len())?;
    debug!(
        "spawning {} stage(s) over {} channel(s)",
        argvs.len(),
        channels.len()
    );

    let last = argvs.len() - 1;
    let mut children = Vec::with_capacity(argvs.len());
    for (stage, argv) in argvs.iter().enumerate() {
        let stdin = if stage == 0 {
            redirections.input_fd()
        } else {
            channels.reader_for(stage)
        };
        let stdout = if stage == last {
            redirections.output_fd()
        } else {
            channels.writer_for(stage)
        };

        // SAFETY: the child only resets signals, moves descriptors and calls
        // execvp with an argv built before the fork.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => exec_stage(argv, stdin, stdout, &channels, &redirections),
            Ok(ForkResult::Parent { child }) => {
                debug!(
                    "stage {} `{}` is pid {}",
                    stage,
                    argv[0].to_string_lossy(),
                    child
                );
                children.push(child);
            }
            Err(errno) => return Err(ShellError::Fork(errno)),
        }
    }

    drop(channels);
    drop(redirections);
    Ok(children)
}

fn exec_stage(
    argv: &[CString],
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    channels: &Channels,
    redirections: &Redirections,
) -> ! {
    signal_handler::restore_defaults();

    let wired = redirect(stdin, libc::STDIN_FILENO)
        .and_then(|_| redirect(stdout, libc::STDOUT_FILENO));

    for fd in channels.raw_fds().chain(redirections.raw_fds()) {
        if fd > libc::STDERR_FILENO {
            // SAFETY: the owners of these descriptors never run in this
            // process again; it either execs or aborts below.
            unsafe { libc::close(fd) };
        }
    }

    if wired.is_ok() {
        let _ = execvp(&argv[0], argv);
    }

    let _ = io::stderr().write_all(b"Invalid command\n");
    // no core file for a program that was never started
    let _ = setrlimit(Resource::RLIMIT_CORE, 0, 0);
    std::process::abort()
}

fn redirect(fd: Option<RawFd>, target: RawFd) -> nix::Result<()> {
    match fd {
        // already in place, but may still be close-on-exec
        // SAFETY: descriptor flag update, no memory involved.
        Some(fd) if fd == target => {
            Errno::result(unsafe { libc::fcntl(fd, libc::F_SETFD, 0) }).map(drop)
        }
        // SAFETY: plain descriptor duplication, no memory involved.
        Some(fd) => Errno::result(unsafe { libc::dup2(fd, target) }).map(drop),
        None => Ok(()),
    }
}

/// Waits for every child in spawn order and reports the last one's status.
/// Statuses of earlier stages are reaped and discarded.
pub fn wait_pipeline(children: &[Pid]) -> Result<ExitStatus, ShellError> {
    let mut status = ExitStatus::SUCCESS;
    let last = children.len().saturating_sub(1);

    for (stage, &pid) in children.iter().enumerate() {
        match wait_child(pid) {
            Ok(reaped) => {
                debug!("pid {} finished: {}", pid, reaped);
                if stage == last {
                    status = reaped;
                }
            }
            Err(errno) if stage == last => return Err(ShellError::Wait(errno)),
            Err(errno) => warn!("waitpid({}) failed: {}", pid, errno),
        }
    }

    Ok(status)
}

/// Blocks until `pid` terminates.
pub fn wait_child(pid: Pid) -> Result<ExitStatus, Errno> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ExitStatus::Exited(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(ExitStatus::Signaled(sig)),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }
}
