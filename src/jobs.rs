use std::collections::HashMap;

use log::{info, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// A background pipeline the shell did not wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: u32,
    /// Stages that have not been reaped yet.
    pub pids: Vec<Pid>,
    pub command: String,
}

/// Reaps background pipelines so they do not linger as zombies.
///
/// There is no job control: jobs are only tracked until every stage has
/// been collected, polled once per prompt with `WNOHANG`.
pub struct JobManager {
    jobs: HashMap<u32, Job>,
    next_id: u32,
}

impl JobManager {
    pub fn new() -> Self {
        JobManager {
            jobs: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn add_job(&mut self, pids: Vec<Pid>, command: String) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        info!("job [{}] started: {} ({} process(es))", id, command, pids.len());
        self.jobs.insert(id, Job { id, pids, command });
        id
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Collects every stage that has exited and returns the jobs that are now
    /// fully finished, ordered by id.
    pub fn update_jobs(&mut self) -> Vec<Job> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut completed = Vec::new();

        for (id, job) in self.jobs.iter_mut() {
            job.pids.retain(|&pid| !try_reap(pid));
            if job.pids.is_empty() {
                completed.push(*id);
            }
        }

        let mut finished: Vec<Job> = completed
            .into_iter()
            .filter_map(|id| self.jobs.remove(&id))
            .collect();
        finished.sort_by_key(|j| j.id);
        for job in &finished {
            info!("job [{}] done: {}", job.id, job.command);
        }
        finished
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

/// True once `pid` is gone, either reaped now or no longer our child.
fn try_reap(pid: Pid) -> bool {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return false,
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => return true,
            Ok(_) => return false,
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return true,
            Err(e) => {
                warn!("waitpid({}) failed: {}", pid, e);
                return false;
            }
        }
    }
}
