use std::io::BufRead;

use log::{debug, warn};

use crate::command::Builtin;
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::jobs::JobManager;
use crate::parser::parse_line;
use crate::pipes::{run_pipeline, Outcome};
use crate::prompt::Prompt;
use crate::signal_handler;

/// What the loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

pub struct Shell {
    config: ShellConfig,
    prompt: Prompt,
    job_manager: JobManager,
    last_code: i32,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            prompt: Prompt::new(),
            job_manager: JobManager::new(),
            last_code: 0,
        }
    }

    /// Return code of the most recent line: 0, an errno, or the last stage's
    /// exit code.
    #[cfg(test)]
    pub fn last_code(&self) -> i32 {
        self.last_code
    }

    /// Prompts, reads and evaluates lines until input runs out (status 0) or
    /// the shell is told to stop.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> i32 {
        if self.config.interactive() {
            signal_handler::ignore_interrupts();
        }

        loop {
            self.collect_background_jobs();

            if self.config.show_prompt {
                if let Err(e) = self.prompt.display() {
                    warn!("could not write prompt: {}", e);
                }
            }

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => return 0,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    return 1;
                }
            }

            let line = line.trim_end_matches(['\n', '\r']);
            if let Flow::Exit(code) = self.evaluate(line) {
                return code;
            }
        }
    }

    /// Parses and runs one line, printing a diagnostic when it fails.
    pub fn evaluate(&mut self, line: &str) -> Flow {
        match self.execute(line) {
            Ok(Flow::Exit(code)) => Flow::Exit(code),
            Ok(Flow::Continue) => {
                debug!("`{}` finished with code {}", line, self.last_code);
                Flow::Continue
            }
            Err(e) => self.fail(e),
        }
    }

    /// Reports a failed line. Only fatal errors stop the shell.
    fn fail(&mut self, e: ShellError) -> Flow {
        self.last_code = e.code();
        eprintln!("{}", e);
        if e.is_fatal() {
            Flow::Exit(1)
        } else {
            Flow::Continue
        }
    }

    fn execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let pipeline = parse_line(line);

        if let Some(builtin) = Builtin::detect(&pipeline) {
            if builtin == Builtin::Exit {
                println!("Exiting the shell");
                return Ok(Flow::Exit(1));
            }
            builtin.execute()?;
            self.last_code = 0;
            return Ok(Flow::Continue);
        }

        match run_pipeline(&pipeline)? {
            Outcome::Completed(status) => {
                self.last_code = status.code();
                if !status.success() {
                    eprintln!("{}", status);
                }
            }
            Outcome::Background(pids) => {
                self.last_code = 0;
                let last_pid = pids.last().copied();
                let id = self.job_manager.add_job(pids, line.trim().to_string());
                if let (true, Some(pid)) = (self.config.interactive(), last_pid) {
                    println!("[{}] {}", id, pid);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn collect_background_jobs(&mut self) {
        for job in self.job_manager.update_jobs() {
            if self.config.interactive() {
                println!("[{}] Done {}", job.id, job.command);
            }
        }
    }
}
