use std::io;

use crossterm::tty::IsTty;

/// Run-time switches for the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellConfig {
    /// Render the prompt before each line. Off when input is piped in from a
    /// file or a test harness so it does not end up in the output.
    pub show_prompt: bool,
}

impl ShellConfig {
    /// Prompt flags win; otherwise the prompt follows whether stdin is a
    /// terminal.
    pub fn from_args(args: &[String]) -> Self {
        Self::resolve(args, io::stdin().is_tty())
    }

    fn resolve(args: &[String], stdin_is_tty: bool) -> Self {
        let mut show_prompt = stdin_is_tty;
        for arg in args {
            match arg.as_str() {
                "-p" | "--prompt" => show_prompt = true,
                "-n" | "--no-prompt" => show_prompt = false,
                _ => {}
            }
        }
        Self { show_prompt }
    }

    pub fn interactive(&self) -> bool {
        self.show_prompt
    }
}
