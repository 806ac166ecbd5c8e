use std::env;
use std::io::{self, Write};

use colored::Colorize;

pub struct Prompt {
    marker: String,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            marker: String::from("$ "),
        }
    }

    /// Working directory in green followed by the marker. An unreadable
    /// working directory leaves just the marker.
    pub fn get_string(&self) -> String {
        match env::current_dir() {
            Ok(cwd) => format!("{}{}", cwd.display().to_string().green(), self.marker),
            Err(_) => self.marker.clone(),
        }
    }

    pub fn display(&self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(self.get_string().as_bytes())?;
        stdout.flush()
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}
