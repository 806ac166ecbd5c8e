//! Line splitting and pipeline parsing.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! cmd1 [args...] [< infile] [| cmd2 [args...]]* [> outfile] [&]
//! ```
//!
//! Redirections are only recognised as the trailing tokens of the first (`<`)
//! and last (`>`, `&`) stage. Anything that does not fit stays a literal
//! argument.

use std::path::PathBuf;

use crate::command::Command;

const PIPE: char = '|';
const BACKGROUND: &str = "&";
const REDIRECT_OUT: &str = ">";
const REDIRECT_IN: &str = "<";

/// One parsed input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub background: bool,
}

impl Pipeline {
    /// A blank line parses to a pipeline without commands.
    pub fn is_noop(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Splits the line into pipeline segments. Empty segments between
/// consecutive delimiters are dropped; whitespace-only segments are not.
pub fn split_stages(line: &str) -> Vec<&str> {
    line.split(PIPE).filter(|segment| !segment.is_empty()).collect()
}

pub fn split_words(segment: &str) -> Vec<String> {
    segment.split_whitespace().map(str::to_string).collect()
}

pub fn parse_line(line: &str) -> Pipeline {
    let mut pipeline = Pipeline::default();
    if line.trim().is_empty() {
        return pipeline;
    }

    let stages = split_stages(line);
    let last = stages.len().saturating_sub(1);

    for (i, stage) in stages.iter().enumerate() {
        let mut args = split_words(stage);

        if i == last && args.len() > 1 && args[args.len() - 1] == BACKGROUND {
            pipeline.background = true;
            args.pop();
        }

        if i == last && args.len() > 2 && args[args.len() - 2] == REDIRECT_OUT {
            pipeline.output = args.pop().map(PathBuf::from);
            args.pop();
        }

        if i == 0 && args.len() > 2 && args[args.len() - 2] == REDIRECT_IN {
            pipeline.input = args.pop().map(PathBuf::from);
            args.pop();
        }

        pipeline.commands.push(Command::new(args));
    }

    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pipeline: &Pipeline, stage: usize) -> Vec<&str> {
        pipeline.commands[stage]
            .args
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn simple_command() {
        let p = parse_line("ls -l /tmp");
        assert_eq!(p.commands.len(), 1);
        assert_eq!(args(&p, 0), ["ls", "-l", "/tmp"]);
        assert!(!p.background);
        assert_eq!(p.input, None);
        assert_eq!(p.output, None);
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let p = parse_line("  echo    a \t b  ");
        assert_eq!(args(&p, 0), ["echo", "a", "b"]);
    }

    #[test]
    fn blank_line_is_noop() {
        assert!(parse_line("").is_noop());
        assert!(parse_line("   ").is_noop());
    }

    #[test]
    fn three_stage_pipeline() {
        let p = parse_line("cat file | grep x | wc -l");
        assert_eq!(p.commands.len(), 3);
        assert_eq!(args(&p, 0), ["cat", "file"]);
        assert_eq!(args(&p, 1), ["grep", "x"]);
        assert_eq!(args(&p, 2), ["wc", "-l"]);
    }

    #[test]
    fn redirections_on_first_and_last_stage() {
        let p = parse_line("sort < in.txt | uniq > out.txt");
        assert_eq!(p.input, Some(PathBuf::from("in.txt")));
        assert_eq!(p.output, Some(PathBuf::from("out.txt")));
        assert_eq!(args(&p, 0), ["sort"]);
        assert_eq!(args(&p, 1), ["uniq"]);
    }

    #[test]
    fn single_stage_is_both_first_and_last() {
        let p = parse_line("cat < in > out &");
        assert!(p.background);
        assert_eq!(p.input, Some(PathBuf::from("in")));
        assert_eq!(p.output, Some(PathBuf::from("out")));
        assert_eq!(args(&p, 0), ["cat"]);
    }

    #[test]
    fn output_before_input_leaves_output_literal() {
        // only the trailing pair of each stage is considered
        let p = parse_line("cat > out < in");
        assert_eq!(p.input, Some(PathBuf::from("in")));
        assert_eq!(p.output, None);
        assert_eq!(args(&p, 0), ["cat", ">", "out"]);
    }

    #[test]
    fn background_flag_is_stripped() {
        let p = parse_line("sleep 5 &");
        assert!(p.background);
        assert_eq!(args(&p, 0), ["sleep", "5"]);
    }

    #[test]
    fn lone_ampersand_is_a_command() {
        let p = parse_line("&");
        assert!(!p.background);
        assert_eq!(args(&p, 0), ["&"]);
    }

    #[test]
    fn malformed_redirection_stays_literal() {
        let p = parse_line("echo >");
        assert_eq!(p.output, None);
        assert_eq!(args(&p, 0), ["echo", ">"]);

        let p = parse_line("< in");
        assert_eq!(p.input, None);
        assert_eq!(args(&p, 0), ["<", "in"]);
    }

    #[test]
    fn redirections_on_middle_stages_are_ignored() {
        let p = parse_line("a | b < x | c > y");
        assert_eq!(p.input, None);
        assert_eq!(p.output, Some(PathBuf::from("y")));
        assert_eq!(args(&p, 1), ["b", "<", "x"]);
    }

    #[test]
    fn empty_segments_are_dropped() {
        let p = parse_line("ls || wc");
        assert_eq!(p.commands.len(), 2);
        let p = parse_line("ls |");
        assert_eq!(p.commands.len(), 1);
    }

    #[test]
    fn whitespace_segment_is_an_empty_command() {
        let p = parse_line("ls | | wc");
        assert_eq!(p.commands.len(), 3);
        assert!(p.commands[1].is_empty());
    }
}
