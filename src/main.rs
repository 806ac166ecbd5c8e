use std::env;
use std::io;
use std::process;

mod command;
mod config;
mod error;
mod jobs;
mod parser;
mod pipes;
mod prompt;
mod redirects;
mod shell;
mod signal_handler;

use config::ShellConfig;

fn print_help() {
    println!("pipesh - minimal pipeline shell");
    println!();
    println!("Usage: pipesh [OPTIONS] < script");
    println!("  -h, --help       Print this help");
    println!("  -v, --version    Print version");
    println!("  -p, --prompt     Always show the prompt");
    println!("  -n, --no-prompt  Never show the prompt");
    println!();
    println!("Set PIPESH_LOG=debug to trace process creation on stderr.");
}

fn print_version() {
    println!("pipesh v{}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        process::exit(0);
    }

    if args.iter().any(|a| a == "-v" || a == "--version" || a == "-V") {
        print_version();
        process::exit(0);
    }

    env_logger::Builder::from_env(env_logger::Env::new().filter_or("PIPESH_LOG", "warn")).init();

    let config = ShellConfig::from_args(&args);
    log::debug!("starting with {:?}", config);

    let mut shell = shell::Shell::new(config);
    let code = shell.run(io::stdin().lock());

    process::exit(code);
}
