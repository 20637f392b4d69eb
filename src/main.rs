use clap::Parser;
use envi_metadata::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    match commands::run(args) {
        Ok(stats) if stats.has_failures() => {
            // Failures have already been reported per file
            process::exit(1);
        }
        Ok(_stats) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
