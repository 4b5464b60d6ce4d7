use clap::Parser;
use ocd::cli::{Cli, run_cli};
use ocd::logging::init_logging;
use ocd::output::OutputFormatter;

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.no_color) {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    if let Err(e) = run_cli(&cli) {
        OutputFormatter::error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
