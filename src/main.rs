use std::process::exit;

use clap::Parser;
use log::debug;
use vigilant_flash::{
    cli::{self, Cli},
    logging::initialize_logger,
};

fn main() {
    miette::set_panic_hook();

    // Attempt to parse any provided command-line arguments, or print the help
    // message and terminate if the invocation is not correct.
    let args = Cli::parse();
    initialize_logger(args.log_level);
    debug!("{:#?}", args);

    if let Err(err) = cli::run(&args) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));

        exit(code)
    }
}
