//! Nestile - command-line tool for converting images into NES tile data

use std::process::ExitCode;

use nestile::cli;

fn main() -> ExitCode {
    cli::run()
}
