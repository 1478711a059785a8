/// Fetchflow CLI
///
/// Runs scripts against canned fetch responses and inspects how sources are
/// split into statements.

use fetchflow_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
