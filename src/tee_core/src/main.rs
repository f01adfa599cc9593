//! Attested session binary entry point.

use tee_core::cli::CLI;

fn main() {
	CLI::execute();
}
