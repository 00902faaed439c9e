//! feature-impact binary - the same CLI as `omp-impact` under the name the
//! packaged tool was first published with.

use clap::Parser;
use omp_impact::cli::{run, Cli};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
