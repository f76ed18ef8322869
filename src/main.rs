use anyhow::Result;
use bibxml_tools::cli;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Logging may not be initialized yet when config loading fails.
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
