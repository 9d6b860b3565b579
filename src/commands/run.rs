//! Run command implementation
//!
//! The run command executes a complete repackaging:
//! 1. Load and validate the configuration
//! 2. Relocate every program's module under `<output-dir>/internal`
//! 3. Rewrite references and promote entry points
//! 4. Write the dispatch file

use std::time::Instant;

use anyhow::Result;
use clap::Args;

use gomerge::output::{marker, OutputConfig};
use gomerge::phases::orchestrator;

use super::{engine_error, EngineArgs};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the run command
pub fn execute(args: RunArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let start_time = Instant::now();

    let config = args.engine.load_config()?;
    args.engine.check_output_dir()?;
    let oracle = args.engine.oracle();

    let report = orchestrator::run(&config, &args.engine.output_dir, &args.engine.pkg, &*oracle)
        .map_err(engine_error)?;

    if !args.quiet {
        println!(
            "{} Repackaged {} programs in {:.2}s",
            marker(&out, "✅", "[OK]"),
            report.commands.len(),
            start_time.elapsed().as_secs_f64()
        );
        for (command, import_path) in &report.commands {
            println!("   {} -> {}", out.highlight(command), import_path);
        }
        println!("   Dispatch file: {}", report.dispatch_file.display());
    }

    Ok(())
}
