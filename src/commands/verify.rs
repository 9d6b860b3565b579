//! # Verify Command Implementation
//!
//! The `verify` subcommand checks whether the generated output is current. It
//! performs a trial run against the output directory, compares checksums of
//! every file before and after, and then restores the directory, so the
//! command never leaves changes behind.
//!
//! Exits successfully when nothing would change; otherwise lists the paths
//! that would be added, removed or changed and fails.

use anyhow::Result;
use clap::Args;

use gomerge::output::{marker, OutputConfig};
use gomerge::phases::orchestrator;
use gomerge::suggestions;

use super::{engine_error, EngineArgs};

/// Check that the output directory is up to date without changing it
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Execute the `verify` command.
pub fn execute(args: VerifyArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let config = args.engine.load_config()?;
    args.engine.check_output_dir()?;
    let oracle = args.engine.oracle();

    let report = orchestrator::verify(&config, &args.engine.output_dir, &args.engine.pkg, &*oracle)
        .map_err(engine_error)?;

    if report.is_up_to_date() {
        println!(
            "{} Generated code in {} is up to date",
            marker(&out, "✅", "[OK]"),
            args.engine.output_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Regenerating would change {}:",
        marker(&out, "❌", "[ERR]"),
        args.engine.output_dir.display()
    );
    print!("{}", report.diff);
    Err(suggestions::stale_output(&args.engine.output_dir))
}
