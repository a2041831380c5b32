pub mod check;
pub mod compare;
pub mod run;

use crate::cli::args::{Cli, Command, InitArgs};
use querybench_core::config::write_default_config;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// The run completed but at least one execution failed (only with `--strict`).
    pub const QUERY_ERRORS: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::cmd_run(args, cli.verbose).await,
        Command::Compare(args) => compare::cmd_compare(args),
        Command::Check(args) => check::cmd_check(args).await,
        Command::Init(args) => cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() && !args.force {
        eprintln!(
            "config already exists: {} (use --force to overwrite)",
            args.config.display()
        );
        return Ok(exit_codes::CONFIG_ERROR);
    }
    if let Err(e) = write_default_config(&args.config) {
        eprintln!("{}", e);
        return Ok(exit_codes::CONFIG_ERROR);
    }
    eprintln!("wrote file: {}", args.config.display());
    Ok(exit_codes::OK)
}
