use super::exit_codes;
use crate::cli::args::CheckArgs;
use querybench_core::config::load_config;
use querybench_core::providers::db::{connect, redact_dsn};

/// Connects, pings and prints the environment snapshot as JSON on stdout.
pub async fn cmd_check(args: CheckArgs) -> anyhow::Result<i32> {
    let mut cfg = match load_config(&args.config, false) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    if let Some(dsn) = args.dsn {
        cfg.dsn = dsn;
    }

    let backend = match connect(&cfg.dsn, 1).await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("connection test failed ({}): {:#}", redact_dsn(&cfg.dsn), e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let snapshot = backend.snapshot().await?;
    eprintln!("connection ok: {}", backend.backend_name());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(exit_codes::OK)
}
