use super::exit_codes;
use crate::cli::args::RunArgs;
use anyhow::Context;
use querybench_core::config::{load_config, RunConfig};
use querybench_core::engine::{warmup, Runner};
use querybench_core::providers::db::connect;
use querybench_core::queries::{load_queries, save_queries, select_queries};
use querybench_core::report::{console, csv, json};

fn apply_overrides(cfg: &mut RunConfig, args: &RunArgs, verbose: bool) {
    if let Some(q) = &args.queries {
        cfg.queries_file = q.clone();
    }
    if let Some(dsn) = &args.dsn {
        cfg.dsn = dsn.clone();
    }
    if let Some(out) = &args.output {
        cfg.output_dir = out.clone();
    }
    if let Some(label) = &args.label {
        cfg.label = label.clone();
    }
    if let Some(n) = args.iterations {
        cfg.iterations = n;
    }
    if let Some(n) = args.concurrency {
        cfg.concurrency = n;
    }
    if let Some(n) = args.warmup {
        cfg.warmup_iterations = n;
    }
    if let Some(secs) = args.timeout {
        cfg.timeout_seconds = secs;
    }
    if verbose {
        cfg.verbose = true;
    }
    cfg.normalize();
}

pub async fn cmd_run(args: RunArgs, verbose: bool) -> anyhow::Result<i32> {
    let mut cfg = match load_config(&args.config, args.strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    apply_overrides(&mut cfg, &args, verbose);

    let all = match load_queries(&cfg.queries_file) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let queries = match select_queries(&all, &args.select, args.limit) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    tracing::info!(
        event = "queries.loaded",
        loaded = all.len(),
        selected = queries.len(),
        path = %cfg.queries_file.display()
    );

    if let Some(path) = &args.save_queries {
        save_queries(&queries, path)?;
    }

    let backend = connect(&cfg.dsn, cfg.concurrency)
        .await
        .context("failed to connect to database")?;

    warmup(backend.clone(), cfg.warmup_iterations, cfg.concurrency).await;

    let run = Runner::new(backend, cfg.clone()).run(&queries).await?;

    json::save_json(&run, &cfg.output_dir)?;
    json::save_summary_json(&run, &cfg.output_dir)?;
    csv::save_csv(&run, &cfg.output_dir)?;
    if args.detailed_csv {
        csv::save_detailed_csv(&run, &cfg.output_dir)?;
    }
    console::print_summary(&run);

    if args.strict && run.summary.failed_executions > 0 {
        eprintln!(
            "\n{} of {} executions failed",
            run.summary.failed_executions, run.summary.total_executions
        );
        return Ok(exit_codes::QUERY_ERRORS);
    }
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_overrides_and_normalize() {
        let w = Wrapper::parse_from([
            "run",
            "--label",
            "after",
            "--iterations",
            "0",
            "--concurrency",
            "9",
            "--dsn",
            "sqlite::memory:",
        ]);
        let mut cfg = RunConfig::default();
        apply_overrides(&mut cfg, &w.args, true);

        assert_eq!(cfg.label, "after");
        assert_eq!(cfg.iterations, querybench_core::config::DEFAULT_ITERATIONS);
        assert_eq!(cfg.concurrency, 9);
        assert_eq!(cfg.dsn, "sqlite::memory:");
        assert!(cfg.verbose);
    }
}
