use super::exit_codes;
use crate::cli::args::{CompareArgs, OutputFormat};
use querybench_core::compare::compare;
use querybench_core::report::{console, json};

pub fn cmd_compare(args: CompareArgs) -> anyhow::Result<i32> {
    let before = match json::load_run(&args.before) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let after = match json::load_run(&args.after) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let cmp = compare(before, after);

    if let Some(dir) = &args.output {
        let path = json::save_comparison_json(&cmp, dir)?;
        eprintln!("wrote file: {}", path.display());
    }

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cmp.query_comparisons)?)
        }
        OutputFormat::Text => console::print_comparison(&cmp),
    }
    Ok(exit_codes::OK)
}
