use super::{ms_cell, output_path};
use crate::model::{QueryResult, RunResult};
use anyhow::Context;
use std::io;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 10] = [
    "name",
    "description",
    "executions",
    "errors",
    "avg_ms",
    "p95_ms",
    "min_ms",
    "max_ms",
    "rows",
    "complexity",
];

/// One row per query. Undefined latency cells are left empty.
pub fn save_csv(run: &RunResult, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_path(dir, "performance", &run.label, "csv")?;
    write_file(&path, &run.query_results, false)?;
    tracing::info!(event = "report.saved", kind = "csv", path = %path.display());
    Ok(path)
}

/// Same as [`save_csv`] with the SQL text as an extra column.
pub fn save_detailed_csv(run: &RunResult, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_path(dir, "performance-detailed", &run.label, "csv")?;
    write_file(&path, &run.query_results, true)?;
    tracing::info!(event = "report.saved", kind = "detailed_csv", path = %path.display());
    Ok(path)
}

fn write_file(path: &Path, results: &[QueryResult], with_sql: bool) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create csv report: {}", path.display()))?;
    write_rows(&mut wtr, results, with_sql)
        .with_context(|| format!("failed to write csv report: {}", path.display()))?;
    wtr.flush()
        .with_context(|| format!("failed to flush csv report: {}", path.display()))?;
    Ok(())
}

fn header(with_sql: bool) -> Vec<&'static str> {
    let mut cols = COLUMNS.to_vec();
    if with_sql {
        cols.insert(2, "sql");
    }
    cols
}

fn write_rows<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    results: &[QueryResult],
    with_sql: bool,
) -> csv::Result<()> {
    wtr.write_record(header(with_sql))?;

    for q in results {
        let mut record = vec![q.name.clone(), q.description.clone()];
        if with_sql {
            record.push(q.sql.clone());
        }
        record.extend([
            q.total_executions().to_string(),
            q.errors.to_string(),
            ms_cell(q.avg_duration),
            ms_cell(q.percentile95),
            ms_cell(q.min_duration),
            ms_cell(q.max_duration),
            q.rows_affected.to_string(),
            q.query_complexity.to_string(),
        ]);
        wtr.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::QueryAccumulator;
    use crate::model::{Execution, QuerySpec};
    use chrono::Utc;
    use std::time::Duration;

    fn result(outcome: Result<u64, &str>) -> QueryResult {
        let mut acc = QueryAccumulator::new(
            QuerySpec {
                name: "orders_by_day".into(),
                description: "orders, \"grouped\"".into(),
                sql: "SELECT day,\n count(*) FROM orders GROUP BY day".into(),
                weight: 1,
            },
            1,
        );
        acc.record(match outcome {
            Ok(ms) => Execution::success(Utc::now(), Duration::from_millis(ms), 3),
            Err(msg) => Execution::failure(Utc::now(), Duration::ZERO, msg),
        });
        acc.finish()
    }

    fn render(results: &[QueryResult], with_sql: bool) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, results, with_sql).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_rows_and_empty_cells() {
        let out = render(&[result(Ok(12)), result(Err("boom"))], false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "orders_by_day,\"orders, \"\"grouped\"\"\",1,0,12.00,12.00,12.00,12.00,3,low-medium"
        );
        assert_eq!(
            lines[2],
            "orders_by_day,\"orders, \"\"grouped\"\"\",1,1,,,,,0,low-medium"
        );
    }

    #[test]
    fn test_detailed_round_trips_through_reader() {
        let out = render(&[result(Ok(1))], true);
        let mut rdr = csv::Reader::from_reader(out.as_bytes());

        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.get(2), Some("sql"));
        assert_eq!(headers.len(), 11);

        let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(1), Some("orders, \"grouped\""));
        assert_eq!(
            rows[0].get(2),
            Some("SELECT day,\n count(*) FROM orders GROUP BY day")
        );
    }

    #[test]
    fn test_save_csv_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunResult {
            timestamp: Utc::now(),
            label: "before".into(),
            config: crate::config::RunConfig::default(),
            total_duration: Duration::from_secs(1),
            summary: crate::summary::summarize(&[result(Ok(4))]),
            query_results: vec![result(Ok(4))],
            environment: crate::model::EnvironmentSnapshot::unavailable("fake"),
        };
        let path = save_csv(&run, dir.path()).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().nth(1).unwrap().ends_with(",4.00,4.00,4.00,4.00,3,low-medium"));
    }
}
