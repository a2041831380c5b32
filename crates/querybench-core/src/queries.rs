use crate::errors::ConfigError;
use crate::model::QuerySpec;
use anyhow::Context;
use std::collections::HashSet;
use std::path::Path;

/// Loads a JSON array of query specs. Empty sets and duplicate names are rejected.
pub fn load_queries(path: &Path) -> Result<Vec<QuerySpec>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ConfigError(format!("failed to read queries file {}: {}", path.display(), e))
    })?;
    parse_queries(&raw)
        .map_err(|ConfigError(msg)| ConfigError(format!("{} (file: {})", msg, path.display())))
}

pub fn parse_queries(raw: &str) -> Result<Vec<QuerySpec>, ConfigError> {
    let queries: Vec<QuerySpec> = serde_json::from_str(raw)
        .map_err(|e| ConfigError(format!("failed to parse queries: {}", e)))?;

    if queries.is_empty() {
        return Err(ConfigError("query set is empty".into()));
    }

    let mut seen = HashSet::new();
    for q in &queries {
        if q.name.trim().is_empty() {
            return Err(ConfigError("query with empty name".into()));
        }
        if !seen.insert(q.name.as_str()) {
            return Err(ConfigError(format!("duplicate query name '{}'", q.name)));
        }
    }

    Ok(queries)
}

/// Picks the subset of queries to benchmark.
///
/// `all` keeps the set as is, `top` sorts by weight (highest first, stable),
/// anything else is a case-insensitive name prefix. `limit == 0` means no limit.
pub fn select_queries(
    all: &[QuerySpec],
    selection: &str,
    limit: usize,
) -> Result<Vec<QuerySpec>, ConfigError> {
    let mut picked: Vec<QuerySpec> = match selection {
        "all" => all.to_vec(),
        "top" => {
            let mut sorted = all.to_vec();
            sorted.sort_by(|a, b| b.weight.cmp(&a.weight));
            sorted
        }
        prefix => {
            let prefix = prefix.to_lowercase();
            let filtered: Vec<QuerySpec> = all
                .iter()
                .filter(|q| q.name.to_lowercase().starts_with(&prefix))
                .cloned()
                .collect();
            if filtered.is_empty() {
                return Err(ConfigError(format!("no queries found of type: {}", selection)));
            }
            filtered
        }
    };

    if limit > 0 && limit < picked.len() {
        picked.truncate(limit);
    }
    Ok(picked)
}

pub fn save_queries(queries: &[QuerySpec], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(queries).context("failed to serialize queries")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write queries file: {}", path.display()))?;
    tracing::info!(event = "queries.saved", count = queries.len(), path = %path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str, weight: u32) -> QuerySpec {
        QuerySpec {
            name: name.into(),
            description: String::new(),
            sql: "SELECT 1".into(),
            weight,
        }
    }

    #[test]
    fn test_parse_defaults_optional_fields() {
        let qs = parse_queries(r#"[{"name": "a", "sql": "SELECT 1"}]"#).unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].weight, 0);
        assert_eq!(qs[0].description, "");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = parse_queries(
            r#"[{"name": "a", "sql": "SELECT 1"}, {"name": "a", "sql": "SELECT 2"}]"#,
        )
        .unwrap_err();
        assert!(err.0.contains("duplicate query name 'a'"));
    }

    #[test]
    fn test_empty_and_malformed_rejected() {
        assert!(parse_queries("[]").is_err());
        assert!(parse_queries("{").is_err());
        assert!(parse_queries(r#"[{"name": " ", "sql": "x"}]"#).is_err());
    }

    #[test]
    fn test_select_top_is_stable_by_weight() {
        let all = vec![q("a", 1), q("b", 5), q("c", 5), q("d", 3)];
        let top = select_queries(&all, "top", 3).unwrap();
        let names: Vec<_> = top.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_select_by_prefix() {
        let all = vec![
            q("Consistency_orders", 1),
            q("datatype_dates", 1),
            q("consistency_users", 1),
        ];
        let picked = select_queries(&all, "consistency", 0).unwrap();
        assert_eq!(picked.len(), 2);
        assert!(select_queries(&all, "relationship", 0).is_err());
        assert_eq!(select_queries(&all, "all", 0).unwrap(), all);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.json");
        let all = vec![q("a", 1), q("b", 2)];
        save_queries(&all, &path).unwrap();
        assert_eq!(load_queries(&path).unwrap(), all);

        let missing = load_queries(&dir.path().join("nope.json")).unwrap_err();
        assert!(missing.0.contains("failed to read queries file"));
    }
}
