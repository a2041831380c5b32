use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn table_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"from\s+([a-z0-9_]+)|join\s+([a-z0-9_]+)").ok())
        .as_ref()
}

/// Identifiers following `from` or `join`, deduplicated, in first-seen order.
pub fn extract_tables(sql: &str) -> Vec<String> {
    let Some(re) = table_pattern() else {
        return Vec::new();
    };

    let sql = sql.to_lowercase();
    let mut seen = HashSet::new();
    let mut tables = Vec::new();

    for caps in re.captures_iter(&sql) {
        let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if seen.insert(name.as_str()) {
            tables.push(name.as_str().to_string());
        }
    }

    tables
}
