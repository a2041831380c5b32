use crate::model::Complexity;

/// Keyword signals gathered from lowercased SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySignals {
    pub joins: usize,
    pub conditions: usize,
    pub aggregation: bool,
    pub subquery: bool,
    pub ordering: bool,
    pub window_function: bool,
    pub having: bool,
    pub union: bool,
    pub cte: bool,
}

impl QuerySignals {
    pub fn scan(sql: &str) -> Self {
        let sql = sql.to_lowercase();
        let has = |needle: &str| sql.contains(needle);

        Self {
            joins: sql.matches("join").count(),
            conditions: sql.matches(" and ").count() + sql.matches(" or ").count(),
            aggregation: ["group by", "count(", "sum(", "avg(", "max(", "min("]
                .iter()
                .any(|k| has(k)),
            subquery: sql.matches("select").count() > 1,
            ordering: has("order by"),
            window_function: ["over (", "over(", "rank()", "row_number()"]
                .iter()
                .any(|k| has(k)),
            having: has("having "),
            union: has("union "),
            cte: has("with ") && (has(" as (") || has(" as(")),
        }
    }

    pub fn complexity(&self) -> Complexity {
        let heavy_input = self.aggregation || self.subquery;

        if (self.joins > 2 && heavy_input)
            || self.window_function
            || self.union
            || (self.aggregation && self.having)
            || self.cte
            || self.conditions > 5
        {
            Complexity::High
        } else if (self.joins > 0 && heavy_input) || self.conditions > 2 || self.joins > 1 {
            Complexity::Medium
        } else if self.joins > 0 || heavy_input || self.ordering {
            Complexity::LowMedium
        } else {
            Complexity::Low
        }
    }
}

pub fn analyze_complexity(sql: &str) -> Complexity {
    QuerySignals::scan(sql).complexity()
}
