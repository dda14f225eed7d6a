//! Parameter-binding WHERE clause builder
//!
//! Clause text only ever contains allow-listed column names and `?`
//! placeholders; every user-supplied value travels in `params`.

use rusqlite::types::Value as SqlValue;

/// AND-joined WHERE conditions with their bound parameters
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one clause with its parameters (one per `?` in `clause`)
    pub fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = SqlValue>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    /// Add `column = ?`
    pub fn push_eq(&mut self, column: &'static str, value: impl Into<SqlValue>) {
        self.push(format!("{} = ?", column), [value.into()]);
    }

    /// Add a case-insensitive substring match on `column`
    pub fn push_contains(&mut self, column: &'static str, term: &str) {
        self.push(contains_clause(column), [SqlValue::Text(like_pattern(term))]);
    }

    /// Add a substring match on any of `columns`, OR-combined
    pub fn push_contains_any(&mut self, columns: &[&'static str], term: &str) {
        if columns.is_empty() {
            return;
        }
        let pattern = like_pattern(term);
        let clause = columns
            .iter()
            .map(|c| contains_clause(c))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(
            format!("({})", clause),
            columns.iter().map(|_| SqlValue::Text(pattern.clone())),
        );
    }

    /// Add an OR-group of `column IN (?, ...)` membership tests.
    ///
    /// Empty value lists are skipped; if every list is empty nothing is added.
    pub fn push_any_in(&mut self, groups: Vec<(&'static str, Vec<SqlValue>)>) {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        for (column, values) in groups {
            if values.is_empty() {
                continue;
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            parts.push(format!("{} IN ({})", column, placeholders));
            params.extend(values);
        }
        if !parts.is_empty() {
            self.push(format!("({})", parts.join(" OR ")), params);
        }
    }

    /// Combine with another set of conditions
    pub fn and(mut self, other: &Conditions) -> Self {
        self.clauses.extend(other.clauses.iter().cloned());
        self.params.extend(other.params.iter().cloned());
        self
    }

    /// ` WHERE ...` or an empty string
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

fn contains_clause(column: &str) -> String {
    format!("LOWER(CAST({} AS TEXT)) LIKE ? ESCAPE '\\'", column)
}

/// `%term%` with LIKE wildcards in the lower-cased term escaped
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Evil"), "%evil%");
        assert_eq!(like_pattern("50%_x\\"), "%50\\%\\_x\\\\%");
    }

    #[test]
    fn test_empty_conditions() {
        let cond = Conditions::new();
        assert_eq!(cond.where_sql(), "");
        assert!(cond.params().is_empty());
    }

    #[test]
    fn test_clauses_and_params_line_up() {
        let mut cond = Conditions::new();
        cond.push_eq("report_type", "scan_ssh".to_string());
        cond.push_contains_any(&["ip", "tag"], "1.2");

        assert_eq!(
            cond.where_sql(),
            " WHERE report_type = ? AND (LOWER(CAST(ip AS TEXT)) LIKE ? ESCAPE '\\' \
             OR LOWER(CAST(tag AS TEXT)) LIKE ? ESCAPE '\\')"
        );
        assert_eq!(cond.params().len(), 3);
        assert_eq!(cond.params()[0], SqlValue::Text("scan_ssh".into()));
    }

    #[test]
    fn test_any_in_skips_empty_groups() {
        let mut cond = Conditions::new();
        cond.push_any_in(vec![
            ("ip", vec![SqlValue::Text("8.8.8.8".into())]),
            ("hostname", vec![]),
            ("asn", vec![SqlValue::Integer(1), SqlValue::Integer(2)]),
        ]);
        assert_eq!(cond.where_sql(), " WHERE (ip IN (?) OR asn IN (?, ?))");
        assert_eq!(cond.params().len(), 3);

        let mut none = Conditions::new();
        none.push_any_in(vec![("ip", vec![])]);
        assert_eq!(none.where_sql(), "");
        assert!(none.params().is_empty());
    }

    #[test]
    fn test_and_concatenates_in_order() {
        let mut base = Conditions::new();
        base.push_eq("asn", 64512_i64);
        let mut extra = Conditions::new();
        extra.push_contains("geo", "de");

        let combined = base.and(&extra);
        assert_eq!(
            combined.where_sql(),
            " WHERE asn = ? AND LOWER(CAST(geo AS TEXT)) LIKE ? ESCAPE '\\'"
        );
        assert_eq!(
            combined.params(),
            &[SqlValue::Integer(64512), SqlValue::Text("%de%".into())]
        );
    }
}
