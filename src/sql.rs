//! SQL statements sent to the Logfire query endpoint.
//!
//! Every caller-supplied value that ends up inside a template goes through
//! this module so quoting happens in one place.

pub const DEFAULT_PROJECT: &str = "vibemachine";
pub const DEFAULT_LIMIT: u32 = 5;

pub fn list_projects() -> String {
    "SELECT DISTINCT service_name FROM records ORDER BY service_name".to_string()
}

pub fn recent_records(project: &str, limit: u32) -> String {
    format!(
        "SELECT start_timestamp, level, span_name, message, attributes \
         FROM records \
         WHERE service_name = {} \
         ORDER BY start_timestamp DESC \
         LIMIT {}",
        quote_literal(project),
        limit
    )
}

/// Render `value` as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
