//! Normalization of tool backend responses into display strings.

use serde_json::Value;

pub const NO_RESULTS: &str = "No results found.";
pub const NO_MATCHING_PHENOTYPES: &str = "No matching phenotypes found.";

/// Candidates listed per phenotype query, best match included.
const PHENOTYPE_CANDIDATES: usize = 3;

/// How a backend's `result` field is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// `result` re-serialized as compact JSON.
    Json,
    /// `result` is a list of `{ query, results: [{ name, id, cosine_similarity }] }`.
    PhenotypeMatches,
}

/// Render a backend response body.
pub fn format_response(format: ResultFormat, body: &Value) -> String {
    let result = match body.get("result") {
        None | Some(Value::Null) => return NO_RESULTS.to_string(),
        Some(result) => result,
    };

    match format {
        ResultFormat::Json => result.to_string(),
        ResultFormat::PhenotypeMatches => format_phenotype_matches(result),
    }
}

fn format_phenotype_matches(result: &Value) -> String {
    let entries = match result.as_array() {
        Some(entries) if !entries.is_empty() => entries,
        _ => return NO_MATCHING_PHENOTYPES.to_string(),
    };

    entries
        .iter()
        .map(format_query_matches)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_query_matches(entry: &Value) -> String {
    let query = text_field(entry, "query");
    let matches = entry
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(best) = matches.first() else {
        return format!("Query: \"{query}\"\n{NO_MATCHING_PHENOTYPES}");
    };

    let candidates = matches
        .iter()
        .take(PHENOTYPE_CANDIDATES)
        .enumerate()
        .map(|(i, m)| {
            let score = match m.get("cosine_similarity").and_then(Value::as_f64) {
                Some(score) => format!("{score:.2}"),
                None => "n/a".to_string(),
            };
            format!(
                "{}. {} (ID: `{}`, Score: {score})",
                i + 1,
                text_field(m, "name"),
                text_field(m, "id"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Query: \"{query}\"\nBest match: **{}** (ID: `{}`)\nOther potential matches:\n{candidates}",
        text_field(best, "name"),
        text_field(best, "id"),
    )
}

fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
