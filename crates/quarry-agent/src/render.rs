// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering of query service answers.
//!
//! One response becomes a short sequence of replies: the explanation and
//! score, the SQL in a code block, and the result rows as an aligned table.
//! Chart images are not rendered.

use quarry_query::{ChainOutcome, RemoteQueryResponse};
use serde_json::Value;
use tracing::warn;

/// Shown when the service produced neither SQL nor rows.
pub const NO_ANSWER_TEXT: &str =
    ":warning: Sorry, I couldn't turn that into a query. Please try rephrasing the question.";

/// Folds the compiled and executed chain results into one response.
///
/// The executed item wins; the compile result fills gaps.
pub fn combine(outcome: ChainOutcome) -> RemoteQueryResponse {
    let ChainOutcome {
        chat_history_id,
        compiled,
        answer,
    } = outcome;
    RemoteQueryResponse {
        status: answer.status.or(compiled.status),
        sql_query: non_empty(answer.sql_query).or(compiled.sql_query),
        result: answer.result.or(compiled.result),
        base64_encoded_chart_image: answer
            .base64_encoded_chart_image
            .or(compiled.base64_encoded_chart_image),
        chat_history_id: answer
            .chat_history_id
            .or(compiled.chat_history_id)
            .or(Some(chat_history_id)),
        score: answer.score.or(compiled.score),
        intermediate_steps: answer.intermediate_steps.or(compiled.intermediate_steps),
        ai_response: non_empty(answer.ai_response).or(compiled.ai_response),
        error: answer.error.or(compiled.error),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Reply texts for `response`, in posting order. Never empty.
///
/// With `debug` set, the service's intermediate steps are included.
pub fn render(response: &RemoteQueryResponse, debug: bool) -> Vec<String> {
    let prefix = response
        .chat_history_id
        .as_deref()
        .map(|id| format!("id={id}, "))
        .unwrap_or_default();
    let mut replies = Vec::new();

    let ai_response = response.ai_response.as_deref().unwrap_or("").trim();
    let score = response.score.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
    if !ai_response.is_empty() || score > 0.0 {
        let mut text = format!("{prefix}{ai_response}");
        if score > 0.0 {
            text.push_str(&format!(" The AI calculated score for this answer is: {score}"));
        }
        replies.push(text);
    }

    let sql = response.sql_query.as_deref().unwrap_or("").trim();
    if !sql.is_empty() {
        replies.push(format!("{prefix}```{sql}```"));
    }

    let rows = response.result.as_ref().and_then(render_rows);
    let has_rows = rows.is_some();
    if let Some(rows) = rows {
        replies.push(format!("{prefix}{rows}"));
    }

    if debug
        && let Some(steps) = &response.intermediate_steps
        && !is_blank(steps)
    {
        let pretty = serde_json::to_string_pretty(steps).unwrap_or_else(|_| steps.to_string());
        replies.push(format!("{prefix}intermediate steps:\n```{pretty}```"));
    }

    if sql.is_empty() && !has_rows {
        if let Some(error) = response.error.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            warn!(
                chat_history_id = ?response.chat_history_id,
                error,
                "query service returned no answer"
            );
        }
        replies.push(format!("{prefix}{NO_ANSWER_TEXT}"));
    }

    replies
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Result rows as a fenced block; `None` when there are none.
fn render_rows(result: &Value) -> Option<String> {
    if is_blank(result) {
        return None;
    }
    let tabular = match result {
        Value::Array(rows) => table(rows),
        _ => None,
    };
    let body = match tabular {
        Some(aligned) => aligned,
        None => serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()),
    };
    Some(format!("```\n{body}\n```"))
}

/// Aligned `| a | b |` table, when every row is an object.
///
/// Columns come from the first row.
fn table(rows: &[Value]) -> Option<String> {
    let headers: Vec<String> = rows.first()?.as_object()?.keys().cloned().collect();
    let mut grid = vec![headers.clone()];
    for row in rows {
        let row = row.as_object()?;
        grid.push(
            headers
                .iter()
                .map(|h| row.get(h).map(cell).unwrap_or_default())
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..headers.len())
        .map(|col| grid.iter().map(|r| r[col].chars().count()).max().unwrap_or(0))
        .collect();

    let lines: Vec<String> = grid
        .iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(value, &width)| format!("{value:<width$}"))
                .collect();
            format!("| {} |", cells.join(" | "))
        })
        .collect();
    Some(lines.join("\n"))
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}
