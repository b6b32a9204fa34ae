// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the remote query service.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display};

/// Service endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// Translate a question into SQL (optionally executing it).
    #[default]
    Compile,
    /// Check on a submitted request.
    PollStatus,
    /// Fetch a stored chat history item, executing its SQL.
    FetchHistoryItem,
    /// List the database connections registered for the API key.
    ListConnections,
    /// Check whether the API key is accepted.
    IsAuth,
}

impl Endpoint {
    /// URL path appended to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Compile => "/language_to_sql",
            Self::PollStatus => "/language_to_sql_process",
            Self::FetchHistoryItem => "/get_my_chat_history",
            Self::ListConnections => "/list_connections",
            Self::IsAuth => "/isauth",
        }
    }
}

/// One request to the query service.
///
/// Every field except `endpoint` is optional; absent fields are not sent.
/// The API key is not part of the request; the transport holds it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteQueryRequest {
    pub endpoint: Endpoint,
    pub text_query: Option<String>,
    pub table_name: Option<String>,
    pub resource_name: Option<String>,
    pub schema: Option<String>,
    pub engine: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub execute_sql: Option<bool>,
    pub is_generate_code: Option<bool>,
    pub chat_history_size: Option<u32>,
    pub experimental_features: Option<String>,
    pub warehouse: Option<String>,
    pub team_id: Option<String>,
    pub user_id: Option<String>,
    pub id: Option<String>,
}

impl RemoteQueryRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Query-string pairs using the service's parameter names.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((name, value));
            }
        };

        push("text_query", self.text_query.clone());
        push("table_name", self.table_name.clone());
        push("resourcename", self.resource_name.clone());
        push("db_schema", self.schema.clone());
        push("ai_engine", self.engine.clone());
        push("ai_model", self.model.clone());
        push("ai_temp", self.temperature.map(|t| t.to_string()));
        push("execute_sql", self.execute_sql.map(python_bool));
        push("is_generate_code", self.is_generate_code.map(python_bool));
        push("chat_history_size", self.chat_history_size.map(|n| n.to_string()));
        push("experimental_features", self.experimental_features.clone());
        push("db_warehouse", self.warehouse.clone());
        push("team_id", self.team_id.clone());
        push("user_id", self.user_id.clone());
        push("id", self.id.clone());

        pairs
    }
}

/// The service parses booleans in their capitalized spelling.
fn python_bool(value: bool) -> String {
    let spelled = if value { "True" } else { "False" };
    spelled.to_string()
}

/// Processing state reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum QueryStatus {
    Processing,
    Done,
    Error,
}

/// A decoded service response. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteQueryResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Result rows: usually an array of objects keyed by column name.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub base64_encoded_chart_image: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub chat_history_id: Option<String>,
    #[serde(default)]
    pub score: Option<serde_json::Value>,
    #[serde(default)]
    pub intermediate_steps: Option<serde_json::Value>,
    #[serde(default)]
    pub ai_response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteQueryResponse {
    /// Tri-state status. `processing_sql` counts as processing; a missing
    /// status means done.
    pub fn status(&self) -> QueryStatus {
        match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("processing" | "processing_sql") => QueryStatus::Processing,
            Some("error" | "failed") => QueryStatus::Error,
            _ => QueryStatus::Done,
        }
    }
}

/// Ids arrive as either JSON strings or integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The question being asked, with the identifiers the service attributes it to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Question {
    pub text: String,
    pub team_id: Option<String>,
    pub user_id: Option<String>,
}

/// Everything the submit/poll/fetch chain produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub chat_history_id: String,
    /// The poll result once SQL generation finished.
    pub compiled: RemoteQueryResponse,
    /// The stored item with its SQL executed.
    pub answer: RemoteQueryResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_use_service_names_and_skip_absent_fields() {
        let request = RemoteQueryRequest {
            text_query: Some("show revenue".into()),
            resource_name: Some("sales-db".into()),
            schema: Some("public".into()),
            execute_sql: Some(false),
            ..RemoteQueryRequest::new(Endpoint::Compile)
        };
        let pairs = request.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("text_query", "show revenue".to_string()),
                ("resourcename", "sales-db".to_string()),
                ("db_schema", "public".to_string()),
                ("execute_sql", "False".to_string()),
            ]
        );
    }

    #[test]
    fn status_mapping() {
        let with = |s: Option<&str>| RemoteQueryResponse {
            status: s.map(String::from),
            ..RemoteQueryResponse::default()
        };
        assert_eq!(with(Some("processing_sql")).status(), QueryStatus::Processing);
        assert_eq!(with(Some("processing")).status(), QueryStatus::Processing);
        assert_eq!(with(Some("error")).status(), QueryStatus::Error);
        assert_eq!(with(Some("done")).status(), QueryStatus::Done);
        assert_eq!(with(None).status(), QueryStatus::Done);
    }

    #[test]
    fn chat_history_id_accepts_numbers_and_strings() {
        let numeric: RemoteQueryResponse =
            serde_json::from_str(r#"{"chat_history_id": 42}"#).unwrap();
        assert_eq!(numeric.chat_history_id.as_deref(), Some("42"));

        let text: RemoteQueryResponse =
            serde_json::from_str(r#"{"chat_history_id": "abc-1"}"#).unwrap();
        assert_eq!(text.chat_history_id.as_deref(), Some("abc-1"));

        let missing: RemoteQueryResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.chat_history_id.is_none());
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Compile.path(), "/language_to_sql");
        assert_eq!(Endpoint::PollStatus.path(), "/language_to_sql_process");
        assert_eq!(Endpoint::FetchHistoryItem.path(), "/get_my_chat_history");
        assert_eq!(Endpoint::FetchHistoryItem.as_ref(), "fetch_history_item");
    }
}
