// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-deployment query settings and the requests built from them.

use quarry_config::model::{QueryConfig, QueryMode};

use crate::policy::RetryPolicy;
use crate::types::{Endpoint, Question, RemoteQueryRequest};

/// Connection-level settings attached to every question.
///
/// Built once from `[query]`; handlers receive it by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySettings {
    pub mode: QueryMode,
    pub table_name: Option<String>,
    pub resource_name: Option<String>,
    pub schema: Option<String>,
    pub warehouse: Option<String>,
    pub engine: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub chat_history_size: Option<u32>,
    pub experimental_features: Option<String>,
    pub short_retries: u32,
    pub long_retries: u32,
}

impl QuerySettings {
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            mode: config.mode,
            table_name: config.table_name.clone(),
            resource_name: config.resource_name.clone(),
            schema: config.schema.clone(),
            warehouse: config.warehouse.clone(),
            engine: config.engine.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            chat_history_size: config.chat_history_size,
            experimental_features: config.experimental_features.clone(),
            short_retries: config.short_retries,
            long_retries: config.long_retries,
        }
    }

    pub fn short_policy(&self) -> RetryPolicy {
        RetryPolicy::short(self.short_retries)
    }

    pub fn long_policy(&self) -> RetryPolicy {
        RetryPolicy::long(self.long_retries)
    }

    /// Translate `question` into SQL; `execute_sql` also runs it.
    pub fn compile_request(&self, question: &Question, execute_sql: bool) -> RemoteQueryRequest {
        RemoteQueryRequest {
            text_query: Some(question.text.clone()),
            table_name: self.table_name.clone(),
            resource_name: self.resource_name.clone(),
            schema: self.schema.clone(),
            engine: self.engine.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            execute_sql: Some(execute_sql),
            is_generate_code: Some(true),
            chat_history_size: self.chat_history_size,
            experimental_features: self.experimental_features.clone(),
            warehouse: self.warehouse.clone(),
            team_id: question.team_id.clone(),
            user_id: question.user_id.clone(),
            ..RemoteQueryRequest::new(Endpoint::Compile)
        }
    }

    pub fn poll_request(&self, chat_history_id: &str) -> RemoteQueryRequest {
        RemoteQueryRequest {
            id: Some(chat_history_id.to_string()),
            chat_history_size: self.chat_history_size,
            experimental_features: self.experimental_features.clone(),
            ..RemoteQueryRequest::new(Endpoint::PollStatus)
        }
    }

    pub fn fetch_request(&self, chat_history_id: &str, question: &Question) -> RemoteQueryRequest {
        RemoteQueryRequest {
            id: Some(chat_history_id.to_string()),
            team_id: question.team_id.clone(),
            user_id: question.user_id.clone(),
            execute_sql: Some(true),
            is_generate_code: Some(true),
            ..RemoteQueryRequest::new(Endpoint::FetchHistoryItem)
        }
    }

    /// One-line summary for progress notes and logs. Connection URLs are masked.
    pub fn describe(&self) -> String {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        format!(
            "resource={}, table={}, schema={}, engine={}",
            quarry_security::redact_url_credentials(&show(&self.resource_name)),
            show(&self.table_name),
            show(&self.schema),
            show(&self.engine),
        )
    }
}
