// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole turns against a mock platform and a scripted query service.

use std::sync::Arc;

use quarry_agent::handler::{GENERIC_ERROR_TEXT, LOADING_TEXT, MISSING_API_KEY_TEXT, UNAUTHORIZED_TEXT};
use quarry_agent::{EventHandler, TurnOutcome};
use quarry_config::model::{AgentConfig, QueryConfig, QueryMode};
use quarry_context::{ContextResolver, SkipReason};
use quarry_core::EventProcessor;
use quarry_core::types::Role;
use quarry_query::{Endpoint, QueryClient, QuerySettings};
use quarry_security::Redactor;
use quarry_test_utils::fixtures::{channel_event, dm_event, identity, mention_event, BOT_ID};
use quarry_test_utils::{MockHistory, RecordingSleeper, ScriptedTransport};
use serde_json::json;

struct Harness {
    history: Arc<MockHistory>,
    transport: Arc<ScriptedTransport>,
    handler: EventHandler,
}

fn harness(transport: ScriptedTransport, mode: QueryMode, api_key_configured: bool) -> Harness {
    let history = Arc::new(MockHistory::new(BOT_ID));
    let transport = Arc::new(transport);
    let resolver = ContextResolver::new(
        history.clone(),
        Arc::new(Redactor::default()),
        identity(),
        &AgentConfig::default(),
    )
    .unwrap();
    let client = QueryClient::new(transport.clone()).with_sleeper(Arc::new(RecordingSleeper::new()));
    let settings = QuerySettings::from_config(&QueryConfig {
        mode,
        table_name: Some("orders".into()),
        ..QueryConfig::default()
    });
    let handler = EventHandler::new(resolver, history.clone(), client, settings, api_key_configured);
    Harness {
        history,
        transport,
        handler,
    }
}

fn question() -> quarry_core::types::InboundEvent {
    let ts = format!("{}.000100", unix_now());
    dm_event("D1", &ts, "U1", "<@UQUARRY> show revenue")
}

/// Current unix seconds, so the message falls inside the history window.
fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[tokio::test]
async fn chain_turn_posts_ack_progress_and_answer() {
    let h = harness(
        ScriptedTransport::json_bodies(vec![
            json!({"chat_history_id": 42}),
            json!({"status": "processing_sql"}),
            json!({"status": "done", "sql_query": "SELECT sum(amount) FROM orders"}),
            json!({"sql_query": "SELECT sum(amount) FROM orders", "result": [{"sum": 10}]}),
        ]),
        QueryMode::Chain,
        true,
    );

    let outcome = h.handler.handle(&question()).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Answered { replies: 2 });

    let texts = h.history.sent_texts().await;
    assert_eq!(texts.len(), 4);
    assert!(texts[0].starts_with(LOADING_TEXT));
    assert!(texts[0].contains("table=orders"));
    assert_eq!(texts[1], "Processing your request, id=42");
    assert_eq!(texts[2], "id=42, ```SELECT sum(amount) FROM orders```");
    assert_eq!(texts[3], "id=42, ```\n| sum |\n| 10  |\n```");

    let replies = h.history.sent_replies().await;
    assert!(replies.iter().all(|r| r.channel == "D1" && r.thread_ts.is_none()));
    assert!(replies[1].marker.is_none(), "progress notes carry no marker");
    for reply in [&replies[0], &replies[2], &replies[3]] {
        let marker = reply.marker.as_ref().expect("answers carry the marker");
        assert_eq!(marker.event_payload.messages.len(), 1);
        assert_eq!(marker.event_payload.messages[0].role, Role::System);
        assert_eq!(marker.event_payload.user.as_ref().map(|u| u.0.as_str()), Some("U1"));
    }

    let requests = h.transport.requests().await;
    assert_eq!(requests[0].endpoint, Endpoint::Compile);
    assert_eq!(requests[0].text_query.as_deref(), Some("show revenue"));
    assert_eq!(requests[0].team_id.as_deref(), Some("T0TEAM"));
    assert_eq!(requests[0].user_id.as_deref(), Some("U1"));
}

#[tokio::test]
async fn direct_turn_is_a_single_call() {
    let h = harness(
        ScriptedTransport::json_bodies(vec![json!({
            "chat_history_id": "7",
            "ai_response": "Total revenue.",
            "sql_query": "SELECT 1"
        })]),
        QueryMode::Direct,
        true,
    );

    h.handler.process(question()).await;

    assert_eq!(h.transport.request_count().await, 1);
    let texts = h.history.sent_texts().await;
    assert_eq!(&texts[1..], &["id=7, Total revenue.", "id=7, ```SELECT 1```"]);
}

#[tokio::test]
async fn missing_api_key_gets_a_hint_instead_of_a_query() {
    let h = harness(ScriptedTransport::statuses(&[]), QueryMode::Chain, false);

    let outcome = h.handler.handle(&question()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::NotConfigured);
    assert_eq!(h.history.sent_texts().await, vec![MISSING_API_KEY_TEXT]);
    assert_eq!(h.transport.request_count().await, 0);
}

#[tokio::test]
async fn rejected_key_gets_the_auth_reply() {
    let h = harness(ScriptedTransport::statuses(&[401]), QueryMode::Chain, true);

    h.handler.process(question()).await;

    let texts = h.history.sent_texts().await;
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with(LOADING_TEXT));
    assert_eq!(texts[1], UNAUTHORIZED_TEXT);
}

#[tokio::test]
async fn failure_reply_lands_in_the_same_thread_as_the_ack() {
    let h = harness(ScriptedTransport::statuses(&[401]), QueryMode::Chain, true);
    let event = mention_event("C1", "5.000100", "U1", "<@UQUARRY> show revenue");

    h.handler.process(event).await;

    let replies = h.history.sent_replies().await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1].text, UNAUTHORIZED_TEXT);
    assert!(replies
        .iter()
        .all(|r| r.channel == "C1" && r.thread_ts.as_deref() == Some("5.000100")));
}

#[tokio::test]
async fn client_errors_get_one_generic_reply_without_detail() {
    let h = harness(
        ScriptedTransport::new(vec![quarry_test_utils::ScriptedReply::Status(
            400,
            "password=hunter2".into(),
        )]),
        QueryMode::Chain,
        true,
    );

    h.handler.process(question()).await;

    let texts = h.history.sent_texts().await;
    assert_eq!(texts.last().map(String::as_str), Some(GENERIC_ERROR_TEXT));
    assert_eq!(
        texts.iter().filter(|t| t.as_str() == GENERIC_ERROR_TEXT).count(),
        1
    );
    assert!(!texts.iter().any(|t| t.contains("hunter2")));
}

#[tokio::test]
async fn lookup_failure_is_reported_once() {
    let h = harness(ScriptedTransport::statuses(&[]), QueryMode::Chain, true);
    h.history.fail_lookups();

    h.handler.process(question()).await;

    assert_eq!(h.history.sent_texts().await, vec![GENERIC_ERROR_TEXT]);
    assert_eq!(h.transport.request_count().await, 0);
}

#[tokio::test]
async fn skipped_events_are_silent() {
    let h = harness(ScriptedTransport::statuses(&[]), QueryMode::Chain, true);
    let event = channel_event("C1", "1.000100", "U1", "lunch?");

    let outcome = h.handler.handle(&event).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Skipped(SkipReason::NotAddressed));

    h.handler.process(event).await;
    assert!(h.history.sent_texts().await.is_empty());
}
