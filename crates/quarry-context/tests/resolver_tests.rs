// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context resolution against an in-memory chat history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quarry_config::model::AgentConfig;
use quarry_context::{ContextResolver, Resolution, ResolvedQuery, SkipReason};
use quarry_core::types::{Role, UserId};
use quarry_security::Redactor;
use quarry_test_utils::MockHistory;
use quarry_test_utils::fixtures::{
    bot_message, channel_event, dm_event, identity, in_thread, mention_event, slack_ts, threaded,
    user_message, with_marker, BOT_ID,
};

const NOW: i64 = 1_700_000_000;
const ROOT: &str = "1699990000.000100";

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(NOW, 0).unwrap()
}

fn config() -> AgentConfig {
    AgentConfig {
        system_prompt: "You are {bot} helping {user}.".to_string(),
        ..AgentConfig::default()
    }
}

fn resolver(history: Arc<MockHistory>) -> ContextResolver {
    ContextResolver::new(
        history,
        Arc::new(Redactor::default()),
        identity(),
        &config(),
    )
    .unwrap()
}

fn expect_query(resolution: Resolution) -> ResolvedQuery {
    match resolution {
        Resolution::Query(query) => query,
        Resolution::Skip(reason) => panic!("expected a query, skipped: {reason}"),
    }
}

fn contents(query: &ResolvedQuery) -> Vec<&str> {
    query.dialogue.iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn direct_message_end_to_end() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    let ts = slack_ts(NOW - 60, 1);
    history
        .push("D1", user_message(&ts, "U1", "<@UQUARRY> show revenue"))
        .await;

    let event = dm_event("D1", &ts, "U1", "<@UQUARRY> show revenue");
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(query.dialogue.len(), 2);
    assert_eq!(query.dialogue[0].role, Role::System);
    assert_eq!(query.dialogue[0].content, "You are <@UQUARRY> helping <@U1>.");
    assert_eq!(query.dialogue[1].role, Role::User);
    assert_eq!(query.dialogue[1].content, "<@U1>: show revenue");
    assert_eq!(query.dialogue[1].source_timestamp, ts);
    assert_eq!(query.text_query, "show revenue");
    assert_eq!(query.acting_user, Some(UserId::from("U1")));
    assert_eq!(query.reply_thread, None);
}

#[tokio::test]
async fn direct_message_history_is_limited_to_the_window() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    let stale = slack_ts(NOW - 25 * 3600, 1);
    let recent = slack_ts(NOW - 3600, 1);
    let trigger = slack_ts(NOW - 10, 1);
    history
        .extend(
            "D1",
            [
                user_message(&stale, "U1", "old question"),
                user_message(&recent, "U1", "which tables exist?"),
            ],
        )
        .await;

    // The trigger is not in the fetched history yet; it is appended.
    let event = dm_event("D1", &trigger, "U1", "count the orders");
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    let contents = contents(&query);
    assert!(!contents.iter().any(|c| c.contains("old question")));
    assert_eq!(
        &contents[1..],
        &["<@U1>: which tables exist?", "<@U1>: count the orders"]
    );
    assert_eq!(query.text_query, "count the orders");
}

#[tokio::test]
async fn direct_message_pii_is_redacted() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    let ts = slack_ts(NOW - 5, 1);
    let event = dm_event("D1", &ts, "U1", "orders for jane@example.com");

    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(query.text_query, "orders for [EMAIL]");
    assert!(!contents(&query).iter().any(|c| c.contains("jane@")));
}

#[tokio::test]
async fn latest_checkpoint_wins() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "<@UQUARRY> revenue by month"),
                in_thread(
                    with_marker(bot_message("1699990001.000100", BOT_ID, "first answer"), "P1", "U1"),
                    ROOT,
                ),
                in_thread(user_message("1699990002.000100", "U1", "only 2023"), ROOT),
                in_thread(
                    with_marker(bot_message("1699990003.000100", BOT_ID, "second answer"), "P2", "U1"),
                    ROOT,
                ),
            ],
        )
        .await;

    let event = threaded(
        channel_event("C1", "1699990004.000100", "U1", "and by region"),
        ROOT,
    );
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(contents(&query), vec!["P2", "<@U1>: and by region"]);
    assert_eq!(query.text_query, "and by region");
    assert_eq!(query.reply_thread.as_deref(), Some(ROOT));
}

#[tokio::test]
async fn foreign_checkpoints_are_ignored() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "<@UQUARRY> revenue by month"),
                in_thread(
                    with_marker(
                        bot_message("1699990001.000100", "B0OTHER", "other install"),
                        "FOREIGN",
                        "U1",
                    ),
                    ROOT,
                ),
            ],
        )
        .await;

    let event = threaded(
        channel_event("C1", "1699990002.000100", "U1", "please"),
        ROOT,
    );
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(
        contents(&query),
        vec![
            "You are <@UQUARRY> helping <@U1>.",
            "<@U1>: revenue by month",
            "<@U1>: please",
        ]
    );
}

#[tokio::test]
async fn foreign_checkpoint_after_ours_is_excluded() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "<@UQUARRY> revenue by month"),
                in_thread(
                    with_marker(bot_message("1699990001.000100", BOT_ID, "our answer"), "OURS", "U1"),
                    ROOT,
                ),
                in_thread(user_message("1699990002.000100", "U1", "only 2023"), ROOT),
                in_thread(
                    with_marker(
                        bot_message("1699990003.000100", "B0OTHER", "other install"),
                        "FOREIGN",
                        "U9",
                    ),
                    ROOT,
                ),
            ],
        )
        .await;

    let event = threaded(
        channel_event("C1", "1699990004.000100", "U1", "and by region"),
        ROOT,
    );
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(
        contents(&query),
        vec!["OURS", "<@U1>: only 2023", "<@U1>: and by region"]
    );
    assert_eq!(query.acting_user, Some(UserId::from("U1")));
}

#[tokio::test]
async fn missing_root_is_looked_up_for_the_mention_check() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "<@UQUARRY> revenue by month"),
                in_thread(user_message("1699990001.000100", "U2", "me too"), ROOT),
            ],
        )
        .await;
    history.omit_thread_roots();

    let event = threaded(channel_event("C1", "1699990002.000100", "U1", "by week"), ROOT);
    let query = expect_query(resolver(history.clone()).resolve_at(&event, now()).await.unwrap());

    assert_eq!(query.text_query, "by week");
    assert_eq!(history.lookup_count(), 2);
}

#[tokio::test]
async fn looked_up_root_without_a_mention_still_requires_one() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "lunch anyone?"),
                in_thread(user_message("1699990001.000100", "U2", "me too"), ROOT),
            ],
        )
        .await;
    history.omit_thread_roots();

    let event = threaded(channel_event("C1", "1699990002.000100", "U1", "pizza"), ROOT);
    let resolution = resolver(history.clone()).resolve_at(&event, now()).await.unwrap();

    assert_eq!(resolution, Resolution::Skip(SkipReason::MentionRequired));
    assert_eq!(history.lookup_count(), 2);
}

#[tokio::test]
async fn bot_replies_become_assistant_turns() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "<@UQUARRY> top customers"),
                in_thread(bot_message("1699990001.000100", BOT_ID, "plain note"), ROOT),
            ],
        )
        .await;

    let event = threaded(channel_event("C1", "1699990002.000100", "U2", "thanks"), ROOT);
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    let roles: Vec<Role> = query.dialogue.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(query.dialogue[2].content, "<@UQUARRY>: plain note");
    assert_eq!(query.text_query, "thanks");
}

#[tokio::test]
async fn checkpoint_user_becomes_acting_user() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "<@UQUARRY> top customers"),
                in_thread(
                    with_marker(bot_message("1699990001.000100", BOT_ID, "answer"), "P", "U1"),
                    ROOT,
                ),
            ],
        )
        .await;

    let event = threaded(channel_event("C1", "1699990002.000100", "U2", "and churn?"), ROOT);
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(query.acting_user, Some(UserId::from("U1")));
    assert_eq!(contents(&query), vec!["P", "<@U2>: and churn?"]);
}

#[tokio::test]
async fn unaddressed_thread_requires_a_mention() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .push("C1", user_message(ROOT, "U1", "lunch anyone?"))
        .await;

    let event = threaded(channel_event("C1", "1699990001.000100", "U2", "sure"), ROOT);
    let resolution = resolver(history).resolve_at(&event, now()).await.unwrap();

    assert_eq!(resolution, Resolution::Skip(SkipReason::MentionRequired));
}

#[tokio::test]
async fn thread_with_a_checkpoint_needs_no_mention() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .extend(
            "C1",
            [
                user_message(ROOT, "U1", "lunch anyone?"),
                in_thread(
                    with_marker(bot_message("1699990001.000100", BOT_ID, "answer"), "P", "U1"),
                    ROOT,
                ),
            ],
        )
        .await;

    let event = threaded(channel_event("C1", "1699990002.000100", "U1", "more"), ROOT);
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());
    assert_eq!(query.text_query, "more");
}

#[tokio::test]
async fn thread_mention_is_answered_once() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .push("C1", user_message(ROOT, "U1", "lunch anyone?"))
        .await;
    let ts = "1699990001.000100";
    let text = "<@UQUARRY> how many orders?";

    // The message event defers to the mention event.
    let message = threaded(channel_event("C1", ts, "U2", text), ROOT);
    let resolver = resolver(history);
    assert_eq!(
        resolver.resolve_at(&message, now()).await.unwrap(),
        Resolution::Skip(SkipReason::HandledByMentionEvent)
    );

    let mention = threaded(mention_event("C1", ts, "U2", text), ROOT);
    let query = expect_query(resolver.resolve_at(&mention, now()).await.unwrap());
    assert_eq!(query.text_query, "how many orders?");
}

#[tokio::test]
async fn mention_in_addressed_thread_defers_to_message_event() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .push("C1", user_message(ROOT, "U1", "<@UQUARRY> revenue"))
        .await;

    let mention = threaded(
        mention_event("C1", "1699990001.000100", "U1", "<@UQUARRY> again"),
        ROOT,
    );
    assert_eq!(
        resolver(history).resolve_at(&mention, now()).await.unwrap(),
        Resolution::Skip(SkipReason::HandledByMessageEvent)
    );
}

#[tokio::test]
async fn top_level_channel_messages() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    let resolver = resolver(history.clone());
    let ts = slack_ts(NOW, 1);

    let plain = channel_event("C1", &ts, "U1", "<@UQUARRY> hi");
    assert_eq!(
        resolver.resolve_at(&plain, now()).await.unwrap(),
        Resolution::Skip(SkipReason::NotAddressed)
    );

    let mention = mention_event("C1", &ts, "U1", "<@UQUARRY> hi");
    let query = expect_query(resolver.resolve_at(&mention, now()).await.unwrap());
    assert_eq!(query.reply_thread.as_deref(), Some(ts.as_str()));
    assert_eq!(contents(&query)[1], "<@U1>: hi");
    assert_eq!(history.lookup_count(), 0);
}

#[tokio::test]
async fn bot_and_edit_events_are_skipped() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    let resolver = resolver(history.clone());
    let ts = slack_ts(NOW, 1);

    let mut own = dm_event("D1", &ts, "UQUARRY", "answer");
    assert_eq!(
        resolver.resolve_at(&own, now()).await.unwrap(),
        Resolution::Skip(SkipReason::OwnMessage)
    );
    own.bot_id = Some(BOT_ID.to_string());
    assert_eq!(
        resolver.resolve_at(&own, now()).await.unwrap(),
        Resolution::Skip(SkipReason::OwnMessage)
    );

    let mut foreign = dm_event("D1", &ts, "U9", "hello");
    foreign.bot_id = Some("B0OTHER".to_string());
    assert_eq!(
        resolver.resolve_at(&foreign, now()).await.unwrap(),
        Resolution::Skip(SkipReason::ForeignBot)
    );

    let mut edited = dm_event("D1", &ts, "U1", "edited");
    edited.subtype = Some("message_changed".to_string());
    assert_eq!(
        resolver.resolve_at(&edited, now()).await.unwrap(),
        Resolution::Skip(SkipReason::EditedOrDeleted)
    );
    assert_eq!(history.lookup_count(), 0);
}

#[tokio::test]
async fn dm_thread_replies_stay_in_the_thread() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history
        .push("D1", user_message(ROOT, "U1", "show revenue"))
        .await;

    let event = threaded(dm_event("D1", "1699990001.000100", "U1", "by week"), ROOT);
    let query = expect_query(resolver(history).resolve_at(&event, now()).await.unwrap());

    assert_eq!(query.reply_thread.as_deref(), Some(ROOT));
    assert_eq!(
        &contents(&query)[1..],
        &["<@U1>: show revenue", "<@U1>: by week"]
    );
}

#[tokio::test]
async fn lookup_failure_is_an_error() {
    let history = Arc::new(MockHistory::new(BOT_ID));
    history.fail_lookups();

    let event = dm_event("D1", &slack_ts(NOW, 1), "U1", "hello");
    let err = resolver(history.clone())
        .resolve_at(&event, now())
        .await
        .unwrap_err();

    assert!(matches!(err, quarry_core::QuarryError::Lookup { .. }));
    assert_eq!(history.lookup_count(), 1);
}

mod proptests {
    use proptest::prelude::*;
    use quarry_context::MentionStripper;
    use quarry_core::types::UserId;

    proptest! {
        #[test]
        fn stripping_is_idempotent(text in "(<@UQUARRY>|<@|UQUARRY>|[a-z ]|\\s){0,40}") {
            let stripper = MentionStripper::new(&UserId::from("UQUARRY")).unwrap();
            let once = stripper.strip(&text);
            prop_assert_eq!(stripper.strip(&once), once.clone());
            prop_assert!(!stripper.mentions(&once));
        }
    }
}
