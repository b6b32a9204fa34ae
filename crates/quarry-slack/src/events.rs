// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events API push payloads, decoded with slack-morphism's push-event types.

use quarry_core::types::{ChannelType, EventKind, InboundEvent, UserId};
use slack_morphism::prelude::{
    SlackAppMentionEvent, SlackChannelType, SlackEventCallbackBody, SlackMessageEvent,
    SlackMessageEventType, SlackPushEvent,
};
use tracing::debug;

/// What the endpoint should do with a decoded request body.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    /// Endpoint ownership check; answered with the challenge.
    Challenge(String),
    Event(InboundEvent),
    /// Acknowledged and dropped.
    Ignored,
}

impl Envelope {
    /// Decodes a request body.
    ///
    /// Only bodies that are not JSON at all are an error. Well-formed payloads
    /// of a type or shape the bot does not handle decode to [`Envelope::Ignored`]
    /// so Slack does not retry them.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        let push = match serde_json::from_value::<SlackPushEvent>(value) {
            Ok(push) => push,
            Err(e) => {
                debug!(error = %e, "unsupported events payload");
                return Ok(Envelope::Ignored);
            }
        };

        Ok(match push {
            SlackPushEvent::UrlVerification(verification) => {
                Envelope::Challenge(verification.challenge)
            }
            SlackPushEvent::EventCallback(callback) => {
                let team_id = Some(callback.team_id.0);
                let inbound = match callback.event {
                    SlackEventCallbackBody::Message(event) => from_message(event, team_id),
                    SlackEventCallbackBody::AppMention(event) => Some(from_mention(event, team_id)),
                    _ => None,
                };
                inbound.map_or(Envelope::Ignored, Envelope::Event)
            }
            _ => Envelope::Ignored,
        })
    }
}

fn channel_type(kind: Option<SlackChannelType>) -> ChannelType {
    // app_mention carries no channel_type; mentions only fire outside DMs.
    kind.map_or(ChannelType::Channel, |k| {
        k.0.parse().unwrap_or(ChannelType::Unknown)
    })
}

fn subtype_name(subtype: &SlackMessageEventType) -> Option<String> {
    serde_json::to_value(subtype)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}

fn from_message(event: SlackMessageEvent, team_id: Option<String>) -> Option<InboundEvent> {
    Some(InboundEvent {
        kind: EventKind::Message,
        channel: event.origin.channel?.0,
        channel_type: channel_type(event.origin.channel_type),
        thread_ts: event.origin.thread_ts.map(|ts| ts.0),
        ts: event.origin.ts.0,
        text: event.content.and_then(|c| c.text).unwrap_or_default(),
        user: event.sender.user.map(|u| UserId(u.0)),
        bot_id: event.sender.bot_id.map(|b| b.0),
        subtype: event.subtype.as_ref().and_then(subtype_name),
        team_id,
    })
}

fn from_mention(event: SlackAppMentionEvent, team_id: Option<String>) -> InboundEvent {
    InboundEvent {
        kind: EventKind::Mention,
        channel: event.channel.0,
        channel_type: channel_type(event.origin.channel_type),
        thread_ts: event.origin.thread_ts.map(|ts| ts.0),
        ts: event.origin.ts.0,
        text: event.content.text.unwrap_or_default(),
        user: Some(UserId(event.user.0)),
        bot_id: None,
        subtype: None,
        team_id,
    }
}
