//! Bot API payload decoding and update routing.

use query_relay::models::{ChatId, ChatRef, MessageId};
use query_relay::telegram::client::{decode_envelope, is_missing_message};
use query_relay::telegram::poller::route_update;
use query_relay::telegram::types::{ApiResponse, CopiedMessageId, Update};
use query_relay::telegram::ChannelIndex;
use query_relay::AppError;

fn update(json: serde_json::Value) -> Update {
    serde_json::from_value(json).expect("valid update")
}

#[test]
fn decodes_successful_envelope() {
    let envelope: ApiResponse<CopiedMessageId> =
        serde_json::from_str(r#"{"ok":true,"result":{"message_id":77}}"#).expect("json");
    let copied = decode_envelope("copyMessage", envelope).expect("ok result");
    assert_eq!(copied.message_id, 77);
}

#[test]
fn failed_envelope_carries_code_and_description() {
    let envelope: ApiResponse<bool> = serde_json::from_str(
        r#"{"ok":false,"error_code":400,"description":"Bad Request: message to delete not found"}"#,
    )
    .expect("json");
    let err = decode_envelope("deleteMessages", envelope).expect_err("api error");
    let msg = err.to_string();
    assert!(msg.contains("deleteMessages failed (400)"), "{msg}");
    assert!(is_missing_message(&err));
}

#[test]
fn ok_without_result_is_an_error() {
    let envelope: ApiResponse<bool> = serde_json::from_str(r#"{"ok":true}"#).expect("json");
    assert!(decode_envelope("deleteMessages", envelope).is_err());
}

#[test]
fn permission_errors_are_not_missing_messages() {
    let err = AppError::Telegram(
        "deleteMessages failed (400): Bad Request: message can't be deleted".into(),
    );
    assert!(!is_missing_message(&err));
    assert!(!is_missing_message(&AppError::NotFound("message to delete not found".into())));
}

#[test]
fn group_message_becomes_incoming_event() {
    let index = ChannelIndex::new(10);
    let event = route_update(
        update(serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": -100500, "type": "supergroup", "title": "Lookup"},
                "text": "abc"
            }
        })),
        &ChatRef::Username("src".into()),
        &index,
    )
    .expect("event");

    assert_eq!(event.chat_id, ChatId(-100_500));
    assert_eq!(event.message_id, MessageId(5));
    assert_eq!(event.text.as_deref(), Some("abc"));
    assert!(!event.sent_via_bot);
    assert!(index.is_empty());
}

#[test]
fn via_bot_flag_is_carried() {
    let event = route_update(
        update(serde_json::json!({
            "update_id": 11,
            "message": {
                "message_id": 6,
                "chat": {"id": -100500, "type": "supergroup"},
                "text": "inline answer",
                "via_bot": {"id": 99, "is_bot": true, "username": "gif"}
            }
        })),
        &ChatRef::Username("src".into()),
        &ChannelIndex::new(10),
    )
    .expect("event");
    assert!(event.sent_via_bot);
}

#[test]
fn media_message_has_no_text() {
    let event = route_update(
        update(serde_json::json!({
            "update_id": 12,
            "message": {
                "message_id": 7,
                "chat": {"id": -100500, "type": "supergroup"},
                "caption": "a photo caption"
            }
        })),
        &ChatRef::Username("src".into()),
        &ChannelIndex::new(10),
    )
    .expect("event");
    assert!(event.text.is_none());
}

#[test]
fn source_channel_posts_are_indexed_by_username() {
    let index = ChannelIndex::new(10);
    let routed = route_update(
        update(serde_json::json!({
            "update_id": 13,
            "channel_post": {
                "message_id": 301,
                "chat": {"id": -100200, "type": "channel", "username": "Src"},
                "caption": "Weekly digest"
            }
        })),
        &ChatRef::Username("src".into()),
        &index,
    );

    assert!(routed.is_none());
    let hits = index.search("digest", 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, MessageId(301));
    assert_eq!(hits[0].chat_id, ChatId(-100_200));
}

#[test]
fn edited_posts_replace_index_entries() {
    let index = ChannelIndex::new(10);
    let source = ChatRef::Id(ChatId(-100_200));
    let post = |update_id: i64, key: &str, text: &str| {
        let mut raw = serde_json::json!({ "update_id": update_id });
        raw[key] = serde_json::json!({
            "message_id": 9,
            "chat": {"id": -100200, "type": "channel"},
            "text": text
        });
        update(raw)
    };

    let _ = route_update(post(20, "channel_post", "first draft"), &source, &index);
    let _ = route_update(post(21, "edited_channel_post", "final text"), &source, &index);

    assert!(index.search("draft", 1).is_empty());
    assert_eq!(index.search("final", 1)[0].id, MessageId(9));
    assert_eq!(index.len(), 1);
}

#[test]
fn unrelated_channel_posts_are_ignored() {
    let index = ChannelIndex::new(10);
    let _ = route_update(
        update(serde_json::json!({
            "update_id": 14,
            "channel_post": {
                "message_id": 1,
                "chat": {"id": -100999, "type": "channel", "username": "elsewhere"},
                "text": "abc"
            }
        })),
        &ChatRef::Username("src".into()),
        &index,
    );
    assert!(index.is_empty());
}

#[test]
fn supergroup_source_messages_are_indexed_not_dispatched() {
    let index = ChannelIndex::new(10);
    let source = ChatRef::Id(ChatId(-100_200));
    let routed = route_update(
        update(serde_json::json!({
            "update_id": 30,
            "message": {
                "message_id": 44,
                "chat": {"id": -100200, "type": "supergroup"},
                "text": "abc reference post"
            }
        })),
        &source,
        &index,
    );

    assert!(routed.is_none());
    assert_eq!(index.search("abc", 1)[0].id, MessageId(44));
}

#[test]
fn edited_supergroup_source_messages_update_the_index() {
    let index = ChannelIndex::new(10);
    let source = ChatRef::Username("src".into());
    let chat = serde_json::json!({"id": -100200, "type": "supergroup", "username": "src"});

    let _ = route_update(
        update(serde_json::json!({
            "update_id": 31,
            "message": {"message_id": 45, "chat": chat.clone(), "text": "old wording"}
        })),
        &source,
        &index,
    );
    let _ = route_update(
        update(serde_json::json!({
            "update_id": 32,
            "edited_message": {"message_id": 45, "chat": chat, "text": "new wording"}
        })),
        &source,
        &index,
    );

    assert!(index.search("old", 1).is_empty());
    assert_eq!(index.search("new", 1)[0].id, MessageId(45));
}

#[test]
fn edited_group_messages_are_not_dispatched() {
    let index = ChannelIndex::new(10);
    let routed = route_update(
        update(serde_json::json!({
            "update_id": 33,
            "edited_message": {
                "message_id": 5,
                "chat": {"id": -100500, "type": "supergroup"},
                "text": "abc edited"
            }
        })),
        &ChatRef::Username("src".into()),
        &index,
    );
    assert!(routed.is_none());
    assert!(index.is_empty());
}
