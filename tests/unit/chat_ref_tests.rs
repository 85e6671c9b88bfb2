use query_relay::models::{ChatId, ChatRef};

#[test]
fn parses_username_with_or_without_at() {
    assert_eq!(
        "@news".parse::<ChatRef>().expect("parses"),
        ChatRef::Username("news".into())
    );
    assert_eq!(
        "news".parse::<ChatRef>().expect("parses"),
        ChatRef::Username("news".into())
    );
}

#[test]
fn parses_numeric_id() {
    assert_eq!(
        "-1001234".parse::<ChatRef>().expect("parses"),
        ChatRef::Id(ChatId(-1_001_234))
    );
}

#[test]
fn rejects_empty_and_spaced_names() {
    assert!("".parse::<ChatRef>().is_err());
    assert!("@".parse::<ChatRef>().is_err());
    assert!("two words".parse::<ChatRef>().is_err());
}

#[test]
fn username_match_ignores_case() {
    let chat = ChatRef::Username("News".into());
    assert!(chat.matches(ChatId(-1), Some("news")));
    assert!(!chat.matches(ChatId(-1), Some("other")));
    assert!(!chat.matches(ChatId(-1), None));
}

#[test]
fn id_match_ignores_username() {
    let chat = ChatRef::Id(ChatId(-1007));
    assert!(chat.matches(ChatId(-1007), Some("anything")));
    assert!(!chat.matches(ChatId(-1008), None));
}

#[test]
fn display_round_trips_through_parse() {
    let by_name = ChatRef::Username("news".into());
    let by_id = ChatRef::Id(ChatId(-42));
    assert_eq!(by_name.to_string(), "@news");
    assert_eq!(by_id.to_string(), "-42");
    assert_eq!(by_name.to_string().parse::<ChatRef>().expect("parses"), by_name);
}
