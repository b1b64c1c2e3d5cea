#![allow(clippy::unwrap_used)]

use chatui_core::Message;
use chatui_core::store::{ChatStore, StoreTarget};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> ChatStore {
    let target = StoreTarget::new(dir.path().join("chats.db"), "conversations");
    ChatStore::connect(&target).unwrap()
}

fn sample_messages() -> Vec<Message> {
    vec![Message::user("hello"), Message::assistant("hi there")]
}

#[test]
fn save_then_load_round_trips_a_new_conversation() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store
        .save("conv-1", &sample_messages(), "be helpful", Some("My chat"), true)
        .unwrap();

    let conversation = store.load("conv-1").unwrap();
    assert_eq!(conversation.id, "conv-1");
    assert_eq!(conversation.title, "My chat");
    assert_eq!(conversation.messages, sample_messages());
    assert_eq!(conversation.system_prompt, "be helpful");
    assert_eq!(conversation.created_at, conversation.updated_at);
}

#[test]
fn update_keeps_title_and_advances_updated_at() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store
        .save("conv-1", &sample_messages(), "be helpful", Some("Original"), true)
        .unwrap();
    let before = store.load("conv-1").unwrap();

    let mut messages = sample_messages();
    messages.push(Message::user("and another thing"));
    store
        .save("conv-1", &messages, "be helpful", Some("Replacement"), false)
        .unwrap();

    let after = store.load("conv-1").unwrap();
    assert_eq!(after.title, "Original", "title is untouched on update");
    assert_eq!(after.messages.len(), 3);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[test]
fn explicit_refresh_replaces_the_title() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store
        .save("conv-1", &sample_messages(), "", Some("Original"), true)
        .unwrap();
    store
        .save("conv-1", &sample_messages(), "", Some("Renamed"), true)
        .unwrap();

    assert_eq!(store.load("conv-1").unwrap().title, "Renamed");
}

#[test]
fn missing_title_falls_back_to_first_user_message() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let messages = vec![Message::user("x".repeat(60))];
    store.save("conv-1", &messages, "", None, true).unwrap();

    let title = store.load("conv-1").unwrap().title;
    assert_eq!(title, format!("{}…", "x".repeat(50)));

    // No user message at all: timestamp default.
    store.save("conv-2", &[], "", None, true).unwrap();
    assert!(store.load("conv-2").unwrap().title.starts_with("chat_"));
}

#[test]
fn delete_reports_whether_a_record_existed() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert!(!store.delete("never-saved"));

    store.save("conv-1", &sample_messages(), "", None, true).unwrap();
    assert!(store.delete("conv-1"));
    assert!(store.load("conv-1").is_none());
    assert!(!store.delete("conv-1"));
}

#[test]
fn list_returns_all_summaries() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.save("a", &[Message::user("first")], "", None, true).unwrap();
    store.save("b", &[Message::user("second")], "", None, true).unwrap();

    let mut ids: Vec<String> = store.list().into_iter().map(|s| s.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn reconnect_switches_database_and_collection() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.save("conv-1", &sample_messages(), "", Some("kept"), true).unwrap();

    // Different database file: the record is out of sight.
    let other = StoreTarget::new(dir.path().join("other.db"), "conversations");
    store.reconnect(&other).unwrap();
    assert!(store.load("conv-1").is_none());
    store.save("conv-2", &sample_messages(), "", None, true).unwrap();

    // Same file, different collection: still out of sight.
    let archive = StoreTarget::new(dir.path().join("chats.db"), "archive");
    store.reconnect(&archive).unwrap();
    assert!(store.load("conv-1").is_none());

    // Back to the original target: the record survived both switches.
    let original = StoreTarget::new(dir.path().join("chats.db"), "conversations");
    store.reconnect(&original).unwrap();
    assert_eq!(store.load("conv-1").unwrap().title, "kept");
}

#[test]
fn failed_reconnect_leaves_store_soft_failing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.save("conv-1", &sample_messages(), "", None, true).unwrap();

    let bad = StoreTarget::new(dir.path().join("chats.db"), "not a valid name");
    assert!(store.reconnect(&bad).is_err());

    // Disconnected: reads fail soft, writes fail loud.
    assert!(store.load("conv-1").is_none());
    assert!(!store.delete("conv-1"));
    assert!(store.list().is_empty());
    assert!(store.save("conv-1", &sample_messages(), "", None, false).is_err());

    // A later successful reconnect restores service.
    let original = StoreTarget::new(dir.path().join("chats.db"), "conversations");
    store.reconnect(&original).unwrap();
    assert!(store.load("conv-1").is_some());
}
