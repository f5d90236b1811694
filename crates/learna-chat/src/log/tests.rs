//! Tests for the message log and its actor.

use tokio_util::sync::CancellationToken;

use super::*;
use crate::events::{EventBus, SessionEvent};
use crate::ChatError;

fn remote(id: i64, sender: Sender, content: &str) -> RemoteMessage {
    RemoteMessage {
        id,
        sender,
        content: content.into(),
    }
}

fn server_history() -> Vec<RemoteMessage> {
    vec![
        remote(1, Sender::User, "What is a stack?"),
        remote(2, Sender::Assistant, "A LIFO structure."),
    ]
}

#[test]
fn local_ids_are_unique_and_monotonic() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let a = log.push_user(turn, "one").id;
    let b = log.push_user(turn, "two").id;
    assert_eq!(a, MessageId::Local(1));
    assert_eq!(b, MessageId::Local(2));
}

#[test]
fn only_one_assistant_message_may_be_open() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let first = log.open_assistant(turn).unwrap().id;

    let err = log.open_assistant(turn).unwrap_err();
    assert_eq!(err, LogError::AlreadyStreaming(first));

    log.close(first).unwrap();
    assert!(log.open_assistant(turn).is_ok());
}

#[test]
fn open_message_grows_and_freezes_on_close() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let id = log.open_assistant(turn).unwrap().id;

    log.append(id, "Recur").unwrap();
    log.append(id, "sion").unwrap();
    log.close(id).unwrap();

    assert_eq!(log.get(id).unwrap().content, "Recursion");
    assert_eq!(log.append(id, "!"), Err(LogError::NotOpen(id)));
    assert_eq!(log.close(id), Err(LogError::NotOpen(id)));
    assert_eq!(log.open_message(), None);
}

#[test]
fn user_messages_cannot_be_appended_to() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let id = log.push_user(turn, "hi").id;
    assert_eq!(log.append(id, "x"), Err(LogError::NotOpen(id)));
}

#[test]
fn unknown_message_is_rejected() {
    let mut log = MessageLog::new();
    let id = MessageId::Local(99);
    assert_eq!(log.append(id, "x"), Err(LogError::UnknownMessage(id)));
}

#[test]
fn history_replaces_everything_when_no_turn_is_open() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let id = log.open_assistant(turn).unwrap().id;
    log.append(id, "streamed").unwrap();
    log.close(id).unwrap();
    log.end_turn(turn);

    let len = log.apply_history(server_history());

    assert_eq!(len, 2);
    assert!(log.iter().all(|m| !m.id.is_local()));
}

#[test]
fn history_keeps_messages_of_open_turns_after_snapshot() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    log.push_user(turn, "Explain recursion");
    let reply = log.open_assistant(turn).unwrap().id;
    log.append(reply, "Recur").unwrap();

    let len = log.apply_history(server_history());

    assert_eq!(len, 4);
    let contents: Vec<_> = log.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        ["What is a stack?", "A LIFO structure.", "Explain recursion", "Recur"]
    );
    assert_eq!(log.open_message(), Some(reply));

    // Streaming continues into the retained placeholder.
    log.append(reply, "sion").unwrap();
    assert_eq!(log.get(reply).unwrap().content, "Recursion");
}

#[test]
fn closed_message_of_open_turn_is_kept_until_turn_ends() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let reply = log.open_assistant(turn).unwrap().id;
    log.close(reply).unwrap();

    assert_eq!(log.apply_history(server_history()), 3);

    log.end_turn(turn);
    assert_eq!(log.apply_history(server_history()), 2);
}

#[test]
fn stored_user_message_is_not_repeated_after_snapshot() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let user = log.push_user(turn, "hi").id;
    log.acknowledge(user, "hi").unwrap();
    let reply = log.open_assistant(turn).unwrap().id;
    log.append(reply, "o").unwrap();

    let len = log.apply_history(vec![remote(10, Sender::User, "hi")]);

    assert_eq!(len, 2);
    let ids: Vec<_> = log.iter().map(|m| m.id).collect();
    assert_eq!(ids, [MessageId::Remote(10), reply]);
    log.append(reply, "k").unwrap();
    assert_eq!(log.get(reply).unwrap().content, "ok");
}

#[test]
fn stored_user_message_is_kept_when_snapshot_predates_it() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let user = log.push_user(turn, "Explain recursion").id;
    log.acknowledge(user, "Explain recursion").unwrap();
    log.open_assistant(turn).unwrap();

    assert_eq!(log.apply_history(server_history()), 4);
    assert!(log.get(user).is_some());
}

#[test]
fn only_user_messages_can_be_acknowledged() {
    let mut log = MessageLog::new();
    let turn = log.begin_turn();
    let reply = log.open_assistant(turn).unwrap().id;
    assert_eq!(log.acknowledge(reply, "x"), Err(LogError::NotUser(reply)));
}

#[test]
fn duplicate_history_ids_are_dropped() {
    let mut log = MessageLog::new();
    let mut history = server_history();
    history.push(remote(2, Sender::Assistant, "duplicate"));

    assert_eq!(log.apply_history(history), 2);
    assert_eq!(log.get(MessageId::Remote(2)).unwrap().content, "A LIFO structure.");
}

#[tokio::test]
async fn handle_applies_commands_in_order_and_publishes_events() {
    let events = EventBus::new(64);
    let mut rx = events.subscribe();
    let handle = LogHandle::spawn(events, CancellationToken::new());

    let turn = handle.begin_turn().await.unwrap();
    let user = handle.push_user(turn, "Explain recursion").await.unwrap();
    let reply = handle.open_assistant(turn).await.unwrap();
    handle.append(reply, "Recursion").await.unwrap();
    handle.close(reply).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].id, user);
    assert_eq!(snapshot[1].content, "Recursion");
    assert!(!snapshot[1].open);

    assert!(matches!(rx.recv().await.unwrap(), SessionEvent::MessageAppended(m) if m.id == user));
    assert!(matches!(rx.recv().await.unwrap(), SessionEvent::MessageAppended(m) if m.id == reply));
    assert!(
        matches!(rx.recv().await.unwrap(), SessionEvent::ContentAppended { id, delta } if id == reply && delta == "Recursion")
    );
    assert!(matches!(rx.recv().await.unwrap(), SessionEvent::MessageClosed { id } if id == reply));
}

#[tokio::test]
async fn handle_surfaces_log_errors() {
    let handle = LogHandle::spawn(EventBus::new(16), CancellationToken::new());
    let turn = handle.begin_turn().await.unwrap();
    let user = handle.push_user(turn, "hi").await.unwrap();

    let err = handle.append(user, "x").await.unwrap_err();
    assert!(matches!(err, ChatError::Log(LogError::NotOpen(_))));
}

#[tokio::test]
async fn cancelled_session_rejects_writes() {
    let cancel = CancellationToken::new();
    let handle = LogHandle::spawn(EventBus::new(16), cancel.clone());
    let turn = handle.begin_turn().await.unwrap();

    cancel.cancel();

    let err = handle.push_user(turn, "too late").await.unwrap_err();
    assert!(matches!(err, ChatError::SessionClosed));
    assert!(matches!(
        handle.snapshot().await.unwrap_err(),
        ChatError::SessionClosed
    ));
}
