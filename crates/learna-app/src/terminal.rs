//! Terminal output: live reply printing and transcripts.

use std::io::Write;

use learna_chat::{ChatMessage, SessionEvent, Sender};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::warn;

pub const SIGN_IN_HINT: &str = "sign-in required: run `learna login --token <TOKEN>`";

/// Print streamed replies as they arrive. Returns when the session's
/// event bus closes.
pub async fn print_events(mut rx: Receiver<SessionEvent>) {
    let mut stdout = std::io::stdout();
    loop {
        match rx.recv().await {
            Ok(SessionEvent::MessageAppended(message)) if message.open => {
                let _ = write!(stdout, "{}", speaker(message.sender));
            }
            Ok(SessionEvent::ContentAppended { delta, .. }) => {
                let _ = write!(stdout, "{delta}");
            }
            Ok(SessionEvent::MessageClosed { .. }) => {
                let _ = writeln!(stdout);
            }
            Ok(SessionEvent::SignInRequired) => eprintln!("{SIGN_IN_HINT}"),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "terminal fell behind the session, output incomplete");
                continue;
            }
            Err(RecvError::Closed) => break,
        }
        let _ = stdout.flush();
    }
}

fn speaker(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "you> ",
        Sender::Assistant => "assistant> ",
    }
}

pub fn format_transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(speaker(message.sender));
        out.push_str(&message.content);
        out.push('\n');
    }
    out
}
