//! Subcommand handlers.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use learna_chat::{
    start_chat, Attachment, AuthContext, ChatError, ChatGateway, FirstInputHandoff,
    FirstMessageOutcome, HttpGateway, NewChatRequest, SessionController, Submission,
    SubmitOutcome,
};
use learna_common::{ChatId, Result};
use learna_config::{CredentialStore, LearnaConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::cli::Command;
use crate::settings::{gateway_config, session_config};
use crate::terminal::{format_transcript, print_events, SIGN_IN_HINT};

pub async fn run(command: Command, config: LearnaConfig) -> Result<()> {
    let store = CredentialStore::default_location()?;

    match command {
        Command::Login { token } => {
            store.save_token(&token)?;
            println!("token saved to {}", store.path().display());
        }
        Command::Logout => {
            store.clear()?;
            println!("signed out");
        }
        Command::New {
            prompt,
            model,
            agent,
            files,
        } => {
            let gateway = connect(&config, &store)?;
            let handoff = FirstInputHandoff::new();
            let request = NewChatRequest {
                prompt,
                attachments: read_attachments(&files).await?,
                model: model.unwrap_or_else(|| session_config(&config).default_model),
                agent: agent.unwrap_or_else(|| config.chat.default_agent.clone()),
            };
            let created = start_chat(
                gateway.as_ref(),
                &handoff,
                request,
                config.chat.upload_all_attachments,
            )
            .await?;
            match created {
                Some(chat) => {
                    println!("created chat {chat}");
                    converse(gateway, handoff, chat, &config).await?;
                }
                None => println!("nothing to send"),
            }
        }
        Command::Open { chat } => {
            let gateway = connect(&config, &store)?;
            converse(gateway, FirstInputHandoff::new(), chat, &config).await?;
        }
        Command::List => {
            let gateway = connect(&config, &store)?;
            for chat in gateway.list_chats().await? {
                println!("{:>6}  {}", chat.id, chat.title);
            }
        }
        Command::Rename { chat, title } => {
            let gateway = connect(&config, &store)?;
            let renamed = gateway.rename_chat(chat, &title).await?;
            println!("renamed chat {} to {:?}", renamed.id, renamed.title);
        }
        Command::Delete { chat } => {
            let gateway = connect(&config, &store)?;
            gateway.delete_chat(chat).await?;
            println!("deleted chat {chat}");
        }
    }
    Ok(())
}

fn connect(config: &LearnaConfig, store: &CredentialStore) -> Result<Arc<dyn ChatGateway>> {
    let auth = match store.load_token()? {
        Some(token) => AuthContext::bearer(token),
        None => {
            warn!("no stored token, requests will be unauthenticated");
            AuthContext::anonymous()
        }
    };
    let gateway = HttpGateway::new(gateway_config(config), auth)?;
    Ok(Arc::new(gateway))
}

async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        attachments.push(Attachment::from_path(path).await?);
    }
    Ok(attachments)
}

/// A line typed at the conversation prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Attach(PathBuf),
    Prompt(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed == "/quit" {
        return Input::Quit;
    }
    if let Some(path) = trimmed.strip_prefix("/attach ") {
        return Input::Attach(PathBuf::from(path.trim()));
    }
    Input::Prompt(line.to_string())
}

/// Attach to `chat`, bootstrap it, then read prompts from stdin until
/// `/quit` or end of input.
async fn converse(
    gateway: Arc<dyn ChatGateway>,
    handoff: FirstInputHandoff,
    chat: ChatId,
    config: &LearnaConfig,
) -> Result<()> {
    let controller = SessionController::attach(chat, gateway, handoff, session_config(config));
    let printer = tokio::spawn(print_events(controller.subscribe()));

    let report = controller.bootstrap().await;
    if report.sign_in_required() {
        controller.detach();
        return Ok(());
    }
    if matches!(report.first_message, FirstMessageOutcome::Skipped) {
        print!("{}", format_transcript(&controller.messages().await?));
    }
    let session = controller.session();
    debug!(chat_id = %session.id, model = %session.model, agent = %session.agent, "conversation ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();
    loop {
        prompt_marker();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_input(&line) {
            Input::Quit => break,
            Input::Attach(path) => match Attachment::from_path(&path).await {
                Ok(attachment) => {
                    println!("attached {}", attachment.file_name);
                    pending.push(attachment);
                }
                Err(e) => eprintln!("cannot read {}: {e}", path.display()),
            },
            Input::Prompt(prompt) => {
                let submission = Submission {
                    prompt,
                    attachments: std::mem::take(&mut pending),
                };
                match controller.submit(submission).await {
                    Ok(SubmitOutcome::Completed { .. } | SubmitOutcome::Skipped) => {}
                    Err(ChatError::Auth) => eprintln!("{SIGN_IN_HINT}"),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
    }

    controller.detach();
    drop(controller);
    if let Err(e) = printer.await {
        warn!(error = %e, "printer task failed");
    }
    Ok(())
}

fn prompt_marker() {
    print!("you> ");
    let _ = std::io::stdout().flush();
}
