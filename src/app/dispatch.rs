use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use chatkeep::chat::{ChatService, Reply, TurnRequest};
use chatkeep::config::{Config, ConfigHandle};
use chatkeep::llm::{OpenAiCompatibleProvider, build_provider_client};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();
    spawn_ctrl_c_listener(shutdown.clone());

    let handle = ConfigHandle::new(config);
    let snapshot = handle.load_full();
    let client = build_provider_client(snapshot.gateway_config().request_timeout);
    let provider = Arc::new(OpenAiCompatibleProvider::with_client(
        "compatible",
        &snapshot.provider.base_url,
        snapshot.api_key.as_deref(),
        client,
    ));
    let service = ChatService::from_config(handle, provider, shutdown.clone());

    let sweeper = snapshot.session.sweep_interval().map(|every| {
        Arc::clone(service.registry().store()).spawn_sweeper(every, shutdown.clone())
    });

    let result = match cli.command {
        Commands::Chat {
            conversation,
            system_prompt,
            model,
        } => run_chat(&service, &conversation, system_prompt, model, &shutdown).await,
        Commands::Ask {
            conversation,
            system_prompt,
            model,
            message,
        } => {
            let request = TurnRequest {
                conversation,
                text: message.join(" "),
                system_prompt,
                model,
            };
            print_reply(&service.handle(request).await);
            Ok(())
        }
    };

    shutdown.cancel();
    if let Some(sweeper) = sweeper
        && let Err(err) = sweeper.await
    {
        tracing::warn!("Expiry sweeper ended abnormally: {err}");
    }
    result
}

fn spawn_ctrl_c_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
    });
}

/// Read-eval loop over stdin. The system prompt override applies to the
/// first turn only; later turns continue the same conversation.
async fn run_chat(
    service: &ChatService,
    conversation: &str,
    mut system_prompt: Option<String>,
    model: Option<String>,
    shutdown: &CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("chatkeep: conversation '{conversation}'. Ctrl-D or Ctrl-C to quit.");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let request = TurnRequest {
            conversation: Some(conversation.to_string()),
            text: line,
            system_prompt: system_prompt.take(),
            model: model.clone(),
        };
        let reply = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            reply = service.handle(request) => reply,
        };
        print_reply(&reply);
    }
    println!();
    Ok(())
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Text(text) => println!("{text}"),
        Reply::Info(info) => println!("[{info}]"),
        Reply::Error(err) => eprintln!("{err}"),
    }
}
