//! `compilebot-listener` -- Discord front end for the code-execution queue.
//!
//! Reads `+compilebot <language> <fenced code>` commands from Discord,
//! pushes jobs onto a Redis list, and posts results from a second Redis
//! list back to the channel that asked.
//!
//! See [`ListenerConfig::from_env`] for the environment variables.

use std::process::ExitCode;
use std::sync::Arc;

use compilebot_core::SessionHandle;
use compilebot_discord::{DiscordGateway, DiscordRest};
use compilebot_listener::config::{ListenerConfig, LogFormat};
use compilebot_listener::{shutdown, CommandHandler, JobSubmitter, RequestRegistry, ResponsePoller};
use compilebot_queue::RedisQueue;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Buffer between the gateway and the command dispatcher.
const INBOUND_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    init_tracing(LogFormat::from_env());

    let config = match ListenerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(?config, "Loaded listener configuration");

    // --- Queues ---
    let job_queue = match RedisQueue::connect(&config.redis_host, config.job_queue.as_str()).await {
        Ok(queue) => queue,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to job queue");
            return ExitCode::FAILURE;
        }
    };
    let response_queue =
        match RedisQueue::connect(&config.redis_host, config.response_queue.as_str()).await {
            Ok(queue) => queue,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to response queue");
                return ExitCode::FAILURE;
            }
        };

    if config.purge_response_queue {
        match response_queue.purge().await {
            Ok(discarded) => {
                tracing::info!(key = response_queue.key(), discarded, "Purged stale responses");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to purge response queue");
            }
        }
    }

    // --- Dispatcher ---
    let registry: Arc<RequestRegistry> = Arc::new(RequestRegistry::new());
    let session: SessionHandle = Arc::new(DiscordRest::new(config.discord_token.clone()));

    let submitter = JobSubmitter::new(Arc::new(job_queue), config.queue_timeout);
    let handler = Arc::new(
        CommandHandler::new(config.languages.clone(), Arc::clone(&registry), submitter)
            .with_send_timeout(config.send_timeout),
    );

    // --- Response poller ---
    let poller = ResponsePoller::new(Arc::new(response_queue), Arc::clone(&registry))
        .with_interval(config.poll_interval)
        .with_timeouts(config.queue_timeout, config.send_timeout);
    let poller_cancel = CancellationToken::new();
    let poller_handle = tokio::spawn({
        let cancel = poller_cancel.clone();
        async move { poller.run(cancel).await }
    });

    // --- Discord gateway ---
    let (events_tx, mut events_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
    let gateway = DiscordGateway::new(config.discord_token.clone());
    let gateway_cancel = CancellationToken::new();
    let gateway_handle = tokio::spawn({
        let cancel = gateway_cancel.clone();
        async move { gateway.run(events_tx, cancel).await }
    });

    tracing::info!("compilebot listener running");

    // --- Dispatch loop ---
    let tasks = TaskTracker::new();
    let shutdown = shutdown::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            inbound = events_rx.recv() => match inbound {
                Some(message) => {
                    let handler = Arc::clone(&handler);
                    let session = Arc::clone(&session);
                    tasks.spawn(async move {
                        handler.handle(&message, &session).await;
                    });
                }
                None => {
                    tracing::warn!("Gateway stopped delivering messages");
                    break;
                }
            },
        }
    }

    // --- Shutdown ---
    // Closing the receiver ends the gateway session even if it is blocked
    // on a full channel.
    drop(events_rx);

    // The poller drains first so in-flight output can still be sent.
    poller_cancel.cancel();
    if tokio::time::timeout(config.shutdown_timeout, poller_handle)
        .await
        .is_err()
    {
        tracing::warn!("Response poller did not stop in time");
    }

    tasks.close();
    if tokio::time::timeout(config.shutdown_timeout, tasks.wait())
        .await
        .is_err()
    {
        tracing::warn!(pending = tasks.len(), "Abandoning in-flight commands");
    }

    gateway_cancel.cancel();
    let exit = match tokio::time::timeout(config.shutdown_timeout, gateway_handle).await {
        Ok(Ok(Ok(()))) => ExitCode::SUCCESS,
        Ok(Ok(Err(e))) => {
            tracing::error!(error = %e, "Discord gateway failed");
            ExitCode::FAILURE
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Discord gateway task panicked");
            ExitCode::FAILURE
        }
        Err(_) => {
            tracing::warn!("Discord gateway did not stop in time");
            ExitCode::SUCCESS
        }
    };

    let registered = registry.len().await;
    tracing::info!(registered, "Shutdown complete");
    exit
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "compilebot_listener=info,compilebot_discord=info,compilebot_queue=info".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
