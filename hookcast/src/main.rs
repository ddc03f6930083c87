use std::sync::Arc;

use clap::Parser;
use hookcast::webhooks::ReqwestHttpClient;
use hookcast::{Config, InMemoryOrchestrator, MultiNotifier, Notifier, NotifierBackend, Task, TaskStatus, TaskType, WebhookDispatcher, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Push a synthetic completed task through the full notification path.
async fn send_test(config: &Config, task_id: &str) -> Result<(), hookcast::Error> {
    let Some(webhook) = config.task_webhook(None)? else {
        return Err(hookcast::Error::InvalidConfig {
            message: "--send-test needs webhook.url to be configured".to_string(),
        });
    };

    let orchestrator = Arc::new(InMemoryOrchestrator::new());
    let dispatcher = Arc::new(
        WebhookDispatcher::new(orchestrator.clone(), Arc::new(ReqwestHttpClient::default()))
            .with_request_timeout(config.delivery.request_timeout),
    );
    let notifier = MultiNotifier::new(vec![NotifierBackend::Webhook(dispatcher.clone())]);

    orchestrator.upsert(Task::new(task_id, TaskType::Convert));
    notifier.add_task(task_id).await?;
    notifier.register_webhook(task_id, Some(webhook));

    orchestrator.set_status(task_id, TaskStatus::Success);
    notifier.notify_task_subscribers(task_id).await?;

    tokio::select! {
        _ = dispatcher.drain() => {
            tracing::info!(task_id, "Test notification finished");
        },
        _ = shutdown_signal() => {
            tracing::warn!(in_flight = dispatcher.in_flight(), "Interrupted before delivery finished");
        },
    }

    notifier.remove_task(task_id).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = hookcast::config::Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry()?;

    tracing::debug!("{:?}", args);

    match args.send_test.as_deref() {
        Some(task_id) => {
            if let Err(e) = send_test(&config, task_id).await {
                if e.is_config_error() {
                    tracing::error!(error = %e, "Cannot send test notification with this configuration");
                    std::process::exit(2);
                }
                return Err(e.into());
            }
        }
        None => tracing::info!(
            webhook_enabled = config.webhook.is_enabled(),
            "Configuration loaded. Embed hookcast as a library, or pass --send-test <TASK_ID> to deliver a test notification"
        ),
    }

    Ok(())
}
