use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tracing_subscriber::EnvFilter;
use upload_sync::utils::{estimate_eta, format_bytes, format_duration, format_speed};
use upload_sync::{HttpEngine, SyncConfig, SyncEvent, UploadSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SyncConfig::load_config(&path)
        .with_context(|| format!("Failed to load config: {}", path))?;

    let engine = HttpEngine::from_config(&config)?;
    let session = UploadSession::builder()
        .config(&config)
        .engine(Arc::new(engine))
        .build()?;

    let mut events = session.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SyncEvent::Stalled(warning) = event {
                println!("!! {}", warning.message());
            }
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms.max(100)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                match session.refresh().await {
                    Ok(tasks) => {
                        for task in tasks.iter() {
                            let eta = estimate_eta(task)
                                .map(|d| format!(" ETA: {}", format_duration(d)))
                                .unwrap_or_default();
                            println!(
                                "{:<24} {:<10} {:>6.2}% {}/{} {}{}",
                                task.title(),
                                task.status,
                                task.progress,
                                format_bytes(task.total_transmit_bytes),
                                format_bytes(task.total_size),
                                format_speed(task.speed),
                                eta
                            );
                        }
                    }
                    Err(err) => eprintln!("Failed to refresh upload queue: {}", err),
                }
            }
        }
    }

    session.close();
    Ok(())
}
