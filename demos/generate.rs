//! Generate a dataset from the command line and print its preview
//!
//! Usage: cargo run --example generate -- "sports consultant" [records] [batch_size]
//!
//! Reads `DATAGEN_BASE_URL` (and the other `DATAGEN_*` settings) from the environment or
//! a `.env` file. Set `DATAGEN_EMAIL` to record the job in that account's history.

use datagen_client::{Config, Event, GenerationRequest, JobController, Session, preview};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let domain = args.next().unwrap_or_else(|| "sports consultant".to_string());
    let records: u32 = args.next().and_then(|r| r.parse().ok()).unwrap_or(100);
    let batch_size: u32 = args.next().and_then(|b| b.parse().ok()).unwrap_or(20);

    let session = std::env::var("DATAGEN_EMAIL")
        .map(Session::new)
        .unwrap_or_else(|_| Session::anonymous());

    let config = Config::from_env()?;
    println!("Service: {}", config.service.base_url);

    let controller = JobController::new(config, session)?;
    let mut events = controller.subscribe();

    let request = GenerationRequest::new(domain)
        .with_records(records)
        .with_batch_size(batch_size);
    let handle = controller.submit(request).await?;
    println!("Job {} started", handle.file_name);

    let watcher = controller.clone();
    tokio::spawn(async move {
        datagen_client::run_with_shutdown(watcher).await;
    });

    while let Ok(event) = events.recv().await {
        match event {
            Event::Progress { progress, .. } => println!("  {progress:>3}%"),
            Event::Completed { .. } => println!("  done, fetching preview..."),
            Event::PreviewReady { .. } | Event::PreviewUnavailable { .. } => break,
            Event::Failed { error, .. } => {
                eprintln!("Generation failed: {error}");
                break;
            }
            Event::SessionEnded => break,
            _ => {}
        }
    }

    let job = controller.snapshot().await;
    println!("\n{}\n", job.message);
    println!("{}", preview::render(&job.preview));
    if let Some(url) = job.download_url {
        println!("\nDownload: {url}");
    }

    controller.shutdown().await;
    Ok(())
}
