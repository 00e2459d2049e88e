mod cli;

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chat_bridge::{AzureTranslator, Bridge, MessageClassifier, Translator, WhatlangDetector};
use chat_bridge::{TranslationProvider, language_name};
use clap::Parser;
use colored::*;
use kick_chat::{ChannelResolver, Publisher, PublisherConfig, StreamClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;

/// Buffered inbound messages between the stream reader and the bridge.
const MESSAGE_BUFFER: usize = 256;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = args.into_settings().context("Invalid configuration")?;

    let client = kick_chat::default_client().context("Failed to build HTTP client")?;

    let identity = ChannelResolver::new(client.clone(), settings.resolver)
        .resolve(&settings.channel)
        .await
        .with_context(|| format!("Failed to resolve channel {}", settings.channel))?;
    let identity = Arc::new(identity);

    let target = settings.classifier.target_language.clone();
    info!("Channel: {}", identity.slug);
    info!("Chatroom ID: {}", identity.room_id);
    info!("Target language: {} ({})", language_name(&target), target);

    let publisher = Publisher::new(
        client.clone(),
        Arc::clone(&identity),
        settings.auth_token,
        PublisherConfig::default(),
    );
    if publisher.is_dry_run() {
        warn!("No auth token provided, translations will only be logged");
    }

    let provider: Arc<dyn TranslationProvider> =
        Arc::new(AzureTranslator::new(client, settings.azure)?);
    let translator = Translator::new(Some(provider), target);
    let detector = WhatlangDetector::default().with_min_confidence(settings.min_confidence);
    let classifier = MessageClassifier::new(settings.classifier, Arc::new(detector));
    let bridge = Bridge::new(classifier, translator, Arc::new(publisher), settings.bridge);

    let stream = StreamClient::new(Arc::clone(&identity), settings.stream);
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            shutdown.cancel();
        }
    });

    let mut state = stream.state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            debug!("Connection state: {}", *state.borrow_and_update());
        }
    });

    let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
    let (stream_result, ()) = tokio::join!(
        stream.run(tx, cancel.clone()),
        bridge.run(rx, cancel.clone())
    );
    stream_result.context("Chat stream failed")?;

    info!("Stopped");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
