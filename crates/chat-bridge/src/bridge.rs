//! The translation pipeline.
//!
//! Inbound messages are classified one at a time on the caller's task. Accepted
//! messages are translated and published on tracked background tasks, bounded
//! by [`BridgeConfig::max_in_flight`], so a slow provider never stalls the
//! stream reader.

use std::sync::Arc;

use async_trait::async_trait;
use kick_chat::{InboundMessage, Publisher};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::classifier::{Classification, MessageClassifier, SkipReason};
use crate::config::BridgeConfig;
use crate::rate::RateGate;
use crate::translator::Translator;

/// Destination for finished translations.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Post `text`. Returns whether it was delivered.
    async fn publish(&self, text: &str) -> bool;
}

#[async_trait]
impl MessageSink for Publisher {
    async fn publish(&self, text: &str) -> bool {
        Publisher::publish(self, text).await
    }
}

pub struct Bridge {
    classifier: MessageClassifier,
    translator: Translator,
    sink: Arc<dyn MessageSink>,
    rate_gate: Arc<RateGate>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(
        classifier: MessageClassifier,
        translator: Translator,
        sink: Arc<dyn MessageSink>,
        config: BridgeConfig,
    ) -> Self {
        let rate_gate = classifier.rate_gate();
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            classifier,
            translator,
            sink,
            rate_gate,
            permits,
            tracker: TaskTracker::new(),
            config,
        }
    }

    /// Number of translate+publish tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Classify `message` and dispatch it when it qualifies.
    ///
    /// Never blocks on translation or publishing.
    pub fn handle(&self, message: InboundMessage) -> Classification {
        let classification = self.classifier.classify(&message, Instant::now());

        if classification.skip_reason() != Some(SkipReason::OwnMessage) {
            info!(
                "{} [{}]: {}",
                message.username,
                classification.detected_language.as_deref().unwrap_or("?"),
                message.raw_text
            );
        }

        if !classification.should_translate() {
            return classification;
        }
        let Some(source_lang) = classification.detected_language.clone() else {
            return classification;
        };

        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    "Too many translations in flight ({}), dropping message from {}",
                    self.config.max_in_flight, message.username
                );
                if let Some(reservation) = classification.reservation {
                    self.rate_gate.release(reservation);
                }
                return classification;
            }
        };

        let translator = self.translator.clone();
        let sink = Arc::clone(&self.sink);
        let rate_gate = Arc::clone(&self.rate_gate);
        let prefix = self.classifier.config().translation_prefix.clone();
        let reservation = classification.reservation;
        let text = classification.cleaned_text.clone();
        let sender = message.username;

        self.tracker.spawn(async move {
            let _permit = permit;

            let delivered = match translator.translate(&text, &source_lang).await {
                Some(result) => {
                    let outgoing = result.format(&prefix, &sender);
                    debug!("Publishing translation for {}: {}", sender, outgoing);
                    sink.publish(&outgoing).await
                }
                None => false,
            };

            if !delivered && let Some(reservation) = reservation {
                rate_gate.release(reservation);
            }
        });

        classification
    }

    /// Consume messages until the channel closes or `cancel` fires, then shut down.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundMessage>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Bridge cancelled");
                    break;
                }
                message = rx.recv() => match message {
                    Some(message) => {
                        self.handle(message);
                    }
                    None => {
                        debug!("Message stream closed");
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
    }

    /// Stop accepting work and wait for in-flight sends, bounded by the shutdown timeout.
    pub async fn shutdown(&self) {
        self.tracker.close();
        if self.tracker.is_empty() {
            return;
        }

        info!("Waiting for {} in-flight translations", self.tracker.len());
        if tokio::time::timeout(self.config.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                "Shutdown timed out after {:?} with {} translations still in flight",
                self.config.shutdown_timeout,
                self.tracker.len()
            );
        }
    }
}
