//! Sends a batch's payloads one by one and applies the failure policy.
//!
//! Transport failures abort the batch and go back to the host for a retry.
//! Every other failure is logged and that payload is dropped; later payloads
//! of the same batch are still attempted.

use std::sync::Arc;

use tracing::Span;

use crate::decode::decode_batch;
use crate::error::ChatError;
use crate::payload::PayloadBuilder;
use crate::traits::ChatClient;
use crate::types::{Batch, DispatchReport, Payload};

pub struct Dispatcher {
    builder: PayloadBuilder,
    client: Arc<dyn ChatClient>,
    span: Span,
}

impl Dispatcher {
    pub fn new(builder: PayloadBuilder, client: Arc<dyn ChatClient>) -> Self {
        Self {
            builder,
            client,
            span: tracing::info_span!("dispatcher"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn builder(&self) -> &PayloadBuilder {
        &self.builder
    }

    /// Build and send the payloads of `batch`, in first-seen space order.
    ///
    /// Returns `Err` only for a transient failure; payloads sent before it
    /// are not rolled back.
    pub async fn dispatch(&self, batch: &Batch) -> Result<DispatchReport, ChatError> {
        let payloads = self.builder.build(batch);
        let mut report = DispatchReport {
            events: batch.len(),
            payloads: payloads.len(),
            ..DispatchReport::default()
        };

        for payload in &payloads {
            match self.send(payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        parent: &self.span,
                        kind = e.kind(),
                        space = %payload.space,
                        error = %e,
                        "out_google_chat: transient failure, batch will be retried"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(
                        parent: &self.span,
                        kind = e.kind(),
                        status = e.failure().map(|f| f.status),
                        space = %payload.space,
                        error = %e,
                        "out_google_chat: message discarded"
                    );
                    report.discarded += 1;
                }
            }
        }

        tracing::debug!(
            parent: &self.span,
            events = report.events,
            delivered = report.delivered,
            discarded = report.discarded,
            "batch dispatched"
        );
        Ok(report)
    }

    /// Decode a host chunk and dispatch it. Undecodable chunks are logged and
    /// dropped, since retrying them can never succeed.
    pub async fn write(&self, chunk: &[u8]) -> Result<DispatchReport, ChatError> {
        match decode_batch(chunk) {
            Ok(batch) => self.dispatch(&batch).await,
            Err(e) => {
                tracing::error!(
                    parent: &self.span,
                    error = %e,
                    bytes = chunk.len(),
                    "out_google_chat: undecodable chunk discarded"
                );
                Ok(DispatchReport::default())
            }
        }
    }

    async fn send(&self, payload: &Payload) -> Result<(), ChatError> {
        self.client.send(&payload.params()).await.map(|_| ())
    }
}
