//! # The Engine Actor
//!
//! `TrackerEngine` owns the whole [`EngineState`] and the receiving end of
//! the request channel. It processes requests *sequentially* in one task, so
//! the registry needs no locks and two mutations can never partially
//! interleave — suspension only happens between requests, never inside one.
//!
//! Collaborators are injected into [`TrackerEngine::run`] rather than the
//! constructor (late binding): the engine can be created before the
//! transport and the views exist.

use crate::collaborators::EnginePorts;
use crate::config::EngineConfig;
use crate::engine::message::EngineRequest;
use crate::engine::EngineError;
use crate::state::{EngineState, FollowUp};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct TrackerEngine {
    receiver: mpsc::Receiver<EngineRequest>,
    state: EngineState,
}

impl TrackerEngine {
    pub(crate) fn new(receiver: mpsc::Receiver<EngineRequest>, config: EngineConfig) -> Self {
        Self {
            receiver,
            state: EngineState::new(config),
        }
    }

    /// Runs the event loop until every client is dropped.
    pub async fn run(mut self, ports: EnginePorts) {
        info!("engine started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                EngineRequest::Ingest {
                    message,
                    respond_to,
                } => {
                    let now = Instant::now();
                    let report = self.state.handle_message(&message, now);
                    let outcome = report.outcome;
                    let changed = report.state_changed();
                    for notice in &report.notices {
                        ports.notices.notify(notice);
                    }
                    if let Some(FollowUp::DispatchAutoOrder { command, seed }) = report.follow_up {
                        debug!(%command, "echoing auto order to controller");
                        match ports.commands.send(command).await {
                            Ok(()) => self.state.commit_auto_order(seed, now),
                            Err(error) => {
                                warn!(%error, "auto order dispatch failed, context dropped");
                            }
                        }
                    }
                    if changed {
                        ports.views.on_update(&self.state.snapshot());
                    }
                    let _ = respond_to.send(Ok(outcome));
                }
                EngineRequest::PlaceOrder {
                    request,
                    respond_to,
                } => {
                    let now = Instant::now();
                    let result = match self.state.create_speculative(&request, now) {
                        Ok((command, token)) => {
                            debug!(%command, "dispatching order command");
                            match ports.commands.send(command).await {
                                Ok(()) => {
                                    self.state.confirm_dispatch(&token, now);
                                    ports.views.on_update(&self.state.snapshot());
                                    info!(receipt = %token, "order placed");
                                    Ok(token)
                                }
                                Err(error) => {
                                    // Never leave a visible-but-doomed order
                                    // behind.
                                    self.state.discard_speculative(&token);
                                    Err(EngineError::TransportUnavailable(error))
                                }
                            }
                        }
                        Err(error) => Err(error),
                    };
                    let _ = respond_to.send(result);
                }
                EngineRequest::CancelOrder {
                    receipt,
                    respond_to,
                } => {
                    let result = match self.state.prepare_cancel(&receipt) {
                        Ok(command) => {
                            debug!(%command, "dispatching cancel command");
                            ports
                                .commands
                                .send(command)
                                .await
                                .map_err(EngineError::from)
                        }
                        Err(error) => Err(error),
                    };
                    let _ = respond_to.send(result);
                }
                EngineRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(Ok(self.state.snapshot()));
                }
                EngineRequest::Metrics { respond_to } => {
                    let _ = respond_to.send(Ok(self.state.metrics_report()));
                }
                EngineRequest::Tick => {
                    if self.state.tick(Instant::now()) {
                        ports.views.on_update(&self.state.snapshot());
                    }
                }
            }
        }

        info!("engine shut down");
    }
}
