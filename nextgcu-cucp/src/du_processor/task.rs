//! DU Processor Task
//!
//! Owns one `DuProcessor` and applies inbound events to it one at a time.
//! Requests that expect an answer carry an optional oneshot sender; a dropped
//! receiver is not an error.
//!
//! Procedures prepared with a channel continuation are launched either by a
//! poll or by their waiter asking for the result. The task watches those
//! launch requests next to its inbound channel.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

use super::processor::DuProcessor;
use crate::error::CuCpError;
use crate::procedure::{LaunchRequest, ProcedureId};
use crate::tasks::{DuProcessorMessage, Task, TaskMessage};

/// Actor wrapper around a `DuProcessor`
pub struct DuProcessorTask {
    processor: DuProcessor,
    launch_requests: JoinSet<Option<ProcedureId>>,
}

impl DuProcessorTask {
    /// Creates the task around an existing processor
    pub fn new(processor: DuProcessor) -> Self {
        Self {
            processor,
            launch_requests: JoinSet::new(),
        }
    }

    /// The wrapped processor
    pub fn processor(&self) -> &DuProcessor {
        &self.processor
    }

    /// Consumes the task and returns the processor
    pub fn into_processor(self) -> DuProcessor {
        self.processor
    }

    fn handle_message(&mut self, msg: DuProcessorMessage) {
        match msg {
            DuProcessorMessage::F1SetupRequest(request) => {
                if let Err(e) = self.processor.handle_f1_setup_request(request) {
                    debug!("F1 Setup rejected: {}", e);
                }
            }
            DuProcessorMessage::UeCreationRequest {
                request,
                response_tx,
            } => {
                let result = self.processor.handle_ue_creation_request(request);
                reply(response_tx, result);
            }
            DuProcessorMessage::UeContextReleaseCommand {
                command,
                response_tx,
            } => {
                let result = self.processor.handle_ue_context_release_command(command);
                reply(response_tx, result);
            }
            DuProcessorMessage::BearerContextSetup {
                ue_index,
                request,
                mut continuation,
                response_tx,
            } => {
                let launch = continuation.take_launch_request();
                let result =
                    self.processor
                        .start_bearer_context_setup(ue_index, request, continuation);
                self.watch_launch(&result, launch);
                reply(response_tx, result);
            }
            DuProcessorMessage::BearerContextModification {
                ue_index,
                request,
                mut continuation,
                response_tx,
            } => {
                let launch = continuation.take_launch_request();
                let result = self.processor.start_bearer_context_modification(
                    ue_index,
                    request,
                    continuation,
                );
                self.watch_launch(&result, launch);
                reply(response_tx, result);
            }
            DuProcessorMessage::BearerContextRelease {
                ue_index,
                cause,
                mut continuation,
                response_tx,
            } => {
                let launch = continuation.take_launch_request();
                let result =
                    self.processor
                        .start_bearer_context_release(ue_index, cause, continuation);
                self.watch_launch(&result, launch);
                reply(response_tx, result);
            }
            DuProcessorMessage::PollProcedure { id, response_tx } => {
                let result = self.processor.poll_procedure(id);
                reply(response_tx, result);
            }
            DuProcessorMessage::CancelProcedure { id, response_tx } => {
                let result = self.processor.cancel_procedure(id);
                reply(response_tx, result);
            }
            DuProcessorMessage::E1apResponse(response) => {
                self.processor.handle_e1ap_message(response);
            }
            DuProcessorMessage::Tick => {
                let expired = self.processor.tick();
                if !expired.is_empty() {
                    debug!("{} procedure(s) timed out", expired.len());
                }
            }
            DuProcessorMessage::Stats { response_tx } => {
                reply(Some(response_tx), self.processor.stats().clone());
            }
        }
    }

    fn watch_launch(
        &mut self,
        prepared: &Result<ProcedureId, CuCpError>,
        launch: Option<LaunchRequest>,
    ) {
        if let (Ok(id), Some(launch)) = (prepared, launch) {
            let id = *id;
            self.launch_requests
                .spawn(async move { launch.requested().await.then_some(id) });
        }
    }

    fn on_launch_request(&mut self, id: ProcedureId) {
        match self.processor.poll_procedure(id) {
            Ok(state) => debug!("Result of {} requested, state {}", id, state),
            Err(e) => debug!("Result of {} requested: {}", id, e),
        }
    }
}

fn reply<T>(tx: Option<oneshot::Sender<T>>, value: T) {
    if let Some(tx) = tx {
        if tx.send(value).is_err() {
            trace!("Requester dropped before the reply");
        }
    }
}

#[async_trait::async_trait]
impl Task for DuProcessorTask {
    type Message = DuProcessorMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!("DU processor task started (du_index={})", self.processor.du_index().0);

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(TaskMessage::Message(du_msg)) => self.handle_message(du_msg),
                        Some(TaskMessage::Shutdown) => {
                            info!("DU processor task received shutdown signal");
                            break;
                        }
                        None => {
                            info!("DU processor task channel closed");
                            break;
                        }
                    }
                }
                Some(joined) = self.launch_requests.join_next() => {
                    if let Ok(Some(id)) = joined {
                        self.on_launch_request(id);
                    }
                }
            }
        }
        self.launch_requests.abort_all();

        info!(
            "DU processor task stopped, {} UE(s) and {} procedure(s) left",
            self.processor.nof_ues(),
            self.processor.active_procedures()
        );
    }
}
