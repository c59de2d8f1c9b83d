//! Mock CU-UP for integration testing
//!
//! Consumes the E1AP messages a DU processor sends toward the CU-UP and
//! answers them through the DU processor task, according to a configured
//! behavior.

use std::collections::HashMap;
use std::sync::Arc;

use nextgcu_common::{CuCpUeE1apId, CuUpUeE1apId};
use nextgcu_cucp::messages::{E1apCause, E1apMessage, E1apResponse, E1apResponsePayload};
use nextgcu_cucp::{DuProcessorMessage, PeerReceiver, TaskHandle, TaskMessage};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// How the mock answers bearer context requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCuUpBehavior {
    /// Answer every request positively
    Accept,
    /// Answer setup and modification with a failure; releases still complete
    Reject(E1apCause),
    /// Never answer
    Silent,
    /// Answer positively, twice
    Duplicate,
}

/// Mock CU-UP configuration
#[derive(Debug, Clone)]
pub struct MockCuUpConfig {
    /// Answering behavior
    pub behavior: MockCuUpBehavior,
    /// First gNB-CU-UP UE E1AP id handed out
    pub first_cu_up_ue_e1ap_id: u32,
}

impl Default for MockCuUpConfig {
    fn default() -> Self {
        Self {
            behavior: MockCuUpBehavior::Accept,
            first_cu_up_ue_e1ap_id: 100,
        }
    }
}

/// Events emitted by the mock CU-UP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCuUpEvent {
    /// Request received from the CU-CP
    RequestReceived {
        /// Message name
        name: &'static str,
        /// Local UE id used by the CU-CP
        cu_cp_ue_e1ap_id: CuCpUeE1apId,
    },
    /// Answer sent back to the CU-CP
    ResponseSent {
        /// Message name
        name: &'static str,
        /// Local UE id used by the CU-CP
        cu_cp_ue_e1ap_id: CuCpUeE1apId,
    },
}

/// Mock CU-UP state
#[derive(Debug, Default)]
struct MockCuUpState {
    /// Bearer contexts by CU-CP UE id
    bearer_contexts: HashMap<CuCpUeE1apId, CuUpUeE1apId>,
    /// Next peer id
    next_cu_up_ue_e1ap_id: u32,
}

/// Mock CU-UP for integration testing
pub struct MockCuUp {
    config: MockCuUpConfig,
    state: Arc<RwLock<MockCuUpState>>,
    event_tx: mpsc::Sender<MockCuUpEvent>,
    event_rx: Arc<Mutex<mpsc::Receiver<MockCuUpEvent>>>,
}

impl MockCuUp {
    /// Create a new mock CU-UP with default configuration
    pub fn new() -> Self {
        Self::with_config(MockCuUpConfig::default())
    }

    /// Create a mock CU-UP with a given behavior
    pub fn with_behavior(behavior: MockCuUpBehavior) -> Self {
        Self::with_config(MockCuUpConfig {
            behavior,
            ..Default::default()
        })
    }

    /// Create a new mock CU-UP with custom configuration
    pub fn with_config(config: MockCuUpConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        let state = MockCuUpState {
            bearer_contexts: HashMap::new(),
            next_cu_up_ue_e1ap_id: config.first_cu_up_ue_e1ap_id,
        };
        Self {
            config,
            state: Arc::new(RwLock::new(state)),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    /// Starts answering the requests arriving on `rx` through `du_processor`.
    pub fn start(
        &self,
        mut rx: PeerReceiver<E1apMessage>,
        du_processor: TaskHandle<DuProcessorMessage>,
    ) -> JoinHandle<()> {
        let behavior = self.config.behavior;
        let state = self.state.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            while let Some(TaskMessage::Message(request)) = rx.recv().await {
                let cu_cp_ue_e1ap_id = request.cu_cp_ue_e1ap_id();
                tracing::debug!("[CU-UP] Received {}", request.name());
                let _ = event_tx
                    .send(MockCuUpEvent::RequestReceived {
                        name: request.name(),
                        cu_cp_ue_e1ap_id,
                    })
                    .await;

                let answers = {
                    let mut state = state.write().await;
                    Self::answer(&mut state, behavior, &request)
                };
                for answer in answers {
                    let name = answer.payload.name();
                    if du_processor
                        .send(DuProcessorMessage::E1apResponse(answer))
                        .await
                        .is_err()
                    {
                        return;
                    }
                    tracing::debug!("[CU-UP] Sent {}", name);
                    let _ = event_tx
                        .send(MockCuUpEvent::ResponseSent {
                            name,
                            cu_cp_ue_e1ap_id,
                        })
                        .await;
                }
            }
        })
    }

    fn answer(
        state: &mut MockCuUpState,
        behavior: MockCuUpBehavior,
        request: &E1apMessage,
    ) -> Vec<E1apResponse> {
        let answer = match (behavior, request) {
            (MockCuUpBehavior::Silent, _) => return Vec::new(),
            (
                MockCuUpBehavior::Reject(cause),
                E1apMessage::BearerContextSetupRequest {
                    cu_cp_ue_e1ap_id, ..
                },
            ) => E1apResponse {
                cu_cp_ue_e1ap_id: *cu_cp_ue_e1ap_id,
                cu_up_ue_e1ap_id: None,
                payload: E1apResponsePayload::BearerContextSetupFailure { cause },
            },
            (
                MockCuUpBehavior::Reject(cause),
                E1apMessage::BearerContextModificationRequest {
                    cu_cp_ue_e1ap_id,
                    cu_up_ue_e1ap_id,
                    ..
                },
            ) => E1apResponse {
                cu_cp_ue_e1ap_id: *cu_cp_ue_e1ap_id,
                cu_up_ue_e1ap_id: Some(*cu_up_ue_e1ap_id),
                payload: E1apResponsePayload::BearerContextModificationFailure { cause },
            },
            (
                _,
                E1apMessage::BearerContextSetupRequest {
                    cu_cp_ue_e1ap_id,
                    pdu_sessions,
                    ..
                },
            ) => {
                let cu_up_ue_e1ap_id = CuUpUeE1apId(state.next_cu_up_ue_e1ap_id);
                state.next_cu_up_ue_e1ap_id += 1;
                state
                    .bearer_contexts
                    .insert(*cu_cp_ue_e1ap_id, cu_up_ue_e1ap_id);
                E1apResponse {
                    cu_cp_ue_e1ap_id: *cu_cp_ue_e1ap_id,
                    cu_up_ue_e1ap_id: Some(cu_up_ue_e1ap_id),
                    payload: E1apResponsePayload::BearerContextSetupResponse {
                        pdu_sessions_setup: pdu_sessions
                            .iter()
                            .map(|item| item.pdu_session_id)
                            .collect(),
                        pdu_sessions_failed: Vec::new(),
                    },
                }
            }
            (
                _,
                E1apMessage::BearerContextModificationRequest {
                    cu_cp_ue_e1ap_id,
                    cu_up_ue_e1ap_id,
                    pdu_sessions_to_modify,
                    ..
                },
            ) => E1apResponse {
                cu_cp_ue_e1ap_id: *cu_cp_ue_e1ap_id,
                cu_up_ue_e1ap_id: Some(*cu_up_ue_e1ap_id),
                payload: E1apResponsePayload::BearerContextModificationResponse {
                    pdu_sessions_modified: pdu_sessions_to_modify
                        .iter()
                        .map(|item| item.pdu_session_id)
                        .collect(),
                    pdu_sessions_failed: Vec::new(),
                },
            },
            (
                _,
                E1apMessage::BearerContextReleaseCommand {
                    cu_cp_ue_e1ap_id,
                    cu_up_ue_e1ap_id,
                    ..
                },
            ) => {
                state.bearer_contexts.remove(cu_cp_ue_e1ap_id);
                E1apResponse {
                    cu_cp_ue_e1ap_id: *cu_cp_ue_e1ap_id,
                    cu_up_ue_e1ap_id: Some(*cu_up_ue_e1ap_id),
                    payload: E1apResponsePayload::BearerContextReleaseComplete,
                }
            }
        };

        if behavior == MockCuUpBehavior::Duplicate {
            vec![answer.clone(), answer]
        } else {
            vec![answer]
        }
    }

    /// Get the next event from the mock CU-UP
    pub async fn next_event(&self) -> Option<MockCuUpEvent> {
        self.event_rx.lock().await.recv().await
    }

    /// Number of bearer contexts currently held
    pub async fn bearer_context_count(&self) -> usize {
        self.state.read().await.bearer_contexts.len()
    }

    /// Peer id assigned to a CU-CP UE, if a bearer context exists
    pub async fn bearer_context(&self, cu_cp_ue_e1ap_id: CuCpUeE1apId) -> Option<CuUpUeE1apId> {
        self.state
            .read()
            .await
            .bearer_contexts
            .get(&cu_cp_ue_e1ap_id)
            .copied()
    }
}

impl Default for MockCuUp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nextgcu_common::{PduSessionId, Plmn};
    use nextgcu_cucp::messages::PduSessionSetupItem;

    fn setup_request(id: u32) -> E1apMessage {
        E1apMessage::BearerContextSetupRequest {
            cu_cp_ue_e1ap_id: CuCpUeE1apId(id),
            serving_plmn: Plmn::new(1, 1, false),
            pdu_sessions: vec![PduSessionSetupItem {
                pdu_session_id: PduSessionId(1),
                sst: 1,
                qos_flows: vec![1],
            }],
        }
    }

    #[test]
    fn test_accept_assigns_peer_ids() {
        let mut state = MockCuUpState {
            next_cu_up_ue_e1ap_id: 100,
            ..Default::default()
        };
        let first = MockCuUp::answer(&mut state, MockCuUpBehavior::Accept, &setup_request(0));
        let second = MockCuUp::answer(&mut state, MockCuUpBehavior::Accept, &setup_request(1));

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].cu_up_ue_e1ap_id, Some(CuUpUeE1apId(100)));
        assert_eq!(second[0].cu_up_ue_e1ap_id, Some(CuUpUeE1apId(101)));
        assert_eq!(state.bearer_contexts.len(), 2);
    }

    #[test]
    fn test_reject_and_silent() {
        let mut state = MockCuUpState::default();
        let rejected = MockCuUp::answer(
            &mut state,
            MockCuUpBehavior::Reject(E1apCause::ResourcesNotAvailable),
            &setup_request(0),
        );
        assert_eq!(
            rejected[0].payload,
            E1apResponsePayload::BearerContextSetupFailure {
                cause: E1apCause::ResourcesNotAvailable
            }
        );
        assert!(state.bearer_contexts.is_empty());

        assert!(MockCuUp::answer(&mut state, MockCuUpBehavior::Silent, &setup_request(0)).is_empty());
    }

    #[test]
    fn test_duplicate_answers_twice() {
        let mut state = MockCuUpState::default();
        let answers = MockCuUp::answer(&mut state, MockCuUpBehavior::Duplicate, &setup_request(3));
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0], answers[1]);
    }
}
