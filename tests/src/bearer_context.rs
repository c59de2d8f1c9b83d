//! Bearer Context Procedure Tests
//!
//! Drives the E1AP bearer context procedures of a DU processor against a
//! mock CU-UP:
//! - Lazy launch by poll or by awaiting the result, and cancellation of
//!   unlaunched procedures
//! - Completion, rejection, duplicates and late responses
//! - Tick-driven timeouts
//! - Cancellation on UE release

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use integration_tests::{
    generate_valid_f1_setup_request, init_test_logging, test_cucp_config, MockCuUp,
    MockCuUpBehavior, MockCuUpEvent, TestCuCp, TestResult, TEST_CELL_ID, TEST_RNTI_BASE,
};
use nextgcu_common::{CuCpUeE1apId, CuUpUeE1apId, PduSessionId, Plmn, ProcedureKind};
use nextgcu_cucp::error::ErrorKind;
use nextgcu_cucp::messages::{
    E1apCause, E1apMessage, E1apResponse, E1apResponsePayload, PduSessionSetupItem,
};
use nextgcu_cucp::procedure::{
    BearerContextModificationOutcome, BearerContextModificationRequest, BearerContextReleased,
    BearerContextSetupOutcome, BearerContextSetupRequest,
};
use nextgcu_cucp::{
    Continuation, DuProcessorMessage, ProcedureError, ProcedureResult, ProcedureState, UeIndex,
};
use tokio::sync::oneshot;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn setup_request() -> BearerContextSetupRequest {
    BearerContextSetupRequest {
        serving_plmn: Plmn::new(1, 1, false),
        pdu_sessions: vec![PduSessionSetupItem {
            pdu_session_id: PduSessionId(1),
            sst: 1,
            qos_flows: vec![1, 2],
        }],
    }
}

/// Attached DU with one UE
async fn cucp_with_ue() -> TestResult<(TestCuCp, UeIndex)> {
    let mut cucp = TestCuCp::spawn(test_cucp_config(8));
    cucp.f1_setup(generate_valid_f1_setup_request()).await?;
    let ue_index = cucp
        .create_ue(TEST_RNTI_BASE, TEST_CELL_ID)
        .await?
        .ue_index()
        .ok_or("UE creation failed")?;
    Ok((cucp, ue_index))
}

/// Attached DU with one UE, answered by a running mock CU-UP
async fn cucp_with_cu_up(behavior: MockCuUpBehavior) -> TestResult<(TestCuCp, UeIndex, MockCuUp)> {
    let (mut cucp, ue_index) = cucp_with_ue().await?;
    let cu_up = MockCuUp::with_behavior(behavior);
    let rx = cucp.take_cu_up_rx().ok_or("CU-UP receiver already taken")?;
    cu_up.start(rx, cucp.handle());
    Ok((cucp, ue_index, cu_up))
}

/// Prepares a setup whose outcomes are counted by a callback continuation
async fn prepare_counted_setup(
    cucp: &TestCuCp,
    ue_index: UeIndex,
) -> TestResult<(
    nextgcu_cucp::ProcedureId,
    Arc<AtomicUsize>,
    Arc<Mutex<Vec<ProcedureResult<BearerContextSetupOutcome>>>>,
)> {
    let calls = Arc::new(AtomicUsize::new(0));
    let results: Arc<Mutex<Vec<ProcedureResult<BearerContextSetupOutcome>>>> =
        Arc::new(Mutex::new(Vec::new()));
    let (calls_cb, results_cb) = (calls.clone(), results.clone());
    let continuation: Continuation<BearerContextSetupOutcome> =
        Continuation::callback(move |result| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut results) = results_cb.lock() {
                results.push(result);
            }
        });

    let (tx, rx) = oneshot::channel();
    cucp.handle()
        .send(DuProcessorMessage::BearerContextSetup {
            ue_index,
            request: setup_request(),
            continuation,
            response_tx: Some(tx),
        })
        .await
        .map_err(|_| "DU processor task is gone")?;
    Ok((rx.await??, calls, results))
}

/// Test: setup completes and binds the CU-UP id to the UE
#[tokio::test]
async fn test_bearer_context_setup_completes() -> TestResult {
    init_test_logging();

    let (cucp, ue_index, cu_up) = cucp_with_cu_up(MockCuUpBehavior::Accept).await?;
    let (id, waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;

    assert_eq!(cucp.poll(id).await?, ProcedureState::AwaitingResponse);
    let outcome = timeout(WAIT, waiter.wait()).await??;
    assert_eq!(
        outcome,
        BearerContextSetupOutcome::Success {
            cu_up_ue_e1ap_id: Some(CuUpUeE1apId(100)),
            pdu_sessions_setup: vec![PduSessionId(1)],
            pdu_sessions_failed: Vec::new(),
        }
    );

    // Polling a finished procedure reports its terminal state
    assert_eq!(cucp.poll(id).await?, ProcedureState::Completed);
    // first E1AP id handed out by this DU processor
    assert_eq!(
        cu_up.bearer_context(CuCpUeE1apId(0)).await,
        Some(CuUpUeE1apId(100))
    );

    let stats = cucp.stats().await?;
    assert_eq!(stats.procedures_started, 1);
    assert_eq!(stats.procedures_completed, 1);

    let processor = cucp.shutdown().await?;
    assert_eq!(
        processor
            .find_ue(ue_index)
            .and_then(|ue| ue.cu_up_ue_e1ap_id),
        Some(CuUpUeE1apId(100))
    );
    assert_eq!(processor.active_procedures(), 0);
    Ok(())
}

/// Test: nothing is sent until the procedure is polled or its result awaited
#[tokio::test]
async fn test_launch_is_lazy() -> TestResult {
    init_test_logging();

    let (mut cucp, ue_index) = cucp_with_ue().await?;
    let (id, _waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;

    cucp.stats().await?;
    assert!(cucp.cu_up_idle());

    // Idle procedures do not time out
    cucp.tick(20).await?;
    assert_eq!(cucp.stats().await?.procedures_timed_out, 0);

    assert_eq!(cucp.poll(id).await?, ProcedureState::AwaitingResponse);
    match cucp.next_cu_up_message().await? {
        E1apMessage::BearerContextSetupRequest {
            cu_cp_ue_e1ap_id,
            pdu_sessions,
            ..
        } => {
            assert_eq!(cu_cp_ue_e1ap_id, CuCpUeE1apId(0));
            assert_eq!(pdu_sessions.len(), 1);
        }
        other => panic!("expected Bearer Context Setup Request, got {other:?}"),
    }

    // A second poll does not resend
    assert_eq!(cucp.poll(id).await?, ProcedureState::AwaitingResponse);
    cucp.stats().await?;
    assert!(cucp.cu_up_idle());

    cucp.shutdown().await?;
    Ok(())
}

/// Test: awaiting the result of an idle procedure sends its request
#[tokio::test]
async fn test_awaiting_result_launches_procedure() -> TestResult {
    init_test_logging();

    let (mut cucp, ue_index) = cucp_with_ue().await?;
    let (id, waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;
    cucp.stats().await?;
    assert!(cucp.cu_up_idle());

    let result = tokio::spawn(waiter.wait());
    let request = match cucp.next_cu_up_message().await? {
        request @ E1apMessage::BearerContextSetupRequest { .. } => request,
        other => panic!("expected Bearer Context Setup Request, got {other:?}"),
    };
    assert_eq!(cucp.poll(id).await?, ProcedureState::AwaitingResponse);

    cucp.deliver(E1apResponse {
        cu_cp_ue_e1ap_id: request.cu_cp_ue_e1ap_id(),
        cu_up_ue_e1ap_id: Some(CuUpUeE1apId(9)),
        payload: E1apResponsePayload::BearerContextSetupResponse {
            pdu_sessions_setup: vec![PduSessionId(1)],
            pdu_sessions_failed: Vec::new(),
        },
    })
    .await?;
    assert!(timeout(WAIT, result).await???.is_success());

    // once launched by the waiter, the deadline runs
    let (_, waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;
    let result = tokio::spawn(waiter.wait());
    cucp.next_cu_up_message().await?;
    cucp.tick(5).await?;
    assert_eq!(
        timeout(WAIT, result).await??,
        Err(ProcedureError::TimedOut {
            kind: ProcedureKind::BearerContextSetup,
            ticks: 5
        })
    );

    let processor = cucp.shutdown().await?;
    assert_eq!(
        processor.find_ue(ue_index).and_then(|ue| ue.cu_up_ue_e1ap_id),
        Some(CuUpUeE1apId(9))
    );
    Ok(())
}

/// Test: an unlaunched procedure can be canceled without emitting anything
#[tokio::test]
async fn test_cancel_unlaunched_procedure() -> TestResult {
    init_test_logging();

    let (mut cucp, ue_index) = cucp_with_ue().await?;
    let (id, waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;

    assert_eq!(cucp.cancel(id).await?, ProcedureState::Canceled);
    assert_eq!(
        timeout(WAIT, waiter.wait()).await?,
        Err(ProcedureError::Canceled {
            kind: ProcedureKind::BearerContextSetup
        })
    );

    // Cancellation is idempotent, and a canceled procedure never launches
    assert_eq!(cucp.cancel(id).await?, ProcedureState::Canceled);
    assert_eq!(cucp.poll(id).await?, ProcedureState::Canceled);
    cucp.stats().await?;
    assert!(cucp.cu_up_idle());

    let stats = cucp.stats().await?;
    assert_eq!(stats.procedures_canceled, 1);

    cucp.shutdown().await?;
    Ok(())
}

/// Test: no response within the timeout cancels with a timeout, exactly once
#[tokio::test]
async fn test_procedure_timeout() -> TestResult {
    init_test_logging();

    let (mut cucp, ue_index) = cucp_with_ue().await?;
    let (id, calls, results) = prepare_counted_setup(&cucp, ue_index).await?;

    cucp.poll(id).await?;
    let request = cucp.next_cu_up_message().await?;

    cucp.tick(4).await?;
    cucp.stats().await?;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    cucp.tick(1).await?;
    let stats = cucp.stats().await?;
    assert_eq!(stats.procedures_timed_out, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        results.lock().map(|r| r.clone()).unwrap_or_default(),
        vec![Err(ProcedureError::TimedOut {
            kind: ProcedureKind::BearerContextSetup,
            ticks: 5
        })]
    );

    // A response after the timeout is discarded as late
    cucp.deliver(E1apResponse {
        cu_cp_ue_e1ap_id: request.cu_cp_ue_e1ap_id(),
        cu_up_ue_e1ap_id: Some(CuUpUeE1apId(5)),
        payload: E1apResponsePayload::BearerContextSetupResponse {
            pdu_sessions_setup: vec![PduSessionId(1)],
            pdu_sessions_failed: Vec::new(),
        },
    })
    .await?;
    cucp.tick(10).await?;

    let stats = cucp.stats().await?;
    assert_eq!(stats.responses_discarded, 1);
    assert_eq!(stats.procedures_completed, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let processor = cucp.shutdown().await?;
    assert_eq!(processor.procedure_state(id), Some(ProcedureState::Canceled));
    assert_eq!(
        processor.find_ue(ue_index).and_then(|ue| ue.cu_up_ue_e1ap_id),
        None
    );
    Ok(())
}

/// Test: a duplicate response is discarded and does not re-invoke the continuation
#[tokio::test]
async fn test_duplicate_response_is_discarded() -> TestResult {
    init_test_logging();

    let (cucp, ue_index, cu_up) = cucp_with_cu_up(MockCuUpBehavior::Duplicate).await?;
    let (id, calls, results) = prepare_counted_setup(&cucp, ue_index).await?;
    cucp.poll(id).await?;

    let mut sent = 0;
    while sent < 2 {
        match timeout(WAIT, cu_up.next_event()).await? {
            Some(MockCuUpEvent::ResponseSent { .. }) => sent += 1,
            Some(_) => {}
            None => return Err("mock CU-UP stopped".into()),
        }
    }

    let stats = cucp.stats().await?;
    assert_eq!(stats.procedures_completed, 1);
    assert_eq!(stats.responses_discarded, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results
        .lock()
        .map(|r| matches!(r.first(), Some(Ok(outcome)) if outcome.is_success()))
        .unwrap_or(false));

    cucp.shutdown().await?;
    Ok(())
}

/// Test: a CU-UP failure answer completes the procedure with the failure outcome
#[tokio::test]
async fn test_bearer_context_setup_rejected() -> TestResult {
    init_test_logging();

    let (cucp, ue_index, cu_up) =
        cucp_with_cu_up(MockCuUpBehavior::Reject(E1apCause::ResourcesNotAvailable)).await?;
    let (id, waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;
    cucp.poll(id).await?;

    assert_eq!(
        timeout(WAIT, waiter.wait()).await??,
        BearerContextSetupOutcome::Failure {
            cause: E1apCause::ResourcesNotAvailable
        }
    );
    assert_eq!(cu_up.bearer_context_count().await, 0);

    let processor = cucp.shutdown().await?;
    assert_eq!(processor.procedure_state(id), Some(ProcedureState::Completed));
    assert_eq!(
        processor.find_ue(ue_index).and_then(|ue| ue.cu_up_ue_e1ap_id),
        None
    );
    Ok(())
}

/// Test: modification and release need the CU-UP id, then complete against it
#[tokio::test]
async fn test_bearer_context_modification_and_release() -> TestResult {
    init_test_logging();

    let (cucp, ue_index, cu_up) = cucp_with_cu_up(MockCuUpBehavior::Accept).await?;

    let err = cucp
        .prepare_bearer_context_modification(ue_index, BearerContextModificationRequest::default())
        .await
        .err()
        .ok_or("modification without a CU-UP id must fail")?;
    assert!(err.to_string().contains("E1AP ID"));

    let (id, waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;
    cucp.poll(id).await?;
    assert!(timeout(WAIT, waiter.wait()).await??.is_success());

    let (id, waiter) = cucp
        .prepare_bearer_context_modification(
            ue_index,
            BearerContextModificationRequest {
                pdu_sessions_to_modify: vec![PduSessionSetupItem {
                    pdu_session_id: PduSessionId(1),
                    sst: 1,
                    qos_flows: vec![3],
                }],
                pdu_sessions_to_remove: Vec::new(),
            },
        )
        .await?;
    cucp.poll(id).await?;
    assert_eq!(
        timeout(WAIT, waiter.wait()).await??,
        BearerContextModificationOutcome::Success {
            pdu_sessions_modified: vec![PduSessionId(1)],
            pdu_sessions_failed: Vec::new(),
        }
    );

    let (id, waiter) = cucp
        .prepare_bearer_context_release(ue_index, E1apCause::NormalRelease)
        .await?;
    cucp.poll(id).await?;
    assert_eq!(timeout(WAIT, waiter.wait()).await??, BearerContextReleased);
    assert_eq!(cu_up.bearer_context_count().await, 0);

    let stats = cucp.stats().await?;
    assert_eq!(stats.procedures_started, 3);
    assert_eq!(stats.procedures_completed, 3);

    cucp.shutdown().await?;
    Ok(())
}

/// Test: releasing a UE cancels the procedures it owns
#[tokio::test]
async fn test_ue_release_cancels_procedures() -> TestResult {
    init_test_logging();

    let (cucp, ue_index, _cu_up) = cucp_with_cu_up(MockCuUpBehavior::Silent).await?;
    let (launched, launched_waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;
    cucp.poll(launched).await?;
    let (_idle, idle_waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;

    cucp.release_ue(ue_index).await??;

    let canceled = Err(ProcedureError::Canceled {
        kind: ProcedureKind::BearerContextSetup,
    });
    assert_eq!(timeout(WAIT, launched_waiter.wait()).await?, canceled);
    assert_eq!(timeout(WAIT, idle_waiter.wait()).await?, canceled);

    let stats = cucp.stats().await?;
    assert_eq!(stats.procedures_canceled, 2);
    assert_eq!(stats.active_ues, 0);

    // Procedures of a released UE are gone
    let err = cucp.poll(launched).await.err().ok_or("poll must fail")?;
    assert!(err.to_string().contains("procedure"));

    // Starting a procedure for the released UE fails
    let (tx, rx) = oneshot::channel();
    let (continuation, _waiter) = Continuation::channel(ProcedureKind::BearerContextSetup);
    cucp.handle()
        .send(DuProcessorMessage::BearerContextSetup {
            ue_index,
            request: setup_request(),
            continuation,
            response_tx: Some(tx),
        })
        .await
        .map_err(|_| "DU processor task is gone")?;
    let err = rx.await?.err().ok_or("setup for a released UE must fail")?;
    assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);

    cucp.shutdown().await?;
    Ok(())
}

/// Test: an answer for a released UE never completes the UE that reuses its index
#[tokio::test]
async fn test_late_answer_after_release_ignored_by_successor() -> TestResult {
    init_test_logging();

    let (mut cucp, ue_index) = cucp_with_ue().await?;
    let (old, _old_waiter) = cucp
        .prepare_bearer_context_setup(ue_index, setup_request())
        .await?;
    cucp.poll(old).await?;
    let old_request = cucp.next_cu_up_message().await?;
    cucp.release_ue(ue_index).await??;

    let successor = cucp
        .create_ue(TEST_RNTI_BASE + 1, TEST_CELL_ID)
        .await?
        .ue_index()
        .ok_or("UE creation failed")?;
    assert_eq!(successor, ue_index);
    let (new, new_waiter) = cucp
        .prepare_bearer_context_setup(successor, setup_request())
        .await?;
    cucp.poll(new).await?;
    let new_request = cucp.next_cu_up_message().await?;
    assert_ne!(old_request.cu_cp_ue_e1ap_id(), new_request.cu_cp_ue_e1ap_id());

    let answer = |request: &E1apMessage, peer: u32| E1apResponse {
        cu_cp_ue_e1ap_id: request.cu_cp_ue_e1ap_id(),
        cu_up_ue_e1ap_id: Some(CuUpUeE1apId(peer)),
        payload: E1apResponsePayload::BearerContextSetupResponse {
            pdu_sessions_setup: vec![PduSessionId(1)],
            pdu_sessions_failed: Vec::new(),
        },
    };

    cucp.deliver(answer(&old_request, 55)).await?;
    let stats = cucp.stats().await?;
    assert_eq!(stats.responses_unmatched, 1);
    assert_eq!(stats.procedures_completed, 0);
    assert_eq!(cucp.poll(new).await?, ProcedureState::AwaitingResponse);

    cucp.deliver(answer(&new_request, 56)).await?;
    assert_eq!(
        timeout(WAIT, new_waiter.wait()).await??,
        BearerContextSetupOutcome::Success {
            cu_up_ue_e1ap_id: Some(CuUpUeE1apId(56)),
            pdu_sessions_setup: vec![PduSessionId(1)],
            pdu_sessions_failed: Vec::new(),
        }
    );

    let processor = cucp.shutdown().await?;
    assert_eq!(
        processor.find_ue(successor).and_then(|ue| ue.cu_up_ue_e1ap_id),
        Some(CuUpUeE1apId(56))
    );
    Ok(())
}

/// Test: a response nobody waits for is counted as unmatched
#[tokio::test]
async fn test_unmatched_response() -> TestResult {
    init_test_logging();

    let (cucp, _ue_index) = cucp_with_ue().await?;
    cucp.deliver(E1apResponse {
        cu_cp_ue_e1ap_id: CuCpUeE1apId(42),
        cu_up_ue_e1ap_id: Some(CuUpUeE1apId(1)),
        payload: E1apResponsePayload::BearerContextReleaseComplete,
    })
    .await?;

    let stats = cucp.stats().await?;
    assert_eq!(stats.responses_unmatched, 1);
    assert_eq!(stats.responses_discarded, 0);

    cucp.shutdown().await?;
    Ok(())
}
