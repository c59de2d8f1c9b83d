//! Outbound notifier interfaces
//!
//! The DU processor reaches its peers only through these one-way sinks. Each
//! call hands over exactly one message and returns nothing. The peer channels
//! are unbounded, so a message is only lost once the peer task is gone.

use tracing::warn;

use crate::messages::{E1apMessage, F1apMessage};
use crate::tasks::PeerHandle;

/// Sink for messages toward the DU
pub trait DuNotifier: Send {
    /// Sends one F1AP message to the DU
    fn send_du_message(&mut self, msg: F1apMessage);
}

/// Sink for messages toward the CU-UP
pub trait CuUpNotifier: Send {
    /// Sends one E1AP message to the CU-UP
    fn send_cu_up_message(&mut self, msg: E1apMessage);
}

impl DuNotifier for PeerHandle<F1apMessage> {
    fn send_du_message(&mut self, msg: F1apMessage) {
        let name = msg.name();
        if self.send(msg).is_err() {
            warn!("DU peer is gone, {} not delivered", name);
        }
    }
}

impl CuUpNotifier for PeerHandle<E1apMessage> {
    fn send_cu_up_message(&mut self, msg: E1apMessage) {
        let name = msg.name();
        if self.send(msg).is_err() {
            warn!("CU-UP peer is gone, {} not delivered", name);
        }
    }
}
