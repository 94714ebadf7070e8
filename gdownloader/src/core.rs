use std::borrow::Borrow;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

/// Send a message to the specified Tokio mpsc::UnboundedSender, and if sending
/// fails, log an error with Tracing.
pub fn send_or_error<T, S: Borrow<mpsc::UnboundedSender<T>>>(tx: S, msg: T) {
    tx.borrow()
        .send(msg)
        .unwrap_or_else(|e| error!("Error {e} received when sending message"));
}

/// Send a message to the specified Tokio oneshot::Sender. Failure means the
/// receiver has already gone away, which is only worth a debug log.
pub fn oneshot_send_or_debug<T, S: Into<oneshot::Sender<T>>>(tx: S, msg: T) {
    if tx.into().send(msg).is_err() {
        tracing::debug!("Oneshot receiver dropped before message was sent");
    }
}
