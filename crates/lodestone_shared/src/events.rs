use std::sync::mpsc;

use glam::IVec3;

use crate::permutation::RuntimeState;

/// Asks the owning world to persist a block instance and re-send it to viewers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockUpdate {
    pub position: IVec3,
    pub state: RuntimeState,
}

/// Receiver side of block-state changes made through public setters.
pub trait BlockUpdateSink {
    fn request_update(&self, update: BlockUpdate);
}

pub struct UpdateSender {
    tx: mpsc::Sender<BlockUpdate>,
}

pub struct UpdateReceiver {
    rx: mpsc::Receiver<BlockUpdate>,
}

pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel();
    (UpdateSender { tx }, UpdateReceiver { rx })
}

impl Clone for UpdateSender {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl BlockUpdateSink for UpdateSender {
    fn request_update(&self, update: BlockUpdate) {
        if self.tx.send(update).is_err() {
            tracing::warn!("block update dropped: world receiver is gone");
        }
    }
}

impl UpdateReceiver {
    /// Takes every update queued so far without blocking.
    pub fn drain(&self) -> Vec<BlockUpdate> {
        self.rx.try_iter().collect()
    }
}
