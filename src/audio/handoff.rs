use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use tracing::trace;

use crate::audio::backend::StereoBlock;

/// Creates the single-slot handoff between an audio source and the analysis
/// loop. At most one block is ever pending; offers made while the slot is
/// occupied are dropped.
pub fn single_slot() -> (BlockSender, BlockReceiver) {
  let (tx, rx) = mpsc::channel(1);
  (BlockSender { tx, dropped: 0 }, BlockReceiver { rx })
}

pub struct BlockSender {
  tx: mpsc::Sender<StereoBlock>,
  dropped: u64,
}

impl BlockSender {
  /// Places `block` in the slot if it is empty. Returns false when the block
  /// was dropped, either because the slot is full or the receiver is gone.
  pub fn offer(&mut self, block: StereoBlock) -> bool {
    match self.tx.try_send(block) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => {
        self.dropped += 1;
        trace!("analysis busy, dropped audio block ({} so far)", self.dropped);
        false
      }
      Err(TrySendError::Closed(_)) => false,
    }
  }

  pub fn dropped(&self) -> u64 {
    self.dropped
  }

  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }
}

pub struct BlockReceiver {
  rx: mpsc::Receiver<StereoBlock>,
}

impl BlockReceiver {
  /// Waits for the next block. `None` once every sender is gone.
  pub async fn recv(&mut self) -> Option<StereoBlock> {
    self.rx.recv().await
  }

  /// Takes the pending block if there is one, freeing the slot.
  pub fn try_take(&mut self) -> Option<StereoBlock> {
    match self.rx.try_recv() {
      Ok(block) => Some(block),
      Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
    }
  }
}
