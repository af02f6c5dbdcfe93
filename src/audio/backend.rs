use tokio::sync::watch;

use crate::audio::handoff::BlockSender;

/// A fixed-size block of interleaved 16-bit stereo samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StereoBlock {
  samples: Vec<i16>,
}

impl StereoBlock {
  /// Takes interleaved `l, r, l, r, ...` samples; a trailing odd sample is dropped.
  pub fn new(mut samples: Vec<i16>) -> Self {
    samples.truncate(samples.len() & !1);
    Self { samples }
  }

  /// Decodes little-endian 16-bit interleaved pcm, the a2dp sink format.
  #[cfg(any(not(target_os = "windows"), test))]
  pub fn from_le_bytes(data: &[u8]) -> Self {
    let samples = data
      .chunks_exact(2)
      .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
      .collect();
    Self::new(samples)
  }

  /// Converts interleaved float samples in -1.0..=1.0.
  #[cfg(any(target_os = "windows", test))]
  pub fn from_f32(data: &[f32]) -> Self {
    let samples = data
      .iter()
      .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
      .collect();
    Self::new(samples)
  }

  pub fn frames(&self) -> usize {
    self.samples.len() / 2
  }

  /// `(left + right) / 2` per frame.
  pub fn mono(&self) -> impl Iterator<Item = f32> + '_ {
    self
      .samples
      .chunks_exact(2)
      .map(|lr| (lr[0] as f32 + lr[1] as f32) / 2.0)
  }
}

/// Audio link state as seen by the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
  #[default]
  Disconnected,
  Connected,
  Playing,
  Paused,
}

impl LinkState {
  /// State to publish when a source's silence flag flips, if it did.
  pub fn on_silence(was_silent: bool, silent: bool) -> Option<LinkState> {
    match (was_silent, silent) {
      (false, true) => Some(LinkState::Paused),
      (true, false) => Some(LinkState::Playing),
      _ => None,
    }
  }
}

pub trait AudioBackend: Send {
  type Error;

  async fn run(self, tx: BlockSender, link: watch::Sender<LinkState>) -> Result<(), Self::Error>;
}
