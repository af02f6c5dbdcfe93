use std::f32::consts::TAU;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use tracing::info;

use crate::audio::AudioConfig;
use crate::audio::backend::{AudioBackend, LinkState, StereoBlock};
use crate::audio::handoff::BlockSender;

const KICK_HZ: f32 = 180.0;
const KICK_PERIOD_S: f32 = 0.5; // 120 bpm
const KICK_DECAY_S: f32 = 0.12;
const SWEEP_LOW_HZ: f32 = 400.0;
const SWEEP_HIGH_HZ: f32 = 8_000.0;
const SWEEP_PERIOD_S: f32 = 8.0;
// every phrase ends in a short rest so the link reports a pause
const PHRASE_S: f32 = 16.0;
const REST_S: f32 = 2.0;

/// Test signal: a decaying bass kick on every beat under a slow tone sweep.
///
/// Rendered as little-endian 16-bit pcm, the same byte stream an a2dp sink
/// delivers, and decoded from there.
pub struct ToneGenerator {
  sample_rate: f32,
  frame: u64,
  sweep_phase: f32,
  pcm: Vec<u8>,
}

impl ToneGenerator {
  pub fn new(sample_rate: u32) -> Self {
    Self {
      sample_rate: sample_rate as f32,
      frame: 0,
      sweep_phase: 0.0,
      pcm: Vec::new(),
    }
  }

  /// True inside the silent gap at the end of each phrase.
  pub fn is_resting(&self) -> bool {
    self.t() % PHRASE_S >= PHRASE_S - REST_S
  }

  fn t(&self) -> f32 {
    self.frame as f32 / self.sample_rate
  }

  pub fn next_block(&mut self, frames: usize) -> StereoBlock {
    let dt = 1.0 / self.sample_rate;
    self.pcm.clear();
    self.pcm.reserve(frames * 4);

    for _ in 0..frames {
      let t = self.t();
      let beat_t = t % KICK_PERIOD_S;
      let kick = (TAU * KICK_HZ * beat_t).sin() * (-beat_t / KICK_DECAY_S).exp();

      // log sweep up and back down
      let sweep_pos = ((t / SWEEP_PERIOD_S) * TAU).sin() * 0.5 + 0.5;
      let sweep_hz = SWEEP_LOW_HZ * (SWEEP_HIGH_HZ / SWEEP_LOW_HZ).powf(sweep_pos);
      self.sweep_phase = (self.sweep_phase + TAU * sweep_hz * dt) % TAU;
      let sweep = self.sweep_phase.sin();

      let (left, right) = if self.is_resting() {
        (0, 0)
      } else {
        (
          (kick * 12_000.0 + sweep * 2_000.0) as i16,
          (kick * 12_000.0 - sweep * 2_000.0) as i16,
        )
      };
      self.pcm.extend_from_slice(&left.to_le_bytes());
      self.pcm.extend_from_slice(&right.to_le_bytes());

      self.frame += 1;
    }

    StereoBlock::from_le_bytes(&self.pcm)
  }
}

/// Portable source feeding generated blocks at the real block rate.
pub struct SynthBackend {
  config: AudioConfig,
}

impl SynthBackend {
  pub fn new(config: AudioConfig) -> Self {
    Self { config }
  }
}

impl AudioBackend for SynthBackend {
  type Error = anyhow::Error;

  async fn run(self, mut tx: BlockSender, link: watch::Sender<LinkState>) -> Result<(), Self::Error> {
    let frames = self.config.samples;
    let block_period =
      Duration::from_secs_f64(frames as f64 / self.config.sample_rate.max(1) as f64);
    let mut generator = ToneGenerator::new(self.config.sample_rate);

    let mut ticker = time::interval(block_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    link.send_replace(LinkState::Connected);
    link.send_replace(LinkState::Playing);
    info!("synthetic audio source started...");
    let mut was_silent = false;

    while !tx.is_closed() {
      ticker.tick().await;
      // generated regardless of the slot so the signal keeps real time
      let block = generator.next_block(frames);
      let silent = generator.is_resting();
      if let Some(state) = LinkState::on_silence(was_silent, silent) {
        link.send_replace(state);
        was_silent = silent;
      }
      tx.offer(block);
    }

    link.send_replace(LinkState::Disconnected);
    info!("synthetic audio source stopped, {} blocks dropped", tx.dropped());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::audio::handoff;
  use crate::audio::processor::AudioProcessor;
  use crate::visualisation::VisualiserConfig;
  use crate::visualisation::binner::SpectrumBinner;

  #[test]
  fn blocks_have_requested_size() {
    let mut g = ToneGenerator::new(44_100);
    assert_eq!(g.next_block(512).frames(), 512);
    assert_eq!(g.next_block(100).frames(), 100);
  }

  #[test]
  fn kick_drives_bass_band() {
    let config = AudioConfig::default();
    let mut g = ToneGenerator::new(config.sample_rate);
    let mut processor = AudioProcessor::new(&config);
    let mut binner = SpectrumBinner::new(&VisualiserConfig::default());

    // first block sits right on the kick attack
    let block = g.next_block(config.samples);
    let peaks = *binner.analyse(processor.process(&block).unwrap());
    assert_eq!(peaks[0], 200);
  }

  #[test]
  fn phrase_ends_in_silence() {
    let mut g = ToneGenerator::new(44_100);
    let mut blocks = 0;
    while !g.is_resting() {
      g.next_block(512);
      blocks += 1;
    }
    // 14 s into the 16 s phrase
    assert_eq!(blocks, 14 * 44_100 / 512 + 1);
    let block = g.next_block(512);
    assert!(block.mono().all(|s| s == 0.0));
  }

  #[tokio::test]
  async fn stops_when_receiver_gone() {
    let (tx, mut rx) = handoff::single_slot();
    let (link_tx, link_rx) = watch::channel(LinkState::Disconnected);
    let backend = SynthBackend::new(AudioConfig::default());

    let handle = tokio::spawn(async move { backend.run(tx, link_tx).await });
    let first = rx.recv().await;
    assert_eq!(first.map(|b| b.frames()), Some(512));
    drop(rx);

    handle.await.unwrap().unwrap();
    assert_eq!(*link_rx.borrow(), LinkState::Disconnected);
  }
}
