use std::time::{Duration, Instant};

use tokio::time;

use tracing::{debug, info, trace};

use crate::audio::AudioConfig;
use crate::audio::backend::StereoBlock;
use crate::audio::handoff::BlockReceiver;
use crate::audio::processor::AudioProcessor;
use crate::graphics::Display;
use crate::visualisation::binner::SpectrumBinner;
use crate::visualisation::colour::{self, Rgb};
use crate::visualisation::ripple::RippleField;
use crate::visualisation::{NUM_BANDS, VisualiserConfig};

/// Millisecond clock the compositor paces and ages ripples against.
pub trait Clock {
  fn now_ms(&self) -> u64;
}

pub struct SystemClock {
  start: Instant,
}

impl SystemClock {
  pub fn new() -> Self {
    Self {
      start: Instant::now(),
    }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for SystemClock {
  fn now_ms(&self) -> u64 {
    self.start.elapsed().as_millis() as u64
  }
}

/// Enforces a minimum interval between frames.
pub struct Pacer {
  interval_ms: u64,
  last_frame: Option<u64>,
}

impl Pacer {
  pub fn new(target_fps: u32) -> Self {
    Self {
      interval_ms: 1000 / target_fps.max(1) as u64,
      last_frame: None,
    }
  }

  /// Claims a frame slot if the interval since the last frame has elapsed.
  pub fn try_frame(&mut self, now_ms: u64) -> bool {
    match self.last_frame {
      Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
      _ => {
        self.last_frame = Some(now_ms);
        true
      }
    }
  }

  /// Time left until the next frame may be drawn.
  pub fn remaining(&self, now_ms: u64) -> Duration {
    let due = self
      .last_frame
      .map_or(0, |last| (last + self.interval_ms).saturating_sub(now_ms));
    Duration::from_millis(due)
  }

  pub fn interval_ms(&self) -> u64 {
    self.interval_ms
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  WaitingForAnalysis,
  Rendering,
}

/// Turns audio blocks into band energies and band energies plus ripples into
/// frames.
pub struct Compositor {
  config: VisualiserConfig,
  processor: AudioProcessor,
  binner: SpectrumBinner,
  ripples: RippleField,
  pacer: Pacer,
  phase: Phase,
  hue_offset: u8,
  frames: u32,
  stats_since: u64,
}

impl Compositor {
  pub fn new(config: VisualiserConfig, audio: &AudioConfig) -> Self {
    let ripples = RippleField::new(&config);
    Self::with_ripples(config, audio, ripples)
  }

  pub fn with_ripples(config: VisualiserConfig, audio: &AudioConfig, ripples: RippleField) -> Self {
    Self {
      processor: AudioProcessor::new(audio),
      binner: SpectrumBinner::new(&config),
      ripples,
      pacer: Pacer::new(config.target_fps),
      phase: Phase::WaitingForAnalysis,
      hue_offset: 0,
      frames: 0,
      stats_since: 0,
      config,
    }
  }

  /// Alternates between waiting for a block and rendering the resulting
  /// snapshot. While rendering, every frame re-checks the handoff and a new
  /// block ends the run of frames so it is analysed straight away. While
  /// waiting, idle frames go out at the frame interval so the display keeps
  /// handling its events before the source delivers anything. Returns once
  /// the display closes.
  pub async fn run<D, C>(
    &mut self,
    handoff: &mut BlockReceiver,
    display: &mut D,
    clock: &C,
  ) -> Result<(), anyhow::Error>
  where
    D: Display + ?Sized,
    C: Clock + ?Sized,
  {
    let mut pending: Option<StereoBlock> = None;
    let mut source_open = true;
    let idle = Duration::from_millis(self.pacer.interval_ms().max(1));
    debug!("frame interval {} ms", self.pacer.interval_ms());

    while display.is_open() {
      self.enter(Phase::WaitingForAnalysis);
      let block = match pending.take() {
        Some(block) => Some(block),
        None if source_open => loop {
          match time::timeout(idle, handoff.recv()).await {
            Ok(block) => break block,
            Err(_) => {
              self.try_render(clock.now_ms(), display)?;
              if !display.is_open() {
                return Ok(());
              }
            }
          }
        },
        None => None,
      };
      match block {
        Some(block) => self.analyse(&block)?,
        None if source_open => {
          info!("audio source closed, holding last spectrum...");
          source_open = false;
        }
        None => {}
      }

      self.enter(Phase::Rendering);
      while display.is_open() {
        let now = clock.now_ms();
        if !self.try_render(now, display)? {
          time::sleep(self.pacer.remaining(now)).await;
          continue;
        }
        if let Some(next) = handoff.try_take() {
          pending = Some(next);
          break;
        }
      }
    }

    Ok(())
  }

  /// Runs the fft over `block` and rebuilds the band energies.
  pub fn analyse(&mut self, block: &StereoBlock) -> Result<(), anyhow::Error> {
    let magnitudes = self.processor.process(block)?;
    self.binner.analyse(magnitudes);
    Ok(())
  }

  #[cfg(test)]
  pub fn analyse_spectrum(&mut self, magnitudes: &[f32]) {
    self.binner.analyse(magnitudes);
  }

  /// Draws a frame if the pacer allows one at `now_ms`.
  pub fn try_render<D: Display + ?Sized>(
    &mut self,
    now_ms: u64,
    display: &mut D,
  ) -> Result<bool, anyhow::Error> {
    if !self.pacer.try_frame(now_ms) {
      return Ok(false);
    }
    self.render_frame(now_ms, display)?;
    Ok(true)
  }

  /// Composites one frame: ripples first, the indicator grid on top.
  pub fn render_frame<D: Display + ?Sized>(
    &mut self,
    now_ms: u64,
    display: &mut D,
  ) -> Result<(), anyhow::Error> {
    display.begin_frame();
    display.clear(Rgb::BLACK);

    if !self.ripples.is_empty() {
      self.ripples.update(now_ms);
      self.ripples.render(now_ms, display);
    }

    let rows = self.config.rows;
    for band in 0..NUM_BANDS {
      let level = self.binner.peaks()[band];
      let lit = self.lit_rows(level);
      let bass_value = self.bass_value(level);

      // i counts up from the bottom row
      for i in 0..rows {
        let row = rows - 1 - i;
        if i >= lit {
          self.draw_cell(display, band, row, Rgb::BLACK);
          continue;
        }

        let hue = ((i * 16) as u8).wrapping_add(self.hue_offset);
        let led = colour::hsv_to_rgba(hue, 255, 255, 255).over_black();
        self.draw_cell(display, band, row, led);

        if band < self.config.bass_bands && bass_value > self.config.bass_threshold {
          let center = self.cell_center(band, row);
          self.ripples.spawn(center, bass_value, now_ms);
        }
      }
    }

    display.end_frame()?;
    self.record_frame(now_ms);
    Ok(())
  }

  /// Linear map of a band level from `1..=amplitude` onto `0..=rows`.
  fn lit_rows(&self, level: u32) -> usize {
    let rows = self.config.rows as i64;
    let span = (self.binner.amplitude() as i64 - 1).max(1);
    let lit = (level as i64 - 1) * rows / span;
    lit.clamp(0, rows) as usize
  }

  /// Band level rescaled to a 0..=255 trigger value.
  fn bass_value(&self, level: u32) -> u8 {
    (level.min(self.binner.amplitude()) * 255 / self.binner.amplitude()) as u8
  }

  fn block_size(&self) -> (usize, usize) {
    (
      self.config.width / NUM_BANDS,
      self.config.height / self.config.rows.max(1),
    )
  }

  fn cell_center(&self, band: usize, row: usize) -> (f32, f32) {
    let (bw, bh) = self.block_size();
    ((band * bw + bw / 2) as f32, (row * bh + bh / 2) as f32)
  }

  fn draw_cell<D: Display + ?Sized>(&self, display: &mut D, band: usize, row: usize, colour: Rgb) {
    let (cx, cy) = self.cell_center(band, row);
    let d = self.config.led_diameter;
    let half = (d / 2) as i32;
    display.fill_rect(cx as i32 - half, cy as i32 - half, d, d, colour);
  }

  fn record_frame(&mut self, now_ms: u64) {
    self.frames += 1;
    let elapsed = now_ms.saturating_sub(self.stats_since);
    if elapsed > 1000 {
      debug!(
        "fps: {:.1}, {} ripples live",
        self.frames as f64 * 1000.0 / elapsed as f64,
        self.ripples.len()
      );
      self.frames = 0;
      self.stats_since = now_ms;
      self.hue_offset = self.hue_offset.wrapping_add(self.config.hue_drift);
    }
  }

  fn enter(&mut self, phase: Phase) {
    if self.phase != phase {
      trace!("{:?} -> {:?}", self.phase, phase);
      self.phase = phase;
    }
  }

  #[cfg(test)]
  pub fn phase(&self) -> Phase {
    self.phase
  }

  #[cfg(test)]
  pub fn ripples(&self) -> &RippleField {
    &self.ripples
  }

  #[cfg(test)]
  pub fn band_energy(&self) -> &[u32; NUM_BANDS] {
    self.binner.peaks()
  }
}
