use std::sync::Arc;

use apodize::hamming_iter;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use tracing::trace;

use crate::audio::AudioConfig;
use crate::audio::backend::StereoBlock;

/// Hamming-windowed forward fft of one mono block, reduced to magnitudes.
pub struct AudioProcessor {
  fft: Arc<dyn RealToComplex<f32>>,
  window_function: Vec<f32>,
  // real input buffer for fft
  fft_real_input: Vec<f32>,
  // complex output of fft (length = samples/2+1)
  fft_complex: Vec<Complex<f32>>,
  // scratch buffer used by the fft
  fft_scratch: Vec<Complex<f32>>,
  // magnitudes (length = samples/2)
  fft_output: Vec<f32>,
}

impl AudioProcessor {
  pub fn new(config: &AudioConfig) -> Self {
    let mut planner = RealFftPlanner::<f32>::new();
    let r2c = planner.plan_fft_forward(config.samples);

    let window_function: Vec<f32> = hamming_iter(config.samples).map(|v| v as f32).collect();

    // allocate fft buffers once
    let fft_real_input = r2c.make_input_vec();
    let fft_complex = r2c.make_output_vec();
    let fft_scratch = r2c.make_scratch_vec();

    AudioProcessor {
      fft: r2c,
      window_function,
      fft_real_input,
      fft_complex,
      fft_scratch,
      fft_output: vec![0.0; config.samples / 2],
    }
  }

  /// Mixes the block to mono, windows it and returns the unnormalised
  /// magnitude spectrum. Short blocks are zero padded.
  pub fn process(&mut self, block: &StereoBlock) -> Result<&[f32], anyhow::Error> {
    if block.frames() < self.fft_real_input.len() {
      trace!("short block of {} frames, zero padded", block.frames());
    }
    self.fft_real_input.fill(0.0);
    self
      .fft_real_input
      .iter_mut()
      .zip(self.window_function.iter())
      .zip(block.mono())
      .for_each(|((out, w), s)| {
        *out = s * w;
      });

    self
      .fft
      .process_with_scratch(
        &mut self.fft_real_input,
        &mut self.fft_complex,
        &mut self.fft_scratch,
      )
      .map_err(|e| anyhow::anyhow!("fft forward failed - {e}"))?;

    for (out, c) in self.fft_output.iter_mut().zip(&self.fft_complex) {
      *out = c.norm();
    }

    Ok(&self.fft_output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tone(bin: f32, amplitude: f32, config: &AudioConfig) -> StereoBlock {
    let n = config.samples;
    let samples = (0..n)
      .flat_map(|i| {
        let phase = 2.0 * std::f32::consts::PI * bin * i as f32 / n as f32;
        let s = (phase.sin() * amplitude) as i16;
        [s, s]
      })
      .collect();
    StereoBlock::new(samples)
  }

  #[test]
  fn output_is_half_spectrum() {
    let config = AudioConfig::default();
    let mut p = AudioProcessor::new(&config);
    let out = p.process(&StereoBlock::default()).unwrap();
    assert_eq!(out.len(), 256);
    assert!(out.iter().all(|&m| m == 0.0));
  }

  #[test]
  fn short_block_is_zero_padded() {
    let config = AudioConfig::default();
    let mut p = AudioProcessor::new(&config);
    let short = AudioConfig {
      samples: 128,
      ..AudioConfig::default()
    };
    // tone over the first quarter, silence after
    let out = p.process(&tone(5.0, 1000.0, &short)).unwrap();
    assert_eq!(out.len(), 256);
    assert!(out.iter().any(|&m| m > 0.0));
  }

  #[test]
  fn tone_peaks_at_its_bin() {
    let config = AudioConfig::default();
    let mut p = AudioProcessor::new(&config);
    let out = p.process(&tone(20.0, 1000.0, &config)).unwrap();
    let (peak_bin, peak) = out
      .iter()
      .enumerate()
      .fold((0, 0.0f32), |acc, (i, &m)| if m > acc.1 { (i, m) } else { acc });
    assert_eq!(peak_bin, 20);
    // ~ amplitude * n/2 * 0.54 coherent gain
    assert!(peak > 100_000.0 && peak < 180_000.0, "{peak}");
  }
}
