use crate::visualisation::{NUM_BANDS, VisualiserConfig};

/// Upper (inclusive) fft bin of every band but the last, roughly octave spaced
/// at 512 samples / 44.1khz: 125, 250, 500, 1k, 2k, 4k, 8k hz.
pub const BAND_EDGES: [usize; NUM_BANDS - 1] = [2, 5, 7, 15, 30, 53, 106];

/// First bin worth looking at; 0 and 1 are dc and near-dc.
pub const FIRST_BIN: usize = 2;

/// Peak level per band for the current analysis cycle.
pub type BandEnergy = [u32; NUM_BANDS];

pub struct SpectrumBinner {
  peaks: BandEnergy,
  noise_floor: f32,
  amplitude: u32,
}

impl SpectrumBinner {
  pub fn new(config: &VisualiserConfig) -> Self {
    Self {
      peaks: [0; NUM_BANDS],
      noise_floor: config.noise_floor,
      amplitude: config.amplitude.max(1),
    }
  }

  pub fn reset(&mut self) {
    self.peaks = [0; NUM_BANDS];
  }

  /// Maps an fft bin to its band; a bin equal to an edge belongs to the lower band.
  pub fn classify(bin: usize) -> usize {
    BAND_EDGES
      .iter()
      .position(|&edge| bin <= edge)
      .unwrap_or(NUM_BANDS - 1)
  }

  /// Peak-holds `magnitude` into `band`, after the noise floor and the
  /// amplitude ceiling.
  pub fn accumulate(&mut self, band: usize, magnitude: f32) {
    if magnitude <= self.noise_floor {
      return;
    }
    // whole-magnitude units, then whole amplitude steps
    let level = ((magnitude.trunc() / self.amplitude as f32) as u32).min(self.amplitude);
    if let Some(peak) = self.peaks.get_mut(band) {
      *peak = (*peak).max(level);
    }
  }

  /// Rebuilds the band peaks from a magnitude spectrum. Only the first half of
  /// a full spectrum is meaningful; callers pass exactly that half.
  pub fn analyse(&mut self, magnitudes: &[f32]) -> &BandEnergy {
    self.reset();
    for (bin, &magnitude) in magnitudes.iter().enumerate().skip(FIRST_BIN) {
      self.accumulate(Self::classify(bin), magnitude);
    }
    &self.peaks
  }

  pub fn peaks(&self) -> &BandEnergy {
    &self.peaks
  }

  pub fn amplitude(&self) -> u32 {
    self.amplitude
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn binner() -> SpectrumBinner {
    SpectrumBinner::new(&VisualiserConfig::default())
  }

  #[test]
  fn classify_edges_are_inclusive() {
    let expected = [
      (0, 0),
      (2, 0),
      (3, 1),
      (5, 1),
      (6, 2),
      (7, 2),
      (8, 3),
      (15, 3),
      (16, 4),
      (30, 4),
      (31, 5),
      (53, 5),
      (54, 6),
      (106, 6),
      (107, 7),
      (255, 7),
    ];
    for (bin, band) in expected {
      assert_eq!(SpectrumBinner::classify(bin), band, "bin {bin}");
    }
  }

  #[test]
  fn below_noise_floor_is_ignored() {
    let mut b = binner();
    b.accumulate(3, 5000.0);
    let before = *b.peaks();
    for magnitude in [0.0, 1.0, 999.0, 1000.0] {
      b.accumulate(3, magnitude);
      b.accumulate(4, magnitude);
    }
    assert_eq!(*b.peaks(), before);
    assert_eq!(b.peaks()[4], 0);
  }

  #[test]
  fn accumulate_holds_peak_and_clamps() {
    let mut b = binner();
    b.accumulate(0, 4_000.0);
    assert_eq!(b.peaks()[0], 20);
    b.accumulate(0, 2_000.0);
    assert_eq!(b.peaks()[0], 20);
    b.accumulate(0, 1_000_000.0);
    assert_eq!(b.peaks()[0], 200);
  }

  #[test]
  fn analyse_skips_dc_and_resets() {
    let mut b = binner();
    let mut spectrum = vec![0.0; 256];
    spectrum[0] = 1e9;
    spectrum[1] = 1e9;
    assert_eq!(*b.analyse(&spectrum), [0; NUM_BANDS]);

    spectrum[200] = 20_000.0;
    assert_eq!(b.analyse(&spectrum)[7], 100);
    spectrum[200] = 0.0;
    assert_eq!(b.analyse(&spectrum)[7], 0);
  }

  #[test]
  fn bass_bins_only_raise_bass_bands() {
    let mut b = binner();
    let mut spectrum = vec![10.0; 256];
    for bin in 2..=5 {
      spectrum[bin] = 40_000.0;
    }
    let peaks = *b.analyse(&spectrum);
    assert_eq!(peaks[0], 200);
    assert_eq!(peaks[1], 200);
    assert!(peaks[2..].iter().all(|&p| p == 0));
  }
}
