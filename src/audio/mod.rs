pub mod backend;
pub mod handoff;
pub mod processor;
#[cfg(any(not(target_os = "windows"), test))]
pub mod synth;

#[cfg(target_os = "windows")]
pub mod wasapi;

#[derive(Clone, Debug)]
pub struct AudioConfig {
  /// Stereo frames per block, also the fft size.
  pub samples: usize,
  pub sample_rate: u32,
}

impl Default for AudioConfig {
  fn default() -> Self {
    Self {
      samples: 512,
      sample_rate: 44_100,
    }
  }
}
