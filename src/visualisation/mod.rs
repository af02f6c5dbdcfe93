pub mod binner;
pub mod colour;
pub mod compositor;
pub mod ripple;

/// Number of frequency bands; fixed by the bin boundary table.
pub const NUM_BANDS: usize = 8;

#[derive(Clone, Debug)]
pub struct VisualiserConfig {
  // display
  pub width: usize,
  pub height: usize,
  /// Quantise the framebuffer to 16-bit 5-6-5 like the tft panel.
  pub panel_rgb565: bool,
  // indicator grid
  pub rows: usize,
  pub led_diameter: u32,
  // spectrum
  pub noise_floor: f32,
  pub amplitude: u32,
  // ripples
  pub max_ripples: usize,
  pub lifetime_ms: u64,
  pub speed: f32,
  pub time_scale: f32,
  pub thickness: f32,
  pub bass_threshold: u8,
  pub bass_bands: usize,
  // pacing
  pub target_fps: u32,
  /// Added to every lit cell's hue once per second. Any non-zero value shifts
  /// the palette away from the fixed row-derived hue, so it is off by default.
  pub hue_drift: u8,
}

impl Default for VisualiserConfig {
  fn default() -> Self {
    Self {
      width: 320,
      height: 320,
      panel_rgb565: true,
      rows: 8,
      led_diameter: 32,
      noise_floor: 1000.0,
      amplitude: 200,
      max_ripples: 8,
      lifetime_ms: 2000,
      speed: 0.15,
      time_scale: 60.0,
      thickness: 4.0,
      bass_threshold: 180,
      bass_bands: 2,
      target_fps: 30,
      hue_drift: 0,
    }
  }
}
