pub mod primitives;
pub mod renderer;
pub mod window;

use crate::visualisation::colour::Rgb;

/// Pixel display the compositor draws into.
///
/// Every frame is bracketed by `begin_frame`/`end_frame` so bus-backed panels
/// can batch their transfers; primitives in between never block on the device.
pub trait Display {
  fn dimensions(&self) -> (usize, usize);

  fn begin_frame(&mut self) {}

  fn clear(&mut self, colour: Rgb);

  fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, colour: Rgb);

  /// One-pixel ring outline centred on `(cx, cy)`.
  fn draw_ring(&mut self, cx: f32, cy: f32, radius: f32, colour: Rgb);

  /// Submits the frame.
  fn end_frame(&mut self) -> Result<(), anyhow::Error> {
    Ok(())
  }

  fn is_open(&self) -> bool {
    true
  }
}

#[cfg(test)]
pub mod testing {
  use super::*;

  /// Records primitive calls instead of drawing them.
  #[derive(Default)]
  pub struct RecordingDisplay {
    pub frames_begun: usize,
    pub frames_ended: usize,
    pub clears: Vec<Rgb>,
    pub rects: Vec<(i32, i32, u32, u32, Rgb)>,
    pub rings: Vec<(f32, f32, f32, Rgb)>,
    /// Reports closed once this many frames were submitted.
    pub close_after: Option<usize>,
  }

  impl RecordingDisplay {
    pub fn reset(&mut self) {
      self.clears.clear();
      self.rects.clear();
      self.rings.clear();
    }
  }

  impl Display for RecordingDisplay {
    fn dimensions(&self) -> (usize, usize) {
      (320, 320)
    }

    fn begin_frame(&mut self) {
      self.frames_begun += 1;
    }

    fn clear(&mut self, colour: Rgb) {
      self.clears.push(colour);
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, colour: Rgb) {
      self.rects.push((x, y, w, h, colour));
    }

    fn draw_ring(&mut self, cx: f32, cy: f32, radius: f32, colour: Rgb) {
      self.rings.push((cx, cy, radius, colour));
    }

    fn end_frame(&mut self) -> Result<(), anyhow::Error> {
      self.frames_ended += 1;
      Ok(())
    }

    fn is_open(&self) -> bool {
      self
        .close_after
        .is_none_or(|limit| self.frames_ended < limit)
    }
  }
}
