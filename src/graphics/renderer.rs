use crate::graphics::{Display, primitives};
use crate::visualisation::colour::Rgb;

/// In-memory 0RGB framebuffer.
///
/// With `rgb565` set every colour is quantised to 5-6-5 on the way in, so the
/// window shows what a 16-bit panel would.
pub struct Renderer {
  width: usize,
  height: usize,
  rgb565: bool,
  buffer: Vec<u32>,
}

impl Renderer {
  pub fn new(width: usize, height: usize, rgb565: bool) -> Self {
    Self {
      width,
      height,
      rgb565,
      buffer: vec![0; width * height],
    }
  }

  fn pack(&self, colour: Rgb) -> u32 {
    if self.rgb565 {
      colour.quantise_565().to_u32()
    } else {
      colour.to_u32()
    }
  }

  #[cfg(test)]
  pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
    (x < self.width && y < self.height).then(|| Rgb::from_u32(self.buffer[y * self.width + x]))
  }

  pub fn buffer(&self) -> &[u32] {
    &self.buffer
  }
}

impl Display for Renderer {
  fn dimensions(&self) -> (usize, usize) {
    (self.width, self.height)
  }

  fn clear(&mut self, colour: Rgb) {
    let packed = self.pack(colour);
    self.buffer.fill(packed);
  }

  fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, colour: Rgb) {
    let packed = self.pack(colour);
    primitives::fill_rect(
      &mut self.buffer,
      self.width,
      self.height,
      (x, y),
      w,
      h,
      packed,
    );
  }

  fn draw_ring(&mut self, cx: f32, cy: f32, radius: f32, colour: Rgb) {
    let packed = self.pack(colour);
    primitives::draw_circle(
      &mut self.buffer,
      self.width,
      self.height,
      (cx.round() as i32, cy.round() as i32),
      radius.round() as i32,
      packed,
    );
  }
}
