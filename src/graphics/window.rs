use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};

use crate::graphics::Display;
use crate::graphics::renderer::Renderer;
use crate::visualisation::colour::Rgb;

/// Desktop stand-in for the tft panel: draws into a framebuffer and pushes it
/// to a minifb window when the frame ends.
pub struct WindowDisplay {
  window: Window,
  renderer: Renderer,
}

impl WindowDisplay {
  pub fn new(title: &str, width: usize, height: usize, rgb565: bool) -> Result<Self, anyhow::Error> {
    let window_options = WindowOptions {
      resize: true,
      scale: Scale::X2,
      scale_mode: ScaleMode::AspectRatioStretch,
      ..Default::default()
    };
    let window = Window::new(title, width, height, window_options)?;

    Ok(Self {
      window,
      renderer: Renderer::new(width, height, rgb565),
    })
  }
}

impl Display for WindowDisplay {
  fn dimensions(&self) -> (usize, usize) {
    self.renderer.dimensions()
  }

  fn clear(&mut self, colour: Rgb) {
    self.renderer.clear(colour);
  }

  fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, colour: Rgb) {
    self.renderer.fill_rect(x, y, w, h, colour);
  }

  fn draw_ring(&mut self, cx: f32, cy: f32, radius: f32, colour: Rgb) {
    self.renderer.draw_ring(cx, cy, radius, colour);
  }

  fn end_frame(&mut self) -> Result<(), anyhow::Error> {
    let (width, height) = self.renderer.dimensions();
    self
      .window
      .update_with_buffer(self.renderer.buffer(), width, height)?;
    Ok(())
  }

  fn is_open(&self) -> bool {
    self.window.is_open() && !self.window.is_key_down(Key::Escape)
  }
}
