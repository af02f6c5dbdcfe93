/// 8-bit rgb display colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

/// Colour with a separate alpha channel, as produced by [`hsv_to_rgba`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgb {
  pub const BLACK: Rgb = Rgb::new(0, 0, 0);

  pub const fn new(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b }
  }

  /// Builds a colour from float channels, saturating into 0..=255.
  pub fn from_f32(r: f32, g: f32, b: f32) -> Self {
    Self::new(r as u8, g as u8, b as u8)
  }

  /// 0RGB packing used by the window framebuffer.
  pub fn to_u32(self) -> u32 {
    ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
  }

  #[cfg(test)]
  pub fn from_u32(packed: u32) -> Self {
    Self::new((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
  }

  /// Canonical 16-bit 5-6-5 packing for spi panels.
  pub fn to_rgb565(self) -> u16 {
    (((self.r as u16) & 0xF8) << 8) | (((self.g as u16) & 0xFC) << 3) | ((self.b as u16) >> 3)
  }

  /// Expands 5-6-5 back to 8 bits per channel by bit replication, so full
  /// scale stays full scale.
  pub fn from_rgb565(packed: u16) -> Self {
    let r = ((packed >> 11) & 0x1F) as u8;
    let g = ((packed >> 5) & 0x3F) as u8;
    let b = (packed & 0x1F) as u8;
    Self::new((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
  }

  /// The colour as a 16-bit panel would show it.
  pub fn quantise_565(self) -> Self {
    Self::from_rgb565(self.to_rgb565())
  }
}

impl Rgba {
  /// Composites against a black backdrop: `channel * alpha / 255`.
  ///
  /// Only valid because every frame starts from a cleared black screen.
  pub fn over_black(self) -> Rgb {
    blend(Rgb::BLACK, Rgb::new(self.r, self.g, self.b), self.a)
  }
}

/// Converts hsv (all channels 0..=255, hue scaled onto 0..360 degrees) to rgb
/// with the given alpha carried through untouched.
pub fn hsv_to_rgba(hue: u8, saturation: u8, value: u8, alpha: u8) -> Rgba {
  let hh = hue as f32 / 255.0 * 360.0;
  let ss = saturation as f32 / 255.0;
  let vv = value as f32 / 255.0;

  let sector = (hh / 60.0) as u32;
  let ff = hh / 60.0 - sector as f32;
  let p = vv * (1.0 - ss);
  let q = vv * (1.0 - ss * ff);
  let t = vv * (1.0 - ss * (1.0 - ff));

  let (r, g, b) = match sector {
    0 => (vv, t, p),
    1 => (q, vv, p),
    2 => (p, vv, t),
    3 => (p, q, vv),
    4 => (t, p, vv),
    // sector 5, and hue == 255 which lands exactly on 360
    _ => (vv, p, q),
  };

  Rgba {
    r: (r * 255.0) as u8,
    g: (g * 255.0) as u8,
    b: (b * 255.0) as u8,
    a: alpha,
  }
}

/// Per-channel linear interpolation from `a` (alpha 0) to `b` (alpha 255),
/// truncating toward zero.
pub fn blend(a: Rgb, b: Rgb, alpha: u8) -> Rgb {
  let mix = |c1: u8, c2: u8| -> u8 {
    let w = alpha as u32;
    ((c2 as u32 * w + c1 as u32 * (255 - w)) / 255) as u8
  };
  Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}
