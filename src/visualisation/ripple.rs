use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graphics::Display;
use crate::visualisation::VisualiserConfig;
use crate::visualisation::colour::{self, Rgb};

/// An expanding ring left behind by a bass hit.
#[derive(Clone, Debug)]
pub struct Ripple {
  pub center: (f32, f32),
  pub radius: f32,
  pub max_radius: f32,
  pub birth_ms: u64,
  pub intensity: u8,
}

impl Ripple {
  fn age(&self, now_ms: u64) -> u64 {
    now_ms.saturating_sub(self.birth_ms)
  }
}

pub struct RippleField {
  ripples: Vec<Ripple>,
  rng: StdRng,
  capacity: usize,
  lifetime_ms: u64,
  speed: f32,
  time_scale: f32,
  thickness: f32,
  base_radius: f32,
  display_width: f32,
}

impl RippleField {
  pub fn new(config: &VisualiserConfig) -> Self {
    Self::with_rng(config, StdRng::from_os_rng())
  }

  pub fn with_rng(config: &VisualiserConfig, rng: StdRng) -> Self {
    Self {
      ripples: Vec::with_capacity(config.max_ripples),
      rng,
      capacity: config.max_ripples,
      lifetime_ms: config.lifetime_ms.max(1),
      speed: config.speed,
      time_scale: config.time_scale,
      thickness: config.thickness,
      base_radius: config.led_diameter as f32 / 2.0,
      display_width: config.width as f32,
    }
  }

  /// Starts a ripple at the edge of the led at `center`. Dropped when full.
  pub fn spawn(&mut self, center: (f32, f32), intensity: u8, now_ms: u64) -> bool {
    if self.ripples.len() >= self.capacity {
      return false;
    }
    let spread: f32 = self.rng.random_range(0.0..0.3);
    self.ripples.push(Ripple {
      center,
      radius: self.base_radius,
      max_radius: self.display_width * (0.7 + spread),
      birth_ms: now_ms,
      intensity,
    });
    true
  }

  /// Grows every ripple and culls the ones that are too old or fully grown.
  ///
  /// Growth scales with the ripple's own target size and slows linearly to
  /// nothing over its lifetime.
  pub fn update(&mut self, now_ms: u64) {
    let lifetime = self.lifetime_ms;
    let rate = self.speed * self.time_scale / self.display_width;
    self.ripples.retain_mut(|ripple| {
      let age = ripple.age(now_ms);
      if age >= lifetime || ripple.radius >= ripple.max_radius {
        return false;
      }
      let remaining = 1.0 - age as f32 / lifetime as f32;
      ripple.radius += rate * ripple.max_radius * remaining;
      ripple.radius < ripple.max_radius
    });
  }

  /// Draws each ripple as a band of concentric rings that fades in toward its
  /// outer edge. Red and green cool off with age, blue tracks intensity.
  pub fn render<D: Display + ?Sized>(&self, now_ms: u64, display: &mut D) {
    for ripple in &self.ripples {
      let progress = (ripple.age(now_ms) as f32 / self.lifetime_ms as f32).min(1.0);
      let fade = 1.0 - progress;
      let intensity = ripple.intensity as f32;
      let alpha = intensity * fade * 0.5;
      let tint = Rgb::from_f32(intensity * fade, intensity * fade * 0.5, intensity);

      let mut r = ripple.radius - self.thickness;
      while r <= ripple.radius {
        if r >= 0.0 {
          let ring_alpha = alpha * (1.0 - (ripple.radius - r) / self.thickness);
          let shade = colour::blend(Rgb::BLACK, tint, ring_alpha as u8);
          display.draw_ring(ripple.center.0, ripple.center.1, r, shade);
        }
        r += 1.0;
      }
    }
  }

  #[cfg(test)]
  pub fn ripples(&self) -> &[Ripple] {
    &self.ripples
  }

  pub fn len(&self) -> usize {
    self.ripples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ripples.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graphics::testing::RecordingDisplay;

  fn field() -> RippleField {
    RippleField::with_rng(&VisualiserConfig::default(), StdRng::seed_from_u64(7))
  }

  #[test]
  fn spawn_respects_capacity() {
    let mut f = field();
    let cap = VisualiserConfig::default().max_ripples;
    let accepted = (0..cap + 5)
      .filter(|_| f.spawn((10.0, 10.0), 255, 0))
      .count();
    assert_eq!(accepted, cap);
    assert_eq!(f.len(), cap);
  }

  #[test]
  fn spawn_initial_state() {
    let mut f = field();
    f.spawn((20.0, 300.0), 200, 1234);
    let r = &f.ripples()[0];
    assert_eq!(r.center, (20.0, 300.0));
    assert_eq!(r.radius, 16.0);
    assert_eq!(r.birth_ms, 1234);
    assert!(r.max_radius >= 320.0 * 0.7 && r.max_radius < 320.0);
  }

  #[test]
  fn radius_grows_monotonically_until_removed() {
    let mut f = field();
    f.spawn((0.0, 0.0), 255, 0);
    let mut last = f.ripples()[0].radius;
    let mut now = 0;
    while !f.is_empty() {
      now += 33;
      f.update(now);
      if let Some(r) = f.ripples().first() {
        assert!(r.radius >= last);
        assert!(r.radius < r.max_radius);
        assert!(now - r.birth_ms < 2000);
        last = r.radius;
      }
      assert!(now < 2000 + 33, "ripple outlived its lifetime");
    }
  }

  #[test]
  fn expires_at_lifetime() {
    let mut f = field();
    f.spawn((0.0, 0.0), 255, 100);
    f.update(2099);
    assert_eq!(f.len(), 1);
    f.update(2100);
    assert!(f.is_empty());
  }

  #[test]
  fn removed_when_fully_grown() {
    let mut f = field();
    f.spawn((0.0, 0.0), 255, 0);
    let max = f.ripples[0].max_radius;
    f.ripples[0].radius = max - 0.001;
    f.update(1);
    assert!(f.is_empty());
  }

  #[test]
  fn frees_capacity_after_expiry() {
    let mut f = field();
    for _ in 0..8 {
      f.spawn((0.0, 0.0), 255, 0);
    }
    assert!(!f.spawn((0.0, 0.0), 255, 10));
    f.update(5000);
    assert!(f.spawn((0.0, 0.0), 255, 5000));
  }

  #[test]
  fn render_draws_soft_edge_rings() {
    let mut f = field();
    f.spawn((50.0, 60.0), 200, 0);
    let mut display = RecordingDisplay::default();
    f.render(0, &mut display);

    // radius 16, thickness 4: rings at 12..=16
    let radii: Vec<f32> = display.rings.iter().map(|ring| ring.2).collect();
    assert_eq!(radii, vec![12.0, 13.0, 14.0, 15.0, 16.0]);
    assert!(display.rings.iter().all(|ring| (ring.0, ring.1) == (50.0, 60.0)));

    // innermost ring fully transparent, outer ring at half strength
    assert_eq!(display.rings[0].3, Rgb::BLACK);
    let outer = display.rings[4].3;
    assert_eq!(outer, Rgb::new(78, 39, 78));
    assert!(display.rings[3].3.b < outer.b);
  }

  #[test]
  fn render_skips_negative_radii() {
    let config = VisualiserConfig {
      led_diameter: 2,
      ..VisualiserConfig::default()
    };
    let mut f = RippleField::with_rng(&config, StdRng::seed_from_u64(1));
    f.spawn((0.0, 0.0), 255, 0);
    let mut display = RecordingDisplay::default();
    f.render(0, &mut display);
    assert!(display.rings.iter().all(|ring| ring.2 >= 0.0));
    assert_eq!(display.rings.len(), 2);
  }
}
