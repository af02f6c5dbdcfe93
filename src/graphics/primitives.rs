/// Fills a rectangle, clipping whatever falls outside the buffer.
pub fn fill_rect(
  buffer: &mut [u32],
  width: usize,
  height: usize,
  (x, y): (i32, i32),
  w: u32,
  h: u32,
  color: u32,
) {
  let x0 = x.max(0) as usize;
  let y0 = y.max(0) as usize;
  let x1 = (x as i64 + w as i64).clamp(0, width as i64) as usize;
  let y1 = (y as i64 + h as i64).clamp(0, height as i64) as usize;
  if x0 >= x1 || y0 >= y1 {
    return;
  }

  for row in buffer.chunks_exact_mut(width).take(y1).skip(y0) {
    row[x0..x1].fill(color);
  }
}

/// Midpoint circle outline. Pixels are merged with [`lighten`] so overlapping
/// rings never darken each other and drawing order does not matter.
pub fn draw_circle(
  buffer: &mut [u32],
  width: usize,
  height: usize,
  (cx, cy): (i32, i32),
  radius: i32,
  color: u32,
) {
  if radius < 0 {
    return;
  }

  let mut plot = |x: i32, y: i32| {
    if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
      let idx = y as usize * width + x as usize;
      buffer[idx] = lighten(buffer[idx], color);
    }
  };

  let mut x = radius;
  let mut y = 0;
  let mut err = 1 - radius;

  while x >= y {
    // eight octants
    plot(cx + x, cy + y);
    plot(cx + y, cy + x);
    plot(cx - y, cy + x);
    plot(cx - x, cy + y);
    plot(cx - x, cy - y);
    plot(cx - y, cy - x);
    plot(cx + y, cy - x);
    plot(cx + x, cy - y);

    y += 1;
    if err < 0 {
      err += 2 * y + 1;
    } else {
      x -= 1;
      err += 2 * (y - x) + 1;
    }
  }
}

/// Per-channel maximum of two 0RGB pixels.
#[inline]
pub fn lighten(a: u32, b: u32) -> u32 {
  let r = ((a >> 16) & 0xFF).max((b >> 16) & 0xFF);
  let g = ((a >> 8) & 0xFF).max((b >> 8) & 0xFF);
  let bl = (a & 0xFF).max(b & 0xFF);
  (r << 16) | (g << 8) | bl
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rect_is_clipped() {
    let mut buf = vec![0u32; 16];
    fill_rect(&mut buf, 4, 4, (-1, 2), 3, 5, 7);
    let lit: Vec<usize> = (0..16).filter(|&i| buf[i] == 7).collect();
    assert_eq!(lit, vec![8, 9, 12, 13]);
  }

  #[test]
  fn rect_fully_outside_is_noop() {
    let mut buf = vec![0u32; 16];
    fill_rect(&mut buf, 4, 4, (10, 10), 3, 3, 7);
    fill_rect(&mut buf, 4, 4, (-5, 0), 3, 3, 7);
    assert!(buf.iter().all(|&p| p == 0));
  }

  #[test]
  fn circle_touches_cardinal_points() {
    let mut buf = vec![0u32; 11 * 11];
    draw_circle(&mut buf, 11, 11, (5, 5), 4, 0x00FF_FFFF);
    for (x, y) in [(9, 5), (1, 5), (5, 9), (5, 1)] {
      assert_eq!(buf[y * 11 + x], 0x00FF_FFFF, "({x}, {y})");
    }
    assert_eq!(buf[5 * 11 + 5], 0);
  }

  #[test]
  fn circle_merges_instead_of_overwriting() {
    let mut buf = vec![0x0000_00FFu32; 9 * 9];
    draw_circle(&mut buf, 9, 9, (4, 4), 2, 0x00FF_0000);
    assert_eq!(buf[4 * 9 + 6], 0x00FF_00FF);
  }

  #[test]
  fn lighten_is_symmetric() {
    assert_eq!(lighten(0x0010_2030, 0x0030_2010), 0x0030_2030);
    assert_eq!(lighten(0x0030_2010, 0x0010_2030), 0x0030_2030);
  }
}
