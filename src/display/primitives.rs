//! Drawing primitives.
//!
//! Everything takes logical coordinates under the current rotation and clips
//! silently; only cache or medium failures come back as errors. Geometry is
//! widened to `i64` before any offset or length arithmetic, so every `i32`
//! input is legal. Fast lines are resolved to raw orientation once and then
//! filled a byte at a time.

use std::mem::swap;

use super::address::{self, POSTMASK, PREMASK};
use super::engine::GfxDisplay;
use super::transport::DisplayTransport;
use super::{BitOp, Color, Rotation};
use crate::error::{GfxError, Result};

/// Quarter selectors for the circle helpers
pub mod corner {
    pub const TOP_LEFT: u8 = 0x01;
    pub const TOP_RIGHT: u8 = 0x02;
    pub const BOTTOM_RIGHT: u8 = 0x04;
    pub const BOTTOM_LEFT: u8 = 0x08;
}

/// `ceil(a / b)` for a positive `b`
fn div_ceil(a: i128, b: i128) -> i128 {
    -((-a).div_euclid(b))
}

fn square(v: i64) -> i128 {
    i128::from(v) * i128::from(v)
}

fn isqrt(n: i128) -> i128 {
    if n <= 0 {
        return 0;
    }
    let mut root = (n as f64).sqrt() as i128;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

/// One step of the midpoint circle walk: (x, y) now, (px, py) the step before
#[derive(Debug, Clone, Copy)]
struct ArcStep {
    x: i64,
    y: i64,
    px: i64,
    py: i64,
}

/// Row the midpoint walk holds at column `x` while still inside the octant:
/// the largest y with y(y - 1) < r² - x²
fn octant_y(r: i64, x: i64) -> i64 {
    let target = square(r) - square(x);
    let mut y = isqrt(target) + 1;
    while y > 0 && y * (y - 1) >= target {
        y -= 1;
    }
    y as i64
}

/// Last step the walk takes for radius `r`, 0 when it takes none
fn last_arc_step(r: i64) -> i64 {
    if r < 1 {
        return 0;
    }
    // step x runs while the row before it is still above the diagonal
    let (mut lo, mut hi) = (1, r);
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if octant_y(r, mid - 1) > mid - 1 {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// First step in 1..=last whose previous row is at most `row`
fn first_step_below(r: i64, row: i64, last: i64) -> i64 {
    let (mut lo, mut hi) = (1, last + 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if octant_y(r, mid - 1) <= row {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Last step in 1..=last whose previous row is at least `row`
fn last_step_above(r: i64, row: i64, last: i64) -> i64 {
    let (mut lo, mut hi) = (0, last);
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if octant_y(r, mid - 1) >= row {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// Sort inclusive ranges and fuse the ones that touch, dropping empty ones
fn merge_ranges(mut ranges: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    ranges.retain(|&(start, end)| start <= end);
    ranges.sort_unstable();
    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 + 1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

impl<T: DisplayTransport> GfxDisplay<T> {
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<()> {
        if !self.state.contains(x, y) {
            return Ok(());
        }
        let (rx, ry) = address::rotate(
            x,
            y,
            self.state.rotation,
            self.state.raw_width,
            self.state.raw_height,
        );
        self.select_draw()?;
        let (rx, ry) = (rx as usize, ry as usize);
        self.cache
            .bit_operation(rx, ry, color.bit_op(), address::pixel_mask(ry))
    }

    pub fn fast_hline(&mut self, x: i32, y: i32, w: i32, color: Color) -> Result<()> {
        self.hspan(x.into(), y.into(), w.into(), color)
    }

    pub fn fast_vline(&mut self, x: i32, y: i32, h: i32, color: Color) -> Result<()> {
        self.vspan(x.into(), y.into(), h.into(), color)
    }

    /// Logical frame size
    fn frame(&self) -> (i64, i64) {
        (self.state.width.into(), self.state.height.into())
    }

    fn raw_frame(&self) -> (i64, i64) {
        (self.state.raw_width.into(), self.state.raw_height.into())
    }

    pub(crate) fn plot(&mut self, x: i64, y: i64, color: Color) -> Result<()> {
        let (w, h) = self.frame();
        if x < 0 || y < 0 || x >= w || y >= h {
            return Ok(());
        }
        self.set_pixel(x as i32, y as i32, color)
    }

    pub(crate) fn hspan(&mut self, x: i64, y: i64, w: i64, color: Color) -> Result<()> {
        let (raw_w, raw_h) = self.raw_frame();
        match self.state.rotation {
            Rotation::Deg0 => self.raw_hline(x, y, w, color),
            Rotation::Deg90 => self.raw_vline(raw_w - y - 1, x, w, color),
            Rotation::Deg180 => self.raw_hline(raw_w - x - w, raw_h - y - 1, w, color),
            Rotation::Deg270 => self.raw_vline(y, raw_h - x - w, w, color),
        }
    }

    pub(crate) fn vspan(&mut self, x: i64, y: i64, h: i64, color: Color) -> Result<()> {
        let (raw_w, raw_h) = self.raw_frame();
        match self.state.rotation {
            Rotation::Deg0 => self.raw_vline(x, y, h, color),
            Rotation::Deg90 => self.raw_hline(raw_w - y - h, x, h, color),
            Rotation::Deg180 => self.raw_vline(raw_w - x - 1, raw_h - y - h, h, color),
            Rotation::Deg270 => self.raw_hline(y, raw_h - x - 1, h, color),
        }
    }

    /// Horizontal run in raw coordinates, one bit operation per column
    fn raw_hline(&mut self, x: i64, y: i64, w: i64, color: Color) -> Result<()> {
        let (raw_w, raw_h) = self.raw_frame();
        if y < 0 || y >= raw_h || w <= 0 {
            return Ok(());
        }
        let (start, end) = (x.max(0), (x + w).min(raw_w));
        if start >= end {
            return Ok(());
        }

        self.select_draw()?;
        let y = y as usize;
        let mask = address::pixel_mask(y);
        let op = color.bit_op();
        for column in start as usize..end as usize {
            self.cache.bit_operation(column, y, op, mask)?;
        }
        Ok(())
    }

    /// Vertical run in raw coordinates: partial top byte, whole bytes, partial bottom byte
    fn raw_vline(&mut self, x: i64, y: i64, h: i64, color: Color) -> Result<()> {
        let (raw_w, raw_h) = self.raw_frame();
        if x < 0 || x >= raw_w || h <= 0 {
            return Ok(());
        }
        let (top, bottom) = (y.max(0), (y + h).min(raw_h));
        if top >= bottom {
            return Ok(());
        }

        self.select_draw()?;
        let op = color.bit_op();
        let x = x as usize;
        let mut y = top as usize;
        let mut h = (bottom - top) as usize;

        let phase = y & 0x07;
        if phase != 0 {
            let fill = 8 - phase;
            let mut mask = PREMASK[fill];
            if h < fill {
                mask &= 0xFF >> (fill - h);
            }
            self.cache.bit_operation(x, y, op, mask)?;
            if h <= fill {
                return Ok(());
            }
            h -= fill;
            y += fill;
        }

        while h >= 8 {
            match color {
                Color::On => *self.cache.pixel_byte_mut(x, y)? = 0xFF,
                Color::Off => *self.cache.pixel_byte_mut(x, y)? = 0x00,
                // toggling has to read first, so it stays a bit operation
                Color::Invert => self.cache.bit_operation(x, y, BitOp::Toggle, 0xFF)?,
            }
            h -= 8;
            y += 8;
        }

        if h > 0 {
            self.cache.bit_operation(x, y, op, POSTMASK[h])?;
        }
        Ok(())
    }

    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) -> Result<()> {
        self.line(x0.into(), y0.into(), x1.into(), y1.into(), color)
    }

    /// Bresenham line. Steps outside the frame along the major axis are
    /// skipped by solving for the error term instead of walking them.
    fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) -> Result<()> {
        if x0 == x1 {
            let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
            return self.vspan(x0, top, bottom - top + 1, color);
        }
        if y0 == y1 {
            let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
            return self.hspan(left, y0, right - left + 1, color);
        }

        let (mut x0, mut y0, mut x1, mut y1) = (x0, y0, x1, y1);
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            swap(&mut x0, &mut y0);
            swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            swap(&mut x0, &mut x1);
            swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        let ystep = if y0 < y1 { 1 } else { -1 };

        let (w, h) = self.frame();
        let limit = if steep { h } else { w };
        let (first, last) = (x0.max(0), x1.min(limit - 1));
        if first > last {
            return Ok(());
        }

        // state after `first - x0` steps: err stays in 0..dx
        let (dx_wide, dy_wide) = (i128::from(dx), i128::from(dy));
        let walked = i128::from(first - x0) * dy_wide - i128::from(dx / 2);
        let rises = div_ceil(walked, dx_wide).max(0);
        let mut y = y0 + ystep * rises as i64;
        let mut err = (rises * dx_wide - walked) as i64;

        for x in first..=last {
            if steep {
                self.plot(y, x, color)?;
            } else {
                self.plot(x, y, color)?;
            }
            err -= dy;
            if err < 0 {
                y += ystep;
                err += dx;
            }
        }
        Ok(())
    }

    /// Midpoint circle outline
    pub fn draw_circle(&mut self, x0: i32, y0: i32, r: i32, color: Color) -> Result<()> {
        let (x0, y0, r) = (i64::from(x0), i64::from(y0), i64::from(r));
        self.plot(x0, y0 + r, color)?;
        self.plot(x0, y0 - r, color)?;
        self.plot(x0 + r, y0, color)?;
        self.plot(x0 - r, y0, color)?;
        self.circle_arcs(x0, y0, r, 0x0F, color)
    }

    /// Quarter-circle outlines selected by the `corner` bits
    pub fn draw_circle_helper(
        &mut self,
        x0: i32,
        y0: i32,
        r: i32,
        corners: u8,
        color: Color,
    ) -> Result<()> {
        self.circle_arcs(x0.into(), y0.into(), r.into(), corners, color)
    }

    fn circle_arcs(&mut self, x0: i64, y0: i64, r: i64, corners: u8, color: Color) -> Result<()> {
        let (w, h) = self.frame();
        // every point is offset by x along one axis
        let windows = [
            (-x0, w - 1 - x0),
            (x0 - w + 1, x0),
            (-y0, h - 1 - y0),
            (y0 - h + 1, y0),
        ];
        let last = last_arc_step(r);
        let steps = windows
            .iter()
            .map(|&(lo, hi)| (lo.max(1), hi.min(last)))
            .collect();

        self.walk_arc(r, steps, |display, ArcStep { x, y, .. }| {
            if corners & corner::BOTTOM_RIGHT != 0 {
                display.plot(x0 + x, y0 + y, color)?;
                display.plot(x0 + y, y0 + x, color)?;
            }
            if corners & corner::TOP_RIGHT != 0 {
                display.plot(x0 + x, y0 - y, color)?;
                display.plot(x0 + y, y0 - x, color)?;
            }
            if corners & corner::BOTTOM_LEFT != 0 {
                display.plot(x0 - y, y0 + x, color)?;
                display.plot(x0 - x, y0 + y, color)?;
            }
            if corners & corner::TOP_LEFT != 0 {
                display.plot(x0 - y, y0 - x, color)?;
                display.plot(x0 - x, y0 - y, color)?;
            }
            Ok(())
        })
    }

    pub fn fill_circle(&mut self, x0: i32, y0: i32, r: i32, color: Color) -> Result<()> {
        let (x0, y0, r) = (i64::from(x0), i64::from(y0), i64::from(r));
        self.vspan(x0, y0 - r, 2 * r + 1, color)?;
        self.circle_spans(x0, y0, r, 0x03, 0, color)
    }

    /// Half-disc fill made of vertical spans.
    ///
    /// Bit 0 of `sides` fills right of `x0`, bit 1 left of it; `delta` stretches
    /// every span, which is how rounded rectangles get their straight middle.
    pub fn fill_circle_helper(
        &mut self,
        x0: i32,
        y0: i32,
        r: i32,
        sides: u8,
        delta: i32,
        color: Color,
    ) -> Result<()> {
        self.circle_spans(x0.into(), y0.into(), r.into(), sides, delta.into(), color)
    }

    fn circle_spans(
        &mut self,
        x0: i64,
        y0: i64,
        r: i64,
        sides: u8,
        delta: i64,
        color: Color,
    ) -> Result<()> {
        let (w, _) = self.frame();
        let last = last_arc_step(r);
        // a step draws at columns x0 +- x, and at x0 +- py when y moves
        let mut steps = Vec::with_capacity(4);
        for (lo, hi) in [(-x0, w - 1 - x0), (x0 - w + 1, x0)] {
            steps.push((lo.max(1), hi.min(last)));
            steps.push((first_step_below(r, hi, last), last_step_above(r, lo, last)));
        }
        let delta = delta + 1;

        self.walk_arc(r, steps, |display, ArcStep { x, y, px, py }| {
            // skip the span a 45 degree step would draw twice
            if x < y + 1 {
                if sides & 0x01 != 0 {
                    display.vspan(x0 + x, y0 - y, 2 * y + delta, color)?;
                }
                if sides & 0x02 != 0 {
                    display.vspan(x0 - x, y0 - y, 2 * y + delta, color)?;
                }
            }
            if y != py {
                if sides & 0x01 != 0 {
                    display.vspan(x0 + py, y0 - px, 2 * px + delta, color)?;
                }
                if sides & 0x02 != 0 {
                    display.vspan(x0 - py, y0 - px, 2 * px + delta, color)?;
                }
            }
            Ok(())
        })
    }

    /// Run the midpoint walk over the given inclusive step ranges.
    ///
    /// Each range is entered by solving for its starting row, so only steps
    /// that can land in the frame are visited, and each of them once.
    fn walk_arc<F>(&mut self, r: i64, steps: Vec<(i64, i64)>, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Self, ArcStep) -> Result<()>,
    {
        for (start, end) in merge_ranges(steps) {
            let mut x = start - 1;
            let mut y = octant_y(r, x);
            let mut f = (square(x + 1) + square(y) - i128::from(y) - square(r)) as i64;
            let mut dd_f_x = 2 * x + 1;
            let mut dd_f_y = -2 * y;
            let (mut px, mut py) = (x, y);

            while x < y && x < end {
                if f >= 0 {
                    y -= 1;
                    dd_f_y += 2;
                    f += dd_f_y;
                }
                x += 1;
                dd_f_x += 2;
                f += dd_f_x;

                visit(self, ArcStep { x, y, px, py })?;
                px = x;
                py = y;
            }
        }
        Ok(())
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<()> {
        let (x, y, w, h) = (i64::from(x), i64::from(y), i64::from(w), i64::from(h));
        self.hspan(x, y, w, color)?;
        self.hspan(x, y + h - 1, w, color)?;
        self.vspan(x, y, h, color)?;
        self.vspan(x + w - 1, y, h, color)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<()> {
        self.fill_area(x.into(), y.into(), w.into(), h.into(), color)
    }

    /// One vertical line per column; columns outside the frame are skipped
    pub(crate) fn fill_area(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) -> Result<()> {
        let (width, _) = self.frame();
        for column in x.max(0)..(x + w).min(width) {
            self.vspan(column, y, h, color)?;
        }
        Ok(())
    }

    pub fn fill_screen(&mut self, color: Color) -> Result<()> {
        let (w, h) = self.frame();
        self.fill_area(0, 0, w, h, color)
    }

    pub fn draw_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        r: i32,
        color: Color,
    ) -> Result<()> {
        let (x, y, w, h) = (i64::from(x), i64::from(y), i64::from(w), i64::from(h));
        let r = i64::from(r).clamp(0, (w.min(h) / 2).max(0));
        self.hspan(x + r, y, w - 2 * r, color)?;
        self.hspan(x + r, y + h - 1, w - 2 * r, color)?;
        self.vspan(x, y + r, h - 2 * r, color)?;
        self.vspan(x + w - 1, y + r, h - 2 * r, color)?;

        self.circle_arcs(x + r, y + r, r, corner::TOP_LEFT, color)?;
        self.circle_arcs(x + w - r - 1, y + r, r, corner::TOP_RIGHT, color)?;
        self.circle_arcs(x + w - r - 1, y + h - r - 1, r, corner::BOTTOM_RIGHT, color)?;
        self.circle_arcs(x + r, y + h - r - 1, r, corner::BOTTOM_LEFT, color)
    }

    pub fn fill_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        r: i32,
        color: Color,
    ) -> Result<()> {
        let (x, y, w, h) = (i64::from(x), i64::from(y), i64::from(w), i64::from(h));
        let r = i64::from(r).clamp(0, (w.min(h) / 2).max(0));
        self.fill_area(x + r, y, w - 2 * r, h, color)?;
        self.circle_spans(x + w - r - 1, y + r, r, 0x01, h - 2 * r - 1, color)?;
        self.circle_spans(x + r, y + r, r, 0x02, h - 2 * r - 1, color)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
    ) -> Result<()> {
        let (x0, y0, x1, y1) = (x0.into(), y0.into(), x1.into(), y1.into());
        let (x2, y2) = (x2.into(), y2.into());
        self.line(x0, y0, x1, y1, color)?;
        self.line(x1, y1, x2, y2, color)?;
        self.line(x2, y2, x0, y0, color)
    }

    /// Scanline fill of the upper and lower halves split at the middle vertex.
    /// Only rows inside the frame are visited.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
    ) -> Result<()> {
        let (mut x0, mut y0) = (i64::from(x0), i64::from(y0));
        let (mut x1, mut y1) = (i64::from(x1), i64::from(y1));
        let (mut x2, mut y2) = (i64::from(x2), i64::from(y2));
        if y0 > y1 {
            swap(&mut y0, &mut y1);
            swap(&mut x0, &mut x1);
        }
        if y1 > y2 {
            swap(&mut y2, &mut y1);
            swap(&mut x2, &mut x1);
        }
        if y0 > y1 {
            swap(&mut y0, &mut y1);
            swap(&mut x0, &mut x1);
        }

        if y0 == y2 {
            let left = x0.min(x1).min(x2);
            let right = x0.max(x1).max(x2);
            return self.hspan(left, y0, right - left + 1, color);
        }

        let (_, h) = self.frame();
        // edge x at row y, truncating toward zero like the running sums would
        let edge = |xa: i64, ya: i64, xb: i64, yb: i64, y: i64| -> i64 {
            let run = i128::from(xb - xa) * i128::from(y - ya);
            xa + (run / i128::from(yb - ya)) as i64
        };

        // a flat bottom includes the y1 scanline in the upper half
        let last = if y1 == y2 { y1 } else { y1 - 1 };

        for y in y0.max(0)..=last.min(h - 1) {
            let a = edge(x0, y0, x1, y1, y);
            let b = edge(x0, y0, x2, y2, y);
            let (a, b) = if a > b { (b, a) } else { (a, b) };
            self.hspan(a, y, b - a + 1, color)?;
        }
        for y in (last + 1).max(0)..=y2.min(h - 1) {
            let a = edge(x1, y1, x2, y2, y);
            let b = edge(x0, y0, x2, y2, y);
            let (a, b) = if a > b { (b, a) } else { (a, b) };
            self.hspan(a, y, b - a + 1, color)?;
        }
        Ok(())
    }

    /// Row-major, MSB-first 1bpp image. Clear bits are painted with
    /// `background` unless it equals `color`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bitmap(
        &mut self,
        x: i32,
        y: i32,
        bitmap: &[u8],
        w: i32,
        h: i32,
        color: Color,
        background: Color,
    ) -> Result<()> {
        let Some(byte_width) = bitmap_stride(bitmap, w, h)? else {
            return Ok(());
        };
        let (x, y) = (i64::from(x), i64::from(y));

        for j in 0..h {
            let row = &bitmap[j as usize * byte_width..];
            let mut byte = 0u8;
            for i in 0..w {
                if i & 7 != 0 {
                    byte <<= 1;
                } else {
                    byte = row[(i / 8) as usize];
                }
                let (px, py) = (x + i64::from(i), y + i64::from(j));
                if byte & 0x80 != 0 {
                    self.plot(px, py, color)?;
                } else if background != color {
                    self.plot(px, py, background)?;
                }
            }
        }
        Ok(())
    }

    /// XBM image: row-major, LSB-first, set bits only
    pub fn draw_xbitmap(
        &mut self,
        x: i32,
        y: i32,
        bitmap: &[u8],
        w: i32,
        h: i32,
        color: Color,
    ) -> Result<()> {
        let Some(byte_width) = bitmap_stride(bitmap, w, h)? else {
            return Ok(());
        };
        let (x, y) = (i64::from(x), i64::from(y));

        for j in 0..h {
            let row = &bitmap[j as usize * byte_width..];
            let mut byte = 0u8;
            for i in 0..w {
                if i & 7 != 0 {
                    byte >>= 1;
                } else {
                    byte = row[(i / 8) as usize];
                }
                if byte & 0x01 != 0 {
                    self.plot(x + i64::from(i), y + i64::from(j), color)?;
                }
            }
        }
        Ok(())
    }
}

/// Bytes per bitmap row, or `None` for an empty image
fn bitmap_stride(bitmap: &[u8], w: i32, h: i32) -> Result<Option<usize>> {
    if w <= 0 || h <= 0 {
        return Ok(None);
    }
    let byte_width = (w as usize + 7) / 8;
    let needed = byte_width
        .checked_mul(h as usize)
        .ok_or(GfxError::InvalidArgument("bitmap dimensions overflow"))?;
    if bitmap.len() < needed {
        return Err(GfxError::InvalidArgument("bitmap shorter than width x height"));
    }
    Ok(Some(byte_width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;
    use crate::display::engine::{default_splash, Backing};
    use crate::display::medium::RamMedium;
    use crate::display::transport::MemoryTransport;

    fn display() -> GfxDisplay<MemoryTransport> {
        let config = DisplayConfig {
            width: 32,
            height: 16,
            cache_line_size: 16,
            ..DisplayConfig::default()
        };
        GfxDisplay::new(MemoryTransport::new(), &config, Backing::Direct, default_splash(32, 16))
            .unwrap()
    }

    fn external() -> GfxDisplay<MemoryTransport> {
        let config = DisplayConfig {
            width: 32,
            height: 16,
            cache_line_size: 8,
            ..DisplayConfig::default()
        };
        GfxDisplay::new(
            MemoryTransport::new(),
            &config,
            Backing::External(Box::new(RamMedium::new(64))),
            default_splash(32, 16),
        )
        .unwrap()
    }

    fn lit(display: &mut GfxDisplay<MemoryTransport>) -> Vec<(i32, i32)> {
        let mut points = Vec::new();
        for y in 0..display.height() {
            for x in 0..display.width() {
                if display.read_pixel(x, y).unwrap() {
                    points.push((x, y));
                }
            }
        }
        points
    }

    #[test]
    fn test_set_pixel_packs_into_pages() {
        let mut display = display();
        display.set_pixel(5, 10, Color::On).unwrap();
        assert_eq!(display.frame_byte(32 + 5).unwrap(), 0x04);
    }

    #[test]
    fn test_out_of_bounds_is_silent() {
        let mut display = display();
        display.set_pixel(-1, 0, Color::On).unwrap();
        display.set_pixel(32, 0, Color::On).unwrap();
        display.fast_hline(-10, 3, 5, Color::On).unwrap();
        display.fast_vline(3, 16, 5, Color::On).unwrap();
        display.fill_rect(40, 0, 5, 5, Color::On).unwrap();
        assert!(lit(&mut display).is_empty());
    }

    #[test]
    fn test_vline_partial_bytes() {
        let mut display = display();
        display.fast_vline(0, 2, 3, Color::On).unwrap();
        assert_eq!(display.frame_byte(0).unwrap(), 0b0001_1100);

        display.fast_vline(1, 5, 9, Color::On).unwrap();
        assert_eq!(display.frame_byte(1).unwrap(), 0xE0);
        assert_eq!(display.frame_byte(33).unwrap(), 0x3F);

        display.fast_vline(2, 0, 16, Color::On).unwrap();
        assert_eq!(display.frame_byte(2).unwrap(), 0xFF);
        assert_eq!(display.frame_byte(34).unwrap(), 0xFF);
    }

    #[test]
    fn test_vline_invert_toggles_whole_bytes() {
        let mut display = display();
        display.set_pixel(4, 3, Color::On).unwrap();
        display.fast_vline(4, 0, 16, Color::Invert).unwrap();
        assert_eq!(display.frame_byte(4).unwrap(), 0xF7);
        assert_eq!(display.frame_byte(36).unwrap(), 0xFF);
    }

    #[test]
    fn test_hline_clips_to_right_edge() {
        let mut display = display();
        display.fast_hline(30, 0, 10, Color::On).unwrap();
        assert_eq!(lit(&mut display), vec![(30, 0), (31, 0)]);
    }

    #[test]
    fn test_rotated_lines_match_pixels() {
        for rotation in Rotation::ALL {
            let mut lines = display();
            let mut pixels = display();
            lines.set_rotation(rotation);
            pixels.set_rotation(rotation);

            lines.fast_hline(1, 2, 7, Color::On).unwrap();
            lines.fast_vline(3, 1, 9, Color::On).unwrap();
            for i in 0..7 {
                pixels.set_pixel(1 + i, 2, Color::On).unwrap();
            }
            for j in 0..9 {
                pixels.set_pixel(3, 1 + j, Color::On).unwrap();
            }
            assert_eq!(lit(&mut lines), lit(&mut pixels), "rotation {:?}", rotation);
        }
    }

    #[test]
    fn test_line_endpoints_and_slope() {
        let mut display = display();
        display.draw_line(0, 0, 4, 2, Color::On).unwrap();
        assert_eq!(
            lit(&mut display),
            vec![(0, 0), (1, 0), (2, 1), (3, 1), (4, 2)]
        );
    }

    #[test]
    fn test_steep_line_visits_every_row() {
        let mut display = display();
        display.draw_line(2, 0, 0, 6, Color::On).unwrap();
        let points = lit(&mut display);
        assert_eq!(points.len(), 7);
        for y in 0..7 {
            assert!(points.iter().any(|&(_, py)| py == y));
        }
    }

    #[test]
    fn test_circle_extremes() {
        let mut display = display();
        display.draw_circle(10, 7, 4, Color::On).unwrap();
        for (x, y) in [(10, 3), (10, 11), (6, 7), (14, 7)] {
            assert!(display.read_pixel(x, y).unwrap());
        }
        assert!(!display.read_pixel(10, 7).unwrap());
    }

    #[test]
    fn test_fill_circle_contains_outline() {
        let mut filled = display();
        let mut outline = display();
        filled.fill_circle(15, 7, 6, Color::On).unwrap();
        outline.draw_circle(15, 7, 6, Color::On).unwrap();

        let filled = lit(&mut filled);
        for point in lit(&mut outline) {
            assert!(filled.contains(&point), "{:?} missing", point);
        }
        assert!(filled.contains(&(15, 7)));
    }

    #[test]
    fn test_rect_outline_and_fill() {
        let mut display = display();
        display.draw_rect(1, 1, 4, 3, Color::On).unwrap();
        let points = lit(&mut display);
        assert_eq!(points.len(), 10);
        assert!(!points.contains(&(2, 2)));

        display.fill_rect(1, 1, 4, 3, Color::On).unwrap();
        assert_eq!(lit(&mut display).len(), 12);
    }

    #[test]
    fn test_fill_screen_then_clear_region() {
        let mut display = display();
        display.fill_screen(Color::On).unwrap();
        display.fill_rect(4, 4, 4, 4, Color::Off).unwrap();
        assert_eq!(lit(&mut display).len(), 32 * 16 - 16);
        assert!(!display.read_pixel(5, 5).unwrap());
    }

    #[test]
    fn test_round_rect_corners_are_cut() {
        let mut display = display();
        display.draw_round_rect(0, 0, 12, 10, 3, Color::On).unwrap();
        assert!(!display.read_pixel(0, 0).unwrap());
        assert!(display.read_pixel(5, 0).unwrap());
        assert!(display.read_pixel(0, 5).unwrap());

        let mut filled = self::display();
        filled.fill_round_rect(0, 0, 12, 10, 3, Color::On).unwrap();
        assert!(!filled.read_pixel(0, 0).unwrap());
        assert!(filled.read_pixel(6, 5).unwrap());
        assert!(filled.read_pixel(0, 5).unwrap());
    }

    #[test]
    fn test_flat_triangle_is_one_span() {
        let mut display = display();
        display.fill_triangle(7, 4, 2, 4, 12, 4, Color::On).unwrap();
        let expected: Vec<_> = (2..=12).map(|x| (x, 4)).collect();
        assert_eq!(lit(&mut display), expected);
    }

    #[test]
    fn test_fill_triangle_covers_vertices() {
        let mut display = display();
        display.fill_triangle(0, 0, 10, 0, 0, 10, Color::On).unwrap();
        assert!(display.read_pixel(0, 0).unwrap());
        assert!(display.read_pixel(10, 0).unwrap());
        assert!(display.read_pixel(0, 10).unwrap());
        assert!(display.read_pixel(3, 3).unwrap());
        assert!(!display.read_pixel(9, 9).unwrap());
    }

    #[test]
    fn test_bitmap_msb_first_with_background() {
        let mut display = display();
        display.fill_rect(0, 0, 8, 1, Color::On).unwrap();
        display
            .draw_bitmap(0, 0, &[0b1000_0001], 8, 1, Color::On, Color::Off)
            .unwrap();
        assert_eq!(lit(&mut display), vec![(0, 0), (7, 0)]);
    }

    #[test]
    fn test_bitmap_transparent_when_colors_match() {
        let mut display = display();
        display.set_pixel(3, 0, Color::On).unwrap();
        display
            .draw_bitmap(0, 0, &[0b1000_0000], 8, 1, Color::On, Color::On)
            .unwrap();
        assert_eq!(lit(&mut display), vec![(0, 0), (3, 0)]);
    }

    #[test]
    fn test_xbitmap_lsb_first() {
        let mut display = display();
        display
            .draw_xbitmap(0, 0, &[0b0000_0011, 0b1000_0000], 9, 1, Color::On)
            .unwrap();
        assert_eq!(lit(&mut display), vec![(0, 0), (1, 0)]);

        display
            .draw_xbitmap(0, 2, &[0x00, 0x01], 9, 1, Color::On)
            .unwrap();
        assert!(display.read_pixel(8, 2).unwrap());
    }

    #[test]
    fn test_short_bitmap_is_rejected() {
        let mut display = display();
        let err = display
            .draw_bitmap(0, 0, &[0xFF], 16, 2, Color::On, Color::On)
            .unwrap_err();
        assert!(matches!(err, GfxError::InvalidArgument(_)));
    }

    #[test]
    fn test_extreme_coordinates_every_rotation() {
        const MIN: i32 = i32::MIN;
        const MAX: i32 = i32::MAX;
        for rotation in Rotation::ALL {
            let mut display = display();
            display.set_rotation(rotation);
            let (w, h) = (display.width(), display.height());

            display.set_pixel(MIN, MAX, Color::On).unwrap();
            display.fast_hline(MIN, 0, 5, Color::On).unwrap();
            display.fast_hline(MAX, 0, MAX, Color::On).unwrap();
            display.fast_hline(MIN + 1, 2, MAX, Color::On).unwrap();
            display.fast_vline(0, MIN, MAX, Color::On).unwrap();
            display.fast_vline(MAX, 0, 5, Color::On).unwrap();
            display.draw_rect(MAX - 1, 0, 10, 10, Color::On).unwrap();
            display.draw_rect(MIN, MIN, MAX, MAX, Color::On).unwrap();
            display.fill_rect(MIN, MIN, MAX, MAX, Color::On).unwrap();
            display.draw_round_rect(MIN, MIN, MAX, MAX, MAX, Color::On).unwrap();
            display.fill_round_rect(MIN, MIN, MAX, MAX, MAX, Color::On).unwrap();
            display.draw_circle(MAX, MAX, MAX, Color::On).unwrap();
            display.draw_circle(MIN, 0, MAX, Color::On).unwrap();
            display.fill_circle(MIN, MIN, MAX, Color::On).unwrap();
            display.draw_line(MIN, -1, MAX, MIN, Color::On).unwrap();
            display.draw_triangle(MIN, -1, MAX, -1, 0, MIN, Color::On).unwrap();
            display.fill_triangle(MIN, MIN, MAX, MIN, 0, -1, Color::On).unwrap();
            display
                .draw_bitmap(MAX - 3, MIN, &[0xFF; 2], 8, 2, Color::On, Color::Off)
                .unwrap();
            display.draw_xbitmap(MIN, MAX, &[0xFF], 8, 1, Color::On).unwrap();
            assert!(lit(&mut display).is_empty(), "rotation {:?}", rotation);

            display.draw_line(MIN, 3, MAX, 3, Color::On).unwrap();
            let row: Vec<_> = (0..w).map(|x| (x, 3)).collect();
            assert_eq!(lit(&mut display), row, "rotation {:?}", rotation);

            display.fill_screen(Color::Off).unwrap();
            display.draw_line(MIN, MIN, MAX, MAX, Color::On).unwrap();
            let diagonal: Vec<_> = (0..w.min(h)).map(|k| (k, k)).collect();
            assert_eq!(lit(&mut display), diagonal, "rotation {:?}", rotation);

            display.fill_screen(Color::Off).unwrap();
            display.fill_circle(10, 10, MAX / 2 + 10, Color::On).unwrap();
            assert_eq!(lit(&mut display).len(), (w * h) as usize, "rotation {:?}", rotation);

            display.fill_screen(Color::Off).unwrap();
            display.fill_triangle(MIN, 0, MAX, 0, 0, MAX, Color::On).unwrap();
            assert_eq!(lit(&mut display).len(), (w * h) as usize, "rotation {:?}", rotation);
        }
    }

    /// Every step of the midpoint walk as (x, y, px, py)
    fn full_walk(r: i32) -> Vec<(i32, i32, i32, i32)> {
        let (mut f, mut dd_f_x, mut dd_f_y) = (1 - r, 1, -2 * r);
        let (mut x, mut y, mut px, mut py) = (0, r, 0, r);
        let mut steps = Vec::new();
        while x < y {
            if f >= 0 {
                y -= 1;
                dd_f_y += 2;
                f += dd_f_y;
            }
            x += 1;
            dd_f_x += 2;
            f += dd_f_x;
            steps.push((x, y, px, py));
            px = x;
            py = y;
        }
        steps
    }

    #[test]
    fn test_far_circles_match_full_walk() {
        let cases = [
            (16, 8, 5),
            (-900, 8, 912),
            (40, -2000, 2010),
            (1000, 1000, 1400),
            (-2000, -2000, 2830),
            (16, 2500, 2495),
            (3, 3, 2),
        ];
        for rotation in [Rotation::Deg0, Rotation::Deg90] {
            for &(x0, y0, r) in &cases {
                let mut outline = display();
                let mut expected = display();
                for target in [&mut outline, &mut expected] {
                    target.set_rotation(rotation);
                    target.fill_rect(0, 0, 9, 9, Color::On).unwrap();
                }

                outline.draw_circle(x0, y0, r, Color::Invert).unwrap();
                for (x, y) in [(x0, y0 + r), (x0, y0 - r), (x0 + r, y0), (x0 - r, y0)] {
                    expected.set_pixel(x, y, Color::Invert).unwrap();
                }
                for (x, y, _, _) in full_walk(r) {
                    for (dx, dy) in [(x, y), (-x, y), (x, -y), (-x, -y), (y, x), (-y, x), (y, -x), (-y, -x)] {
                        expected.set_pixel(x0 + dx, y0 + dy, Color::Invert).unwrap();
                    }
                }
                assert_eq!(lit(&mut outline), lit(&mut expected), "outline {:?}", (x0, y0, r));

                let mut disc = display();
                let mut expected = display();
                for target in [&mut disc, &mut expected] {
                    target.set_rotation(rotation);
                    target.fill_rect(0, 0, 9, 9, Color::On).unwrap();
                }
                disc.fill_circle(x0, y0, r, Color::Invert).unwrap();
                expected.fast_vline(x0, y0 - r, 2 * r + 1, Color::Invert).unwrap();
                for (x, y, px, py) in full_walk(r) {
                    if x < y + 1 {
                        expected.fast_vline(x0 + x, y0 - y, 2 * y + 1, Color::Invert).unwrap();
                        expected.fast_vline(x0 - x, y0 - y, 2 * y + 1, Color::Invert).unwrap();
                    }
                    if y != py {
                        expected.fast_vline(x0 + py, y0 - px, 2 * px + 1, Color::Invert).unwrap();
                        expected.fast_vline(x0 - py, y0 - px, 2 * px + 1, Color::Invert).unwrap();
                    }
                }
                assert_eq!(lit(&mut disc), lit(&mut expected), "disc {:?}", (x0, y0, r));
            }
        }
    }

    #[test]
    fn test_merge_ranges_fuses_touching() {
        assert_eq!(
            merge_ranges(vec![(5, 9), (1, 3), (4, 4), (12, 11), (20, 30), (25, 26)]),
            vec![(1, 9), (20, 30)]
        );
        assert!(merge_ranges(vec![(3, 2)]).is_empty());
    }

    #[test]
    fn test_octant_rows_follow_walk() {
        for r in [1, 2, 7, 23, 64, 500] {
            for (x, y, _, _) in full_walk(r) {
                if x < y {
                    assert_eq!(octant_y(r.into(), x.into()), i64::from(y), "r {} x {}", r, x);
                }
            }
            let last = full_walk(r).last().map_or(0, |step| step.0);
            assert_eq!(last_arc_step(r.into()), i64::from(last), "r {}", r);
        }
    }

    #[test]
    fn test_external_backing_draws_like_direct() {
        let mut direct = display();
        let mut paged = external();
        for target in [&mut direct, &mut paged] {
            target.fill_circle(16, 8, 6, Color::On).unwrap();
            target.draw_line(0, 15, 31, 0, Color::Invert).unwrap();
            target.fill_rect(2, 2, 5, 9, Color::Off).unwrap();
        }
        assert_eq!(lit(&mut direct), lit(&mut paged));
        assert!(paged.cache_stats().loads > 1);
    }
}
