//! Software rendering into a 0RGB `u32` buffer that minifb can show directly.

mod font;
pub mod panel;

pub use font::{draw_text, draw_text_sized, text_width, CHAR_STEP, FONT_HEIGHT, FONT_WIDTH};

use crate::history::{HistoryBuffer, Timestamped};
use crate::sim::Readout;

/// Status bar layout.
pub const STATUS_PAD_TOP: usize = 3;
pub const STATUS_PAD_BOTTOM: usize = 2;
pub const STATUS_BAR_HEIGHT: usize = STATUS_PAD_TOP + FONT_HEIGHT + STATUS_PAD_BOTTOM;

/// Most readout series drawn at once.
pub const MAX_SERIES: usize = 3;

pub mod colors {
    pub const BACKGROUND: u32 = 0x10_10_14;
    pub const AXIS: u32 = 0x33_33_33;
    pub const LABEL: u32 = 0x88_88_88;
    pub const STATUS_BG: u32 = 0x0D_0D_0D;
    pub const STATUS_TEXT: u32 = 0x88_88_88;
    pub const SERIES: [u32; 3] = [0x00_CC_CC, 0xFF_AA_33, 0xCC_66_FF];
}

pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Scale the RGB channels of a 0RGB pixel.
pub fn scale_rgb(pixel: u32, factor: f64) -> u32 {
    let ch = |shift: u32| ((((pixel >> shift) & 0xFF) as f64 * factor).clamp(0.0, 255.0)) as u8;
    rgb(ch(16), ch(8), ch(0))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

#[derive(Clone, Debug)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Reallocate for a new window size; contents are cleared.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width * height];
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn fill_rect(&mut self, r: Rect, color: u32) {
        for y in r.y..(r.y + r.h).min(self.height) {
            for x in r.x..(r.x + r.w).min(self.width) {
                self.pixels[y * self.width + x] = color;
            }
        }
    }

    /// Multiply the RGB of a region by `factor`.
    pub fn darken_rect(&mut self, r: Rect, factor: f64) {
        for y in r.y..(r.y + r.h).min(self.height) {
            for x in r.x..(r.x + r.w).min(self.width) {
                let i = y * self.width + x;
                self.pixels[i] = scale_rgb(self.pixels[i], factor);
            }
        }
    }

    /// 1px border.
    pub fn rect_border(&mut self, r: Rect, color: u32) {
        if r.w == 0 || r.h == 0 {
            return;
        }
        for dx in 0..r.w {
            self.set(r.x + dx, r.y, color);
            self.set(r.x + dx, r.y + r.h - 1, color);
        }
        for dy in 0..r.h {
            self.set(r.x, r.y + dy, color);
            self.set(r.x + r.w - 1, r.y + dy, color);
        }
    }

    /// Bresenham line; endpoints may lie off-canvas.
    pub fn line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            if x >= 0 && y >= 0 {
                self.set(x as usize, y as usize, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Padded (min, max) of the values; a flat series gets a unit band.
pub fn value_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    if (hi - lo).abs() < 1e-12 {
        return Some((lo - 0.5, hi + 0.5));
    }
    let pad = 0.05 * (hi - lo);
    Some((lo - pad, hi + pad))
}

/// Polyline of `(t, v)` points inside `area`, time on x.
pub fn plot_series(canvas: &mut Canvas, area: Rect, points: &[(f64, f64)], t_range: (f64, f64), v_range: (f64, f64), color: u32) {
    if area.w < 2 || area.h < 2 || points.is_empty() {
        return;
    }
    let t_span = (t_range.1 - t_range.0).max(1e-12);
    let v_span = (v_range.1 - v_range.0).max(1e-12);
    let to_px = |(t, v): (f64, f64)| {
        let fx = ((t - t_range.0) / t_span).clamp(0.0, 1.0);
        let fy = ((v - v_range.0) / v_span).clamp(0.0, 1.0);
        let x = area.x as f64 + fx * (area.w - 1) as f64;
        let y = area.y as f64 + (1.0 - fy) * (area.h - 1) as f64;
        (x.round() as isize, y.round() as isize)
    };
    let mut prev: Option<(isize, isize)> = None;
    for &p in points {
        if !p.1.is_finite() {
            prev = None;
            continue;
        }
        let cur = to_px(p);
        match prev {
            Some((px, py)) => canvas.line(px, py, cur.0, cur.1, color),
            None => canvas.set(cur.0 as usize, cur.1 as usize, color),
        }
        prev = Some(cur);
    }
}

/// Stacked lanes, one per readout series (up to `MAX_SERIES`), covering the
/// last `span` simulated seconds of history.
pub fn render_history<T>(canvas: &mut Canvas, area: Rect, history: &HistoryBuffer<T>, span: f64)
where
    T: Timestamped + Readout,
{
    let window = history.window_last(span);
    let Some(last) = window.last() else {
        draw_text(canvas, area.x + 4, area.y + 4, "no data - press space", colors::LABEL);
        return;
    };
    let names = last.readout();
    let lanes = names.len().min(MAX_SERIES);
    if lanes == 0 || area.h < lanes * (FONT_HEIGHT + 4) {
        return;
    }
    let t_end = last.t();
    let t_start = window.first().map(|s| s.t()).unwrap_or(t_end);
    let rows: Vec<Vec<(&'static str, f64)>> = window.iter().map(|s| s.readout()).collect();
    let lane_h = area.h / lanes;

    for (k, &(name, current)) in names.iter().take(lanes).enumerate() {
        let lane = Rect {
            x: area.x,
            y: area.y + k * lane_h,
            w: area.w,
            h: lane_h,
        };
        canvas.rect_border(lane, colors::AXIS);
        let points: Vec<(f64, f64)> = window
            .iter()
            .zip(&rows)
            .filter_map(|(s, r)| r.get(k).map(|&(_, v)| (s.t(), v)))
            .collect();
        let Some(v_range) = value_range(points.iter().map(|p| p.1)) else {
            continue;
        };
        let inner = Rect {
            x: lane.x + 1,
            y: lane.y + FONT_HEIGHT + 4,
            w: lane.w.saturating_sub(2),
            h: lane.h.saturating_sub(FONT_HEIGHT + 5),
        };
        let color = colors::SERIES[k % colors::SERIES.len()];
        plot_series(canvas, inner, &points, (t_start, t_end), v_range, color);
        let label = format!("{name} {}", format_value(current));
        draw_text(canvas, lane.x + 4, lane.y + 3, &label, color);
    }
}

/// Compact number formatting for labels.
pub fn format_value(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e5).contains(&a) {
        format!("{v:.3e}")
    } else if a >= 100.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.4}")
    }
}

/// Status text in a bar along the bottom edge.
pub fn render_status(canvas: &mut Canvas, text: &str) {
    let (w, h) = (canvas.width(), canvas.height());
    if h < STATUS_BAR_HEIGHT {
        return;
    }
    let y0 = h - STATUS_BAR_HEIGHT;
    canvas.fill_rect(Rect { x: 0, y: y0, w, h: STATUS_BAR_HEIGHT }, colors::STATUS_BG);
    for x in 0..w {
        canvas.set(x, y0, colors::AXIS);
    }
    draw_text(canvas, 4, y0 + STATUS_PAD_TOP, text, colors::STATUS_TEXT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Wave {
        t: f64,
        v: f64,
    }

    impl Timestamped for Wave {
        fn t(&self) -> f64 {
            self.t
        }
    }

    impl Readout for Wave {
        fn readout(&self) -> Vec<(&'static str, f64)> {
            vec![("v", self.v), ("twice", 2.0 * self.v)]
        }
    }

    #[test]
    fn test_set_out_of_bounds_is_ignored() {
        let mut c = Canvas::new(4, 3);
        c.set(4, 0, 1);
        c.set(0, 3, 1);
        assert!(c.pixels().iter().all(|&p| p == 0));
        assert_eq!(c.get(9, 9), None);
    }

    #[test]
    fn test_line_hits_endpoints() {
        let mut c = Canvas::new(10, 10);
        c.line(1, 1, 8, 5, 0xFF);
        assert_eq!(c.get(1, 1), Some(0xFF));
        assert_eq!(c.get(8, 5), Some(0xFF));
        // Off-canvas start still draws the visible part.
        c.line(-5, 9, 9, 9, 0xAA);
        assert_eq!(c.get(0, 9), Some(0xAA));
        assert_eq!(c.get(9, 9), Some(0xAA));
    }

    #[test]
    fn test_value_range() {
        assert_eq!(value_range(Vec::new()), None);
        assert_eq!(value_range([f64::NAN]), None);
        assert_eq!(value_range([2.0, 2.0]), Some((1.5, 2.5)));
        let (lo, hi) = value_range([0.0, 10.0]).unwrap();
        assert!(lo < 0.0 && hi > 10.0);
    }

    #[test]
    fn test_darken_and_scale() {
        assert_eq!(scale_rgb(rgb(200, 100, 50), 0.5), rgb(100, 50, 25));
        let mut c = Canvas::new(2, 2);
        c.clear(rgb(100, 100, 100));
        c.darken_rect(Rect { x: 0, y: 0, w: 1, h: 1 }, 0.0);
        assert_eq!(c.get(0, 0), Some(0));
        assert_eq!(c.get(1, 1), Some(rgb(100, 100, 100)));
    }

    #[test]
    fn test_render_history_draws_each_lane() {
        let mut history = HistoryBuffer::new(100);
        for i in 0..50 {
            let t = i as f64 * 0.1;
            history.push(Wave { t, v: t.sin() });
        }
        let mut c = Canvas::new(200, 120);
        render_history(&mut c, Rect { x: 0, y: 0, w: 200, h: 120 }, &history, 10.0);
        for (k, color) in colors::SERIES.iter().take(2).enumerate() {
            let lane = 60 * k..60 * (k + 1);
            let found = lane.clone().any(|y| (0..200).any(|x| c.get(x, y) == Some(*color)));
            assert!(found, "lane {k} should contain its series colour");
        }
    }

    #[test]
    fn test_render_history_empty_shows_hint() {
        let history: HistoryBuffer<Wave> = HistoryBuffer::new(10);
        let mut c = Canvas::new(200, 50);
        render_history(&mut c, Rect { x: 0, y: 0, w: 200, h: 50 }, &history, 5.0);
        assert!(c.pixels().iter().any(|&p| p == colors::LABEL));
    }

    #[test]
    fn test_render_status_separator() {
        let mut c = Canvas::new(50, 40);
        render_status(&mut c, "ok");
        assert_eq!(c.get(0, 40 - STATUS_BAR_HEIGHT), Some(colors::AXIS));
        assert_eq!(c.get(49, 39), Some(colors::STATUS_BG));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0000");
        assert_eq!(format_value(1.5), "1.5000");
        assert_eq!(format_value(250.0), "250.0");
        assert!(format_value(1e-6).contains('e'));
    }
}
