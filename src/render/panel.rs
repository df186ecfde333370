use super::{draw_text, draw_text_sized, Canvas, Rect, FONT_HEIGHT};
use crate::params::{ChangePolicy, ParamDef, ParamKind, ParamSet};

const GAUGE_CHARS: usize = 8;

mod palette {
    pub const BORDER: u32 = 0x44_44_44;
    pub const HEADER: u32 = 0x00_BB_BB;
    pub const LABEL_NORMAL: u32 = 0x88_88_88;
    pub const LABEL_SELECTED: u32 = 0xFF_FF_FF;
    pub const VALUE: u32 = 0xCC_CC_CC;
    pub const DESC: u32 = 0xAA_AA_AA;
    pub const HINT: u32 = 0x44_88_88;
    pub const CURSOR: u32 = 0x00_FF_FF;
    pub const RESET_MARK: u32 = 0xFF_66_44;
    pub const GAUGE_EMPTY: u32 = 0x22_22_22;
}

/// Parameter panel selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelState {
    pub visible: bool,
    pub selected: usize,
}

impl PanelState {
    pub fn new() -> Self {
        Self {
            visible: true,
            selected: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Move the cursor, wrapping over `count` rows.
    pub fn navigate(&mut self, delta: isize, count: usize) {
        if count == 0 {
            self.selected = 0;
            return;
        }
        self.selected = ((self.selected as isize + delta).rem_euclid(count as isize)) as usize;
    }

    pub fn selected_def(&self, params: &ParamSet) -> Option<&'static ParamDef> {
        params.defs().get(self.selected)
    }
}

/// Text shown for a value, by parameter kind.
pub fn format_param(def: &ParamDef, value: f64) -> String {
    match def.kind {
        ParamKind::Flag => (if value >= 0.5 { "on" } else { "off" }).to_string(),
        ParamKind::Choice => def
            .options
            .get(value.round() as usize)
            .copied()
            .unwrap_or("?")
            .to_string(),
        ParamKind::Stepped if def.step >= 1.0 => format!("{value:.0}"),
        _ if def.step >= 0.1 => format!("{value:.2}"),
        _ if def.step >= 0.001 => format!("{value:.3}"),
        _ => format!("{value:.4}"),
    }
}

fn draw_gauge(canvas: &mut Canvas, x: usize, y: usize, ratio: f64, width: usize, height: usize) {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    for dy in 0..height {
        for dx in 0..width {
            let color = if dx < filled {
                let t = dx as f64 / width as f64;
                let c = (0x55 as f64 + t * (0xCC - 0x55) as f64) as u32;
                c << 8 | c
            } else {
                palette::GAUGE_EMPTY
            };
            canvas.set(x + dx, y + dy, color);
        }
    }
}

/// Draw the parameter panel in the top-right corner of `area`.
pub fn render_panel(canvas: &mut Canvas, area: Rect, state: &PanelState, title: &str, params: &ParamSet) {
    if !state.visible {
        return;
    }
    let (cw, ch) = (7, 9);
    let sc = cw + cw / 5 + 1;
    let row_h = ch + 4;
    let pad = 8;
    let defs = params.defs();

    let panel_w = (34 * sc + 2 * pad).min(area.w.saturating_sub(4));
    let panel_h = (pad + row_h + 4 + defs.len() * row_h + 6 + row_h + FONT_HEIGHT + 2 + pad).min(area.h.saturating_sub(4));
    let panel = Rect {
        x: area.x + area.w.saturating_sub(panel_w + 2),
        y: area.y + 2,
        w: panel_w,
        h: panel_h,
    };
    canvas.darken_rect(panel, 0.25);
    canvas.rect_border(panel, palette::BORDER);

    let left = panel.x + pad;
    let mut cy = panel.y + pad;
    draw_text_sized(canvas, left, cy, title, palette::HEADER, cw, ch);
    cy += row_h + 4;

    for (i, (def, value)) in params.iter().enumerate() {
        let selected = i == state.selected;
        let mut cx = left;
        if selected {
            draw_text_sized(canvas, cx, cy, ">", palette::CURSOR, cw, ch);
        }
        cx += 2 * sc;
        let label_color = if selected { palette::LABEL_SELECTED } else { palette::LABEL_NORMAL };
        draw_text_sized(canvas, cx, cy, def.label, label_color, cw, ch);
        cx = left + 16 * sc;
        draw_gauge(canvas, cx, cy, def.fraction(value), GAUGE_CHARS * sc, ch);
        cx += GAUGE_CHARS * sc + sc;
        let mut text = format_param(def, value);
        if !def.unit.is_empty() {
            text.push(' ');
            text.push_str(def.unit);
        }
        draw_text(canvas, cx, cy + 1, &text, palette::VALUE);
        if def.policy == ChangePolicy::RequiresReset {
            draw_text(canvas, panel.x + panel.w.saturating_sub(pad + 6), cy + 1, "*", palette::RESET_MARK);
        }
        cy += row_h;
    }

    cy += 6;
    if let Some(def) = state.selected_def(params) {
        let desc = if def.desc.is_empty() { def.name } else { def.desc };
        draw_text(canvas, left, cy, desc, palette::DESC);
    }
    cy += row_h;
    draw_text(canvas, left, cy, "up/down select  left/right adjust  * resets", palette::HINT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Pendulum, Simulation};

    #[test]
    fn test_navigate_wraps() {
        let mut s = PanelState::new();
        s.navigate(-1, 4);
        assert_eq!(s.selected, 3);
        s.navigate(2, 4);
        assert_eq!(s.selected, 1);
        s.navigate(1, 0);
        assert_eq!(s.selected, 0);
    }

    #[test]
    fn test_format_param_by_kind() {
        let params = Pendulum::default_params();
        let kind = params.def("kind").unwrap();
        assert_eq!(format_param(kind, 1.0), "physical");
        let flag = params.def("large_angle").unwrap();
        assert_eq!(format_param(flag, 0.0), "off");
        let angle = params.def("angle").unwrap();
        assert_eq!(format_param(angle, 45.0), "45");
    }

    #[test]
    fn test_hidden_panel_draws_nothing() {
        let params = Pendulum::default_params();
        let mut canvas = Canvas::new(400, 300);
        let state = PanelState { visible: false, selected: 0 };
        render_panel(&mut canvas, Rect { x: 0, y: 0, w: 400, h: 300 }, &state, "pendulum", &params);
        assert!(canvas.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_panel_draws_border_and_cursor() {
        let params = Pendulum::default_params();
        let mut canvas = Canvas::new(640, 360);
        let state = PanelState::new();
        render_panel(&mut canvas, Rect { x: 0, y: 0, w: 640, h: 360 }, &state, "pendulum", &params);
        assert!(canvas.pixels().iter().any(|&p| p == palette::BORDER));
        assert!(canvas.pixels().iter().any(|&p| p == palette::CURSOR));
    }
}
