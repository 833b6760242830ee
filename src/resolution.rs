//! Resolution Selector - Export DPI Under a Pixel Cap

use crate::geom::Rect;

/// Below this the pixel cap becomes advisory: quality wins.
pub const DPI_FLOOR: u32 = 150;

/// Points-to-pixels at a given density (72 pt per inch).
pub fn pts_to_px(pt: f64, dpi: u32) -> f64 {
    pt * dpi as f64 / 72.0
}

/// Picks the export DPI for `rect`: `target_dpi` when the wanted pixel
/// dimensions fit under `max_px`, otherwise scaled down so the larger
/// axis lands on the cap, floored at [`DPI_FLOOR`]. Deterministic, no
/// side effects.
pub fn dpi_for_rect(rect: &Rect, target_dpi: u32, max_px: u32) -> u32 {
    let wanted_w = pts_to_px(rect.width(), target_dpi);
    let wanted_h = pts_to_px(rect.height(), target_dpi);
    let cap = max_px as f64;

    if wanted_w <= cap && wanted_h <= cap {
        return target_dpi;
    }

    let scale_down = wanted_w.max(wanted_h) / cap;
    let dpi = (target_dpi as f64 / scale_down).floor() as u32;
    dpi.max(DPI_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_cap_keeps_target() {
        // 300x150pt at 600dpi wants 2500x1250px, both under 8192.
        let rect = Rect::new(0.0, 150.0, 300.0, 0.0);
        assert_eq!(dpi_for_rect(&rect, 600, 8192), 600);
    }

    #[test]
    fn over_cap_scales_down() {
        // 1200x600pt at 600dpi wants 10000x5000px; scale-down
        // 10000/8192 gives floor(600/1.2207...) = 491.
        let rect = Rect::new(0.0, 600.0, 1200.0, 0.0);
        assert_eq!(dpi_for_rect(&rect, 600, 8192), 491);
    }

    #[test]
    fn floor_clamps_extreme_scale_down() {
        // Huge sheet: computed dpi would drop below 150.
        let rect = Rect::new(0.0, 7200.0, 72000.0, 0.0);
        assert_eq!(dpi_for_rect(&rect, 600, 8192), DPI_FLOOR);
    }

    #[test]
    fn pts_to_px_at_72_is_identity() {
        assert_eq!(pts_to_px(300.0, 72), 300.0);
        assert_eq!(pts_to_px(300.0, 144), 600.0);
    }
}
