//! Frame annotation: per-spot status boxes plus a summary panel.
//!
//! Annotation only depends on the frame, the spot list and the current status
//! vector, so it runs on every output frame whether or not that frame was a
//! sample.

mod glyphs;

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::Serialize;

use crate::classify::SpotStatus;
use crate::spot::ParkingSpot;

const PANEL_ORIGIN: (i32, i32) = (50, 20);
const PANEL_HEIGHT: u32 = 60;
const PANEL_PADDING: u32 = 10;
const BITMAP_SCALE: u32 = 4;
const FONT_PX: f32 = 32.0;

/// Free / occupied / total counts for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub free: usize,
    pub occupied: usize,
    pub total: usize,
}

impl Summary {
    pub fn from_statuses(statuses: &[SpotStatus]) -> Self {
        let free = statuses.iter().filter(|s| s.is_empty()).count();
        Self {
            free,
            occupied: statuses.len() - free,
            total: statuses.len(),
        }
    }

    pub fn label(&self) -> String {
        format!(
            "Free: {} | Occupied: {} | Total: {}",
            self.free, self.occupied, self.total
        )
    }
}

/// Colors and geometry of the overlay.
#[derive(Clone, Debug)]
pub struct OverlayStyle {
    pub empty_color: Rgb<u8>,
    pub occupied_color: Rgb<u8>,
    pub thickness: u32,
    pub panel_color: Rgb<u8>,
    pub text_color: Rgb<u8>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            empty_color: Rgb([0, 255, 0]),
            occupied_color: Rgb([255, 0, 0]),
            thickness: 2,
            panel_color: Rgb([0, 0, 0]),
            text_color: Rgb([255, 255, 255]),
        }
    }
}

#[derive(Debug)]
pub struct Annotator {
    style: OverlayStyle,
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style, font: None }
    }

    /// Use a TrueType/OpenType font for the panel text instead of the
    /// built-in bitmap glyphs.
    pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("invalid font {}: {}", path.display(), e))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Draw status boxes and the summary panel onto `frame`.
    ///
    /// `statuses` is indexed in parallel with `spots`.
    pub fn annotate(
        &self,
        frame: &mut RgbImage,
        spots: &[ParkingSpot],
        statuses: &[SpotStatus],
    ) -> Summary {
        debug_assert_eq!(spots.len(), statuses.len());
        for (spot, status) in spots.iter().zip(statuses) {
            let color = match status {
                SpotStatus::Empty => self.style.empty_color,
                SpotStatus::Occupied => self.style.occupied_color,
            };
            self.draw_box(frame, spot, color);
        }

        let summary = Summary::from_statuses(statuses);
        self.draw_panel(frame, &summary.label());
        summary
    }

    fn draw_box(&self, frame: &mut RgbImage, spot: &ParkingSpot, color: Rgb<u8>) {
        for t in 0..self.style.thickness {
            let (w, h) = (
                spot.width.saturating_sub(2 * t),
                spot.height.saturating_sub(2 * t),
            );
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at((spot.x + t) as i32, (spot.y + t) as i32).of_size(w, h);
            draw_hollow_rect_mut(frame, rect, color);
        }
    }

    fn draw_panel(&self, frame: &mut RgbImage, text: &str) {
        let (x, y) = PANEL_ORIGIN;
        let (text_w, text_h) = match &self.font {
            Some(font) => {
                let (w, h) = imageproc::drawing::text_size(PxScale::from(FONT_PX), font, text);
                (w, h)
            }
            None => glyphs::text_size(text, BITMAP_SCALE),
        };

        let panel = Rect::at(x, y).of_size(text_w + 2 * PANEL_PADDING, PANEL_HEIGHT);
        draw_filled_rect_mut(frame, panel, self.style.panel_color);

        let text_x = x + PANEL_PADDING as i32;
        let text_y = y + (PANEL_HEIGHT.saturating_sub(text_h) / 2) as i32;
        match &self.font {
            Some(font) => draw_text_mut(
                frame,
                self.style.text_color,
                text_x,
                text_y,
                PxScale::from(FONT_PX),
                font,
                text,
            ),
            None => glyphs::draw_text(
                frame,
                text,
                text_x,
                text_y,
                BITMAP_SCALE,
                self.style.text_color,
            ),
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_add_up() {
        use SpotStatus::*;
        for statuses in [
            vec![],
            vec![Empty],
            vec![Occupied, Occupied],
            vec![Empty, Occupied, Empty, Occupied, Occupied],
        ] {
            let s = Summary::from_statuses(&statuses);
            assert_eq!(s.free + s.occupied, s.total);
            assert_eq!(s.total, statuses.len());
        }
    }

    #[test]
    fn label_matches_panel_format() {
        let s = Summary {
            free: 3,
            occupied: 2,
            total: 5,
        };
        assert_eq!(s.label(), "Free: 3 | Occupied: 2 | Total: 5");
    }

    #[test]
    fn boxes_are_colored_by_status() {
        let mut frame = RgbImage::new(200, 200);
        let spots = [
            ParkingSpot::new(10, 120, 20, 20),
            ParkingSpot::new(50, 120, 20, 20),
        ];
        let statuses = [SpotStatus::Empty, SpotStatus::Occupied];

        let summary = Annotator::default().annotate(&mut frame, &spots, &statuses);

        assert_eq!(frame.get_pixel(10, 120), &Rgb([0, 255, 0]));
        assert_eq!(frame.get_pixel(11, 121), &Rgb([0, 255, 0]));
        assert_eq!(frame.get_pixel(20, 130), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(69, 139), &Rgb([255, 0, 0]));
        assert_eq!(
            summary,
            Summary {
                free: 1,
                occupied: 1,
                total: 2
            }
        );
    }

    #[test]
    fn panel_is_drawn_at_fixed_position() {
        let mut frame = RgbImage::from_pixel(400, 120, Rgb([90, 90, 90]));
        Annotator::default().annotate(&mut frame, &[], &[]);

        assert_eq!(frame.get_pixel(51, 21), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(10, 10), &Rgb([90, 90, 90]));
        let lit = (20..80)
            .flat_map(|y| (50..400).map(move |x| (x, y)))
            .any(|(x, y)| frame.get_pixel(x, y) == &Rgb([255, 255, 255]));
        assert!(lit);
    }

    #[test]
    fn tiny_frames_are_clipped() {
        let mut frame = RgbImage::new(8, 8);
        let spots = [ParkingSpot::new(0, 0, 1, 1)];
        Annotator::default().annotate(&mut frame, &spots, &[SpotStatus::Occupied]);
        assert_eq!(frame.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(Annotator::default()
            .with_font_file("/nonexistent/font.ttf")
            .is_err());
    }
}
