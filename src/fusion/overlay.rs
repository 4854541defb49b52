//! Score panel drawn onto outgoing frames.

use image::Rgb;

use crate::models::{Channel, FusedMetrics};
use crate::perception::Frame;

const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
const RED: Rgb<u8> = Rgb([220, 0, 0]);
const PANEL: Rgb<u8> = Rgb([32, 32, 32]);
const TRACK: Rgb<u8> = Rgb([80, 80, 80]);
const PAUSED: Rgb<u8> = Rgb([255, 215, 0]);

const MARGIN: u32 = 8;
const BAR_WIDTH: u32 = 100;
const BAR_HEIGHT: u32 = 8;
const BAR_GAP: u32 = 4;
const INDICATOR: u32 = 12;

pub fn score_color(score: f64) -> Rgb<u8> {
    if score > 70.0 {
        GREEN
    } else if score > 50.0 {
        ORANGE
    } else {
        RED
    }
}

fn fill_rect(frame: &mut Frame, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(w).min(frame.width());
    let y_end = y.saturating_add(h).min(frame.height());
    for py in y.min(y_end)..y_end {
        for px in x.min(x_end)..x_end {
            frame.put_pixel(px, py, color);
        }
    }
}

/// Draw one bar per channel plus the overall score in the top-left corner
/// and a tracking indicator in the top-right corner. Bars are clipped to
/// the frame.
pub fn annotate(frame: &mut Frame, metrics: &FusedMetrics, tracking: bool) {
    let rows: Vec<f64> = Channel::ALL
        .iter()
        .map(|c| metrics.scores[*c])
        .chain(std::iter::once(metrics.overall))
        .collect();

    let panel_h = rows.len() as u32 * (BAR_HEIGHT + BAR_GAP) + BAR_GAP;
    fill_rect(frame, MARGIN, MARGIN, BAR_WIDTH + 2 * BAR_GAP, panel_h, PANEL);

    for (row, score) in rows.iter().enumerate() {
        let y = MARGIN + BAR_GAP + row as u32 * (BAR_HEIGHT + BAR_GAP);
        let x = MARGIN + BAR_GAP;
        let filled = (score.clamp(0.0, 100.0) / 100.0 * BAR_WIDTH as f64).round() as u32;
        fill_rect(frame, x, y, BAR_WIDTH, BAR_HEIGHT, TRACK);
        fill_rect(frame, x, y, filled, BAR_HEIGHT, score_color(*score));
    }

    let indicator = if tracking { GREEN } else { PAUSED };
    let x = frame.width().saturating_sub(MARGIN + INDICATOR);
    fill_rect(frame, x, MARGIN, INDICATOR, INDICATOR, indicator);
}
