// ============================================================
// Layer 6 - Loss Plotter
// ============================================================
// Renders the four loss series of a LossHistory into one PNG.
//
// Layout (1200 x 1200, four 600 x 600 panels):
//
//   ┌──────────────────┬──────────────────┐
//   │ epoch train loss │ epoch val loss   │
//   ├──────────────────┼──────────────────┤
//   │ batch train loss │ batch val loss   │
//   └──────────────────┴──────────────────┘
//
// Each panel gets a left and bottom axis, evenly spaced horizontal
// grid lines, and its series drawn as a polyline scaled to the
// series' own finite min/max. Non-finite values are skipped; a
// series with a single point is drawn as a dot.
//
// Drawing is done pixel by pixel on an image::RgbImage, lines use
// Bresenham's algorithm.
//
// Output: losses/losses_01.png, losses/losses_02.png, ...
//
// Reference: image crate documentation (ImageBuffer, save)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use image::{Rgb, RgbImage};

use crate::domain::loss_history::LossHistory;

pub const PLOT_SIZE: u32 = 1200;

const PANEL:      u32 = PLOT_SIZE / 2;
const MARGIN:     u32 = 50;
const GRID_LINES: u32 = 5;
const DOT_RADIUS: i64 = 4;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS:       Rgb<u8> = Rgb([0, 0, 0]);
const GRID:       Rgb<u8> = Rgb([220, 220, 220]);
const TRAIN:      Rgb<u8> = Rgb([31, 119, 180]);
const VAL:        Rgb<u8> = Rgb([255, 127, 14]);

/// Writes one loss plot per epoch into a directory.
pub struct LossPlotter {
    dir: PathBuf,
}

impl LossPlotter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<dir>/losses_<NN>.png` for a 1-indexed epoch number
    pub fn plot_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("losses_{epoch:02}.png"))
    }

    /// Draw all four series of `history` and save the plot for `epoch`.
    pub fn render(&self, history: &LossHistory, epoch: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create plot dir '{}'", self.dir.display()))?;

        let mut img = RgbImage::from_pixel(PLOT_SIZE, PLOT_SIZE, BACKGROUND);
        let panels: [(u32, u32, &[f64], Rgb<u8>); 4] = [
            (0,     0,     &history.train_epoch_loss,   TRAIN),
            (PANEL, 0,     &history.val_epoch_loss,     VAL),
            (0,     PANEL, &history.running_train_loss, TRAIN),
            (PANEL, PANEL, &history.running_val_loss,   VAL),
        ];
        for (x0, y0, series, color) in panels {
            draw_panel(&mut img, x0, y0, series, color);
        }

        let path = self.plot_path(epoch);
        img.save(&path)
            .with_context(|| format!("Cannot write loss plot '{}'", path.display()))?;

        tracing::debug!("Saved loss plot → '{}'", path.display());
        Ok(path)
    }
}

/// Plot area of the panel whose top-left corner is (x0, y0)
struct Frame {
    left:   u32,
    right:  u32,
    top:    u32,
    bottom: u32,
}

impl Frame {
    fn new(x0: u32, y0: u32) -> Self {
        Self {
            left:   x0 + MARGIN,
            right:  x0 + PANEL - MARGIN / 2,
            top:    y0 + MARGIN / 2,
            bottom: y0 + PANEL - MARGIN,
        }
    }

    fn width(&self) -> f64 {
        (self.right - self.left) as f64
    }

    fn height(&self) -> f64 {
        (self.bottom - self.top) as f64
    }
}

fn draw_panel(img: &mut RgbImage, x0: u32, y0: u32, series: &[f64], color: Rgb<u8>) {
    let frame = Frame::new(x0, y0);

    for i in 0..=GRID_LINES {
        let y = (frame.top + (frame.bottom - frame.top) * i / GRID_LINES) as i64;
        draw_line(img, (frame.left as i64, y), (frame.right as i64, y), GRID);
    }
    let (left, bottom) = (frame.left as i64, frame.bottom as i64);
    draw_line(img, (left, frame.top as i64), (left, bottom), AXIS);
    draw_line(img, (left, bottom), (frame.right as i64, bottom), AXIS);

    let points: Vec<(usize, f64)> = series
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .collect();
    if points.is_empty() {
        return;
    }

    let lo = points.iter().map(|&(_, v)| v).fold(f64::INFINITY, f64::min);
    let hi = points.iter().map(|&(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
    let last = series.len().saturating_sub(1);

    // Flat or single-point series sit on the middle of the axis
    let to_pixel = |index: usize, value: f64| -> (i64, i64) {
        let fx = if last > 0 { index as f64 / last as f64 } else { 0.5 };
        let fy = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
        let x = frame.left as f64 + fx * frame.width();
        let y = frame.bottom as f64 - fy * frame.height();
        (x.round() as i64, y.round() as i64)
    };

    let pixels: Vec<(i64, i64)> = points.iter().map(|&(i, v)| to_pixel(i, v)).collect();
    match pixels.as_slice() {
        [single] => draw_dot(img, *single, color),
        _ => {
            for pair in pixels.windows(2) {
                draw_line(img, pair[0], pair[1], color);
            }
        }
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line between two pixel positions, endpoints included.
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if (x, y) == to {
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

fn draw_dot(img: &mut RgbImage, center: (i64, i64), color: Rgb<u8>) {
    for dy in -DOT_RADIUS..=DOT_RADIUS {
        for dx in -DOT_RADIUS..=DOT_RADIUS {
            if dx * dx + dy * dy <= DOT_RADIUS * DOT_RADIUS {
                put(img, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}
