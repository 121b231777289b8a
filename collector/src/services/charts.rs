use crate::error::{Result, StatsError};
use crate::models::MetricSample;
use image::{Rgb, RgbImage};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([120, 120, 120]);
const LINE: Rgb<u8> = Rgb([204, 0, 0]);

/// Writes one line chart per metric into `dir`. Needs at least two samples.
pub fn render_charts(samples: &[MetricSample], dir: &Path) -> Result<Vec<PathBuf>> {
    if samples.len() < 2 {
        info!("Not enough history for charts ({} samples)", samples.len());
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir).map_err(|e| StatsError::io(dir, e))?;

    let series: [(&str, Vec<u64>); 3] = [
        ("subscribers", samples.iter().map(|s| s.subscribers).collect()),
        ("views", samples.iter().map(|s| s.views).collect()),
        ("videos", samples.iter().map(|s| s.videos).collect()),
    ];

    let mut written = Vec::with_capacity(series.len());
    for (name, values) in &series {
        let path = dir.join(format!("{name}.png"));
        draw_chart(values).save(&path)?;
        info!("Chart written to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn draw_chart(values: &[u64]) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let bottom = HEIGHT - MARGIN;
    let right = WIDTH - MARGIN;

    draw_line(&mut img, (MARGIN, MARGIN), (MARGIN, bottom), AXIS);
    draw_line(&mut img, (MARGIN, bottom), (right, bottom), AXIS);

    let points: Vec<(u32, u32)> = plot_points(values);
    for pair in points.windows(2) {
        draw_line(&mut img, pair[0], pair[1], LINE);
    }
    for &(x, y) in &points {
        for dx in 0..3 {
            for dy in 0..3 {
                put(&mut img, (x + dx).saturating_sub(1), (y + dy).saturating_sub(1), LINE);
            }
        }
    }
    img
}

/// Maps values onto the plotting area; a flat series sits in the middle.
fn plot_points(values: &[u64]) -> Vec<(u32, u32)> {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    let span_x = (WIDTH - 2 * MARGIN) as f64;
    let span_y = (HEIGHT - 2 * MARGIN) as f64;
    let steps = values.len().saturating_sub(1).max(1) as f64;

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = MARGIN as f64 + span_x * i as f64 / steps;
            let fraction = if max == min {
                0.5
            } else {
                (v - min) as f64 / (max - min) as f64
            };
            let y = (HEIGHT - MARGIN) as f64 - span_y * fraction;
            (x.round() as u32, y.round() as u32)
        })
        .collect()
}

fn draw_line(img: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Rgb<u8>) {
    let (mut x, mut y) = (from.0 as i64, from.1 as i64);
    let (x1, y1) = (to.0 as i64, to.1 as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x as u32, y as u32, color);
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

fn put(img: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}
