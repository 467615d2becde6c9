use crate::bounds::{bounds_of, Bounds};
use crate::config::RenderConfig;
use crate::coordinator::Snapshot;
use crate::selection::CameraCommand;
use crate::theme::{DEFAULT_CENTER, DEFAULT_ZOOM};
use crate::types::LatLng;
use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use tracing::info;

// Constants for Web Mercator
const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128_78;
/// Smallest extent, in degrees, a fitted view is widened to.
const MIN_SPAN: f64 = 0.01;

/// Maps geographic coordinates onto the pixel grid of a fixed-size image.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    origin_x: f64,
    origin_y: f64,
    scale: f64,
}

impl Projection {
    /// Fits `bounds` into `width` x `height`, preserving aspect ratio and
    /// centring the slack.
    pub fn fit(bounds: &Bounds, width: u32, height: u32) -> Self {
        let (x0, y0) = lat_lon_to_world(bounds.max_lat, bounds.min_lng);
        let (x1, y1) = lat_lon_to_world(bounds.min_lat, bounds.max_lng);
        let world_w = (x1 - x0).max(f64::EPSILON);
        let world_h = (y1 - y0).max(f64::EPSILON);
        let scale = (width as f64 / world_w).min(height as f64 / world_h);

        Self {
            origin_x: x0 - (width as f64 / scale - world_w) / 2.0,
            origin_y: y0 - (height as f64 / scale - world_h) / 2.0,
            scale,
        }
    }

    pub fn to_pixel(&self, p: LatLng) -> (f64, f64) {
        let (x, y) = lat_lon_to_world(p.lat, p.lng);
        ((x - self.origin_x) * self.scale, (y - self.origin_y) * self.scale)
    }
}

/// Draws the map as it currently looks: background, district outlines and
/// school markers, framed by the active camera command.
pub fn render_snapshot(snapshot: &Snapshot, config: &RenderConfig) -> RgbaImage {
    let view = &snapshot.view.map;
    let bounds = frame(snapshot, config.width).pad(config.padding, MIN_SPAN);
    let projection = Projection::fit(&bounds, config.width, config.height);

    let mut img: RgbaImage =
        ImageBuffer::from_pixel(config.width, config.height, hex_to_rgba(view.background));

    let geometries: HashMap<&str, _> = snapshot
        .dataset
        .districts
        .iter()
        .map(|d| (d.id.as_str(), &d.geometry))
        .collect();

    // Selected outlines go last so neighbours never paint over them.
    let mut layers: Vec<_> = view.districts.iter().collect();
    layers.sort_by_key(|layer| layer.selected);
    for layer in layers {
        let Some(geometry) = geometries.get(layer.id.as_str()) else {
            continue;
        };
        let color = hex_to_rgba(layer.style.color);
        let weight = layer.style.weight.round().max(1.0) as i32;
        for polygon in geometry.iter() {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                let points: Vec<(f32, f32)> = ring
                    .coords()
                    .map(|c| {
                        let (x, y) = projection.to_pixel(LatLng::new(c.y, c.x));
                        (x as f32, y as f32)
                    })
                    .collect();
                for pair in points.windows(2) {
                    // Thick strokes are the same segment repeated on a small offset grid.
                    for ox in 0..weight {
                        for oy in 0..weight {
                            let (dx, dy) = (ox as f32, oy as f32);
                            draw_line_segment_mut(
                                &mut img,
                                (pair[0].0 + dx, pair[0].1 + dy),
                                (pair[1].0 + dx, pair[1].1 + dy),
                                color,
                            );
                        }
                    }
                }
            }
        }
    }

    for marker in &view.schools {
        let (x, y) = projection.to_pixel(marker.location);
        let center = (x.round() as i32, y.round() as i32);
        let radius = marker.style.radius.round() as i32;
        draw_filled_circle_mut(&mut img, center, radius, hex_to_rgba(marker.style.fill_color));
        draw_hollow_circle_mut(&mut img, center, radius, hex_to_rgba(marker.style.color));
    }

    img
}

pub fn save_snapshot(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    img.save(path)
        .with_context(|| format!("Failed to save snapshot {:?}", path))?;
    info!("Saved {}x{} snapshot to {:?}", img.width(), img.height(), path);
    Ok(())
}

/// Geographic extent the camera is looking at.
fn frame(snapshot: &Snapshot, width: u32) -> Bounds {
    match &snapshot.view.map.camera {
        Some(CameraCommand::FitBounds { bounds }) => *bounds,
        Some(CameraCommand::FlyTo { target, zoom }) => around(*target, *zoom, width),
        None => bounds_of(&snapshot.dataset.districts)
            .unwrap_or_else(|| around(DEFAULT_CENTER, DEFAULT_ZOOM, width)),
    }
}

/// Square extent covering `width` pixels at `zoom` around `center`.
fn around(center: LatLng, zoom: f64, width: u32) -> Bounds {
    let span = 360.0 * width as f64 / (TILE_SIZE * 2.0_f64.powf(zoom));
    Bounds::from_point(center).pad(0.0, span)
}

/// Accepts `#rrggbb` and the `#rgb` shorthand; anything unparsable is black.
fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let width = if hex.len() == 3 { 1 } else { 2 };
    let channel = |i: usize| {
        hex.get(i * width..(i + 1) * width)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|v| if width == 1 { v * 17 } else { v })
            .unwrap_or(0)
    };
    Rgba([channel(0), channel(1), channel(2), 255])
}

// Coordinate conversions: Web Mercator in world units, (0, 0) top-left, (1, 1) bottom-right.
fn lat_lon_to_world(lat: f64, lon: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0;
    (x, y)
}
