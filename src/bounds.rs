//! Fit-to-view rectangles for district geometries.

use crate::types::{District, LatLng};
use geo::{BoundingRect, MultiPolygon};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn from_point(p: LatLng) -> Self {
        Self {
            min_lat: p.lat,
            min_lng: p.lng,
            max_lat: p.lat,
            max_lng: p.lng,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        self.min_lat = self.min_lat.min(p.lat);
        self.min_lng = self.min_lng.min(p.lng);
        self.max_lat = self.max_lat.max(p.lat);
        self.max_lng = self.max_lng.max(p.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Grows every side by `ratio` of the span on that axis. A zero-area
    /// rectangle is first widened to `min_span` degrees so it stays drawable.
    pub fn pad(&self, ratio: f64, min_span: f64) -> Self {
        let lat_half = self.lat_span().max(min_span) / 2.0;
        let lng_half = self.lng_span().max(min_span) / 2.0;
        let center = self.center();
        let lat_pad = lat_half * 2.0 * ratio;
        let lng_pad = lng_half * 2.0 * ratio;
        Self {
            min_lat: center.lat - lat_half - lat_pad,
            min_lng: center.lng - lng_half - lng_pad,
            max_lat: center.lat + lat_half + lat_pad,
            max_lng: center.lng + lng_half + lng_pad,
        }
    }
}

/// Folds every vertex of every ring of every polygon. `None` when there are
/// no vertices at all (empty input or only degenerate geometries).
pub fn bounds_of<'a, I>(districts: I) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a District>,
{
    districts
        .into_iter()
        .filter_map(|d| geometry_bounds(&d.geometry))
        .reduce(|mut acc, b| {
            acc.extend(LatLng::new(b.min_lat, b.min_lng));
            acc.extend(LatLng::new(b.max_lat, b.max_lng));
            acc
        })
}

pub fn geometry_bounds(geometry: &MultiPolygon<f64>) -> Option<Bounds> {
    // geo coords are (x = lng, y = lat)
    geometry.bounding_rect().map(|r| Bounds {
        min_lat: r.min().y,
        min_lng: r.min().x,
        max_lat: r.max().y,
        max_lng: r.max().x,
    })
}
