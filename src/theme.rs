use crate::types::{Category, LatLng, MapStyle};
use serde::Serialize;

pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 30.3753,
    lng: 69.3451,
};
pub const DEFAULT_ZOOM: f64 = 6.0;
pub const FLY_TO_ZOOM: f64 = 15.0;

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Primary => "Primary",
            Category::Secondary => "Secondary",
            Category::HigherSecondary => "Higher Secondary",
            Category::University => "University",
            Category::Other => "Other",
        }
    }

    /// Hex color used for markers, legend and charts.
    pub fn color(self) -> &'static str {
        match self {
            Category::Primary => "#4facfe",
            Category::Secondary => "#f093fb",
            Category::HigherSecondary => "#ffd93d",
            Category::University => "#f5576c",
            Category::Other => "#cbd5e0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: &'static str,
    pub attribution: &'static str,
}

impl MapStyle {
    pub fn tile_layer(self) -> TileLayer {
        match self {
            MapStyle::Satellite => TileLayer {
                url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
                attribution: "Tiles &copy; Esri &mdash; Source: Esri, i-cubed, USDA, USGS, AEX, GeoEye, Getmapping, Aerogrid, IGN, IGP, UPR-EGP, and the GIS User Community",
            },
            MapStyle::Dark => TileLayer {
                url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>",
            },
            MapStyle::Street => TileLayer {
                url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors",
            },
        }
    }

    /// Map container background behind the tiles.
    pub fn background(self) -> &'static str {
        match self {
            MapStyle::Dark => "#0a0e27",
            _ => "#e2e8f0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub dash_array: &'static str,
}

pub const DISTRICT_STROKE: &str = "#667eea";
pub const DISTRICT_SELECTED_STROKE: &str = "#00f2fe";

pub fn district_style(style: MapStyle, selected: bool) -> DistrictStyle {
    let dark = style.is_dark_family();
    if selected {
        return DistrictStyle {
            fill_color: "#667eea",
            fill_opacity: 0.6,
            color: DISTRICT_SELECTED_STROKE,
            weight: 3.0,
            opacity: 1.0,
            dash_array: "3",
        };
    }
    DistrictStyle {
        fill_color: if dark {
            "rgba(102, 126, 234, 0.1)"
        } else {
            "rgba(102, 126, 234, 0.2)"
        },
        fill_opacity: if dark { 0.2 } else { 0.1 },
        color: DISTRICT_STROKE,
        weight: 1.5,
        opacity: 1.0,
        dash_array: "3",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill_color: &'static str,
    pub color: &'static str,
    pub weight: f64,
    pub fill_opacity: f64,
}

pub fn school_marker(category_key: &str) -> MarkerStyle {
    MarkerStyle {
        radius: 6.0,
        fill_color: Category::from_key(category_key).color(),
        color: "#fff",
        weight: 1.0,
        fill_opacity: 0.8,
    }
}

/// `"higher_secondary"` -> `"Higher Secondary"`.
pub fn title_case(key: &str) -> String {
    key.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display label for a raw category key; unknown keys keep their own name.
pub fn category_label(key: &str) -> String {
    match Category::from_key(key) {
        Category::Other => title_case(key),
        known => known.label().to_string(),
    }
}
