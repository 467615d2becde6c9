use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category key -> number of schools. Key order carries no meaning.
pub type CategoryCount = HashMap<String, usize>;

/// Key used for schools whose category is missing or empty.
pub const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// geo works in (x = lng, y = lat).
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

/// Optional figures the backend attaches to a school record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolDetails {
    pub num_students: Option<u32>,
    pub num_teachers: Option<u32>,
    pub num_classrooms: Option<u32>,
    pub establishment_year: Option<i32>,
    pub has_library: Option<bool>,
    pub has_computer_lab: Option<bool>,
    pub has_playground: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct School {
    pub id: String,
    pub name: String,
    /// Raw category string as served; see [`School::category_key`].
    pub category: Option<String>,
    pub district_name: Option<String>,
    pub province_name: Option<String>,
    pub gender: Option<String>,
    pub location: LatLng,
    #[serde(flatten)]
    pub details: SchoolDetails,
}

impl School {
    /// The aggregation key: the category if present and non-empty, else `"unknown"`.
    pub fn category_key(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => UNKNOWN_CATEGORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct District {
    pub id: String,
    pub name: String,
    pub province_name: Option<String>,
    // Polygons are normalised to a single-member MultiPolygon on load.
    pub geometry: MultiPolygon<f64>,
}

/// School level used for styling and for the create form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Primary,
    Secondary,
    HigherSecondary,
    University,
    #[serde(other)]
    #[value(skip)]
    Other,
}

impl Category {
    /// Categories a user can pick when creating a school.
    pub const SELECTABLE: [Category; 4] = [
        Category::Primary,
        Category::Secondary,
        Category::HigherSecondary,
        Category::University,
    ];

    pub fn from_key(key: &str) -> Self {
        match key {
            "primary" => Category::Primary,
            "secondary" => Category::Secondary,
            "higher_secondary" => Category::HigherSecondary,
            "university" => Category::University,
            _ => Category::Other,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Primary => "primary",
            Category::Secondary => "secondary",
            Category::HigherSecondary => "higher_secondary",
            Category::University => "university",
            Category::Other => "other",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    Street,
    Satellite,
    #[default]
    Dark,
}

impl MapStyle {
    /// Dark and satellite basemaps share the heavier district fill.
    pub fn is_dark_family(self) -> bool {
        matches!(self, MapStyle::Dark | MapStyle::Satellite)
    }
}

/// Figures returned by `GET /districts/{id}/stats/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictStats {
    #[serde(alias = "total_schools", default)]
    pub total: usize,
    #[serde(rename = "byCategory", alias = "schools_by_category", default)]
    pub by_category: CategoryCount,
}

/// Body of `POST /schools/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSchool {
    pub name: String,
    pub category: Category,
    pub longitude: f64,
    pub latitude: f64,
}

impl NewSchool {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}
