use crate::error::{BackendError, Result};
use crate::types::{District, LatLng, School, SchoolDetails};
use geo::MultiPolygon;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

pub fn load_schools(path: &Path) -> Result<Vec<School>> {
    parse_schools(read_geojson(path)?)
}

pub fn load_districts(path: &Path) -> Result<Vec<District>> {
    parse_districts(read_geojson(path)?)
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    info!("Loading GeoJSON from {:?}", path);
    let file = File::open(path)?;
    // Loads the whole file into memory.
    Ok(GeoJson::from_reader(BufReader::new(file))?)
}

fn into_features(geojson: GeoJson) -> Result<Vec<Feature>> {
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        GeoJson::Feature(_) => Err(BackendError::UnexpectedShape {
            expected: "a FeatureCollection",
            found: "a Feature".to_string(),
        }),
        GeoJson::Geometry(_) => Err(BackendError::UnexpectedShape {
            expected: "a FeatureCollection",
            found: "a bare Geometry".to_string(),
        }),
    }
}

pub fn parse_schools(geojson: GeoJson) -> Result<Vec<School>> {
    let features = into_features(geojson)?;
    let total = features.len();
    let schools: Vec<School> = features.iter().filter_map(school_from_feature).collect();
    if schools.len() < total {
        debug!("Skipped {} school features without id or point geometry", total - schools.len());
    }
    Ok(schools)
}

pub fn parse_districts(geojson: GeoJson) -> Result<Vec<District>> {
    let features = into_features(geojson)?;
    let total = features.len();
    let districts: Vec<District> = features.into_iter().filter_map(district_from_feature).collect();
    if districts.len() < total {
        debug!("Skipped {} district features without id or polygon geometry", total - districts.len());
    }
    Ok(districts)
}

/// Builds a school from a GeoJSON point feature. Features without an id or a
/// point geometry are not schools and yield `None`.
pub fn school_from_feature(feature: &Feature) -> Option<School> {
    let props = feature.properties.as_ref();
    let id = feature_id(feature)?;

    let location = match feature.geometry.as_ref().map(|g| &g.value) {
        // GeoJSON positions are [lng, lat]
        Some(Value::Point(coords)) if coords.len() >= 2 => LatLng::new(coords[1], coords[0]),
        _ => return None,
    };

    Some(School {
        id,
        name: prop_string(props, "name").unwrap_or_default(),
        category: prop_string(props, "category"),
        district_name: prop_string(props, "district_name"),
        province_name: prop_string(props, "province_name"),
        gender: prop_string(props, "gender"),
        location,
        details: SchoolDetails {
            num_students: prop_u32(props, "num_students"),
            num_teachers: prop_u32(props, "num_teachers"),
            num_classrooms: prop_u32(props, "num_classrooms"),
            establishment_year: prop_i64(props, "establishment_year").and_then(|v| i32::try_from(v).ok()),
            has_library: prop_bool(props, "has_library"),
            has_computer_lab: prop_bool(props, "has_computer_lab"),
            has_playground: prop_bool(props, "has_playground"),
        },
    })
}

pub fn district_from_feature(feature: Feature) -> Option<District> {
    let props = feature.properties.as_ref();
    let id = feature_id(&feature)?;
    let name = prop_string(props, "name").unwrap_or_default();
    let province_name = prop_string(props, "province_name");

    let geometry = match feature.geometry {
        Some(geom) => {
            let valid_geo: geo::Geometry<f64> = match geom.value.try_into() {
                Ok(g) => g,
                Err(e) => {
                    debug!("Failed to convert geometry of district {}: {:?}", id, e);
                    return None;
                }
            };
            match valid_geo {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => return None,
            }
        }
        None => return None,
    };

    Some(District {
        id,
        name,
        province_name,
        geometry,
    })
}

/// `properties.id` wins over the feature-level id; both are accepted because
/// GeoJSON serializers differ on where they put it.
fn feature_id(feature: &Feature) -> Option<String> {
    if let Some(id) = prop_string(feature.properties.as_ref(), "id") {
        return Some(id);
    }
    match feature.id.as_ref()? {
        Id::String(s) => Some(s.clone()),
        Id::Number(n) => Some(n.to_string()),
    }
}

fn prop<'a>(props: Option<&'a JsonObject>, key: &str) -> Option<&'a JsonValue> {
    props.and_then(|p| p.get(key))
}

fn prop_string(props: Option<&JsonObject>, key: &str) -> Option<String> {
    match prop(props, key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn prop_i64(props: Option<&JsonObject>, key: &str) -> Option<i64> {
    prop(props, key)?.as_i64()
}

fn prop_u32(props: Option<&JsonObject>, key: &str) -> Option<u32> {
    prop(props, key)?.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn prop_bool(props: Option<&JsonObject>, key: &str) -> Option<bool> {
    prop(props, key)?.as_bool()
}

pub fn schools_to_geojson(schools: &[School]) -> FeatureCollection {
    let features = schools
        .iter()
        .map(|school| {
            let mut properties = match serde_json::to_value(school) {
                Ok(JsonValue::Object(map)) => map,
                _ => JsonObject::new(),
            };
            properties.remove("location");
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    school.location.lng,
                    school.location.lat,
                ]))),
                id: Some(Id::String(school.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn districts_to_geojson(districts: &[District]) -> FeatureCollection {
    let features = districts
        .iter()
        .map(|district| {
            let mut properties = JsonObject::new();
            properties.insert("id".into(), JsonValue::String(district.id.clone()));
            properties.insert("name".into(), JsonValue::String(district.name.clone()));
            properties.insert(
                "province_name".into(),
                district
                    .province_name
                    .clone()
                    .map(JsonValue::String)
                    .unwrap_or(JsonValue::Null),
            );
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&district.geometry))),
                id: Some(Id::String(district.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
