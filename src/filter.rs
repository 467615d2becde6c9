use crate::types::{District, School};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel selecting every province.
pub const ALL_PROVINCES: &str = "all";

/// A province filter: either every province or one named province.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProvinceSelection {
    #[default]
    All,
    Province(String),
}

impl ProvinceSelection {
    pub fn is_all(&self) -> bool {
        matches!(self, ProvinceSelection::All)
    }

    pub fn matches<T: HasProvince + ?Sized>(&self, item: &T) -> bool {
        match self {
            ProvinceSelection::All => true,
            ProvinceSelection::Province(name) => item.province_name() == Some(name.as_str()),
        }
    }
}

impl From<String> for ProvinceSelection {
    fn from(value: String) -> Self {
        if value == ALL_PROVINCES {
            ProvinceSelection::All
        } else {
            ProvinceSelection::Province(value)
        }
    }
}

impl From<&str> for ProvinceSelection {
    fn from(value: &str) -> Self {
        ProvinceSelection::from(value.to_string())
    }
}

impl From<ProvinceSelection> for String {
    fn from(value: ProvinceSelection) -> Self {
        match value {
            ProvinceSelection::All => ALL_PROVINCES.to_string(),
            ProvinceSelection::Province(name) => name,
        }
    }
}

impl fmt::Display for ProvinceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvinceSelection::All => f.write_str(ALL_PROVINCES),
            ProvinceSelection::Province(name) => f.write_str(name),
        }
    }
}

pub trait HasProvince {
    fn province_name(&self) -> Option<&str>;
}

impl HasProvince for School {
    fn province_name(&self) -> Option<&str> {
        self.province_name.as_deref()
    }
}

impl HasProvince for District {
    fn province_name(&self) -> Option<&str> {
        self.province_name.as_deref()
    }
}

/// Items belonging to the selected province, in input order. Entities with no
/// province only survive the `all` selection.
pub fn filter_by_province<'a, T: HasProvince>(
    items: &'a [T],
    selection: &ProvinceSelection,
) -> Vec<&'a T> {
    items.iter().filter(|item| selection.matches(*item)).collect()
}

/// Sorted distinct province names found on the districts.
pub fn provinces(districts: &[District]) -> Vec<String> {
    districts
        .iter()
        .filter_map(|d| d.province_name.as_deref())
        .filter(|p| !p.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Case-insensitive name search across every school, regardless of province.
pub fn search_schools<'a>(schools: &'a [School], term: &str) -> Vec<&'a School> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    schools
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LatLng, SchoolDetails};
    use geo::MultiPolygon;

    fn school(id: &str, name: &str, province: Option<&str>) -> School {
        School {
            id: id.into(),
            name: name.into(),
            category: Some("primary".into()),
            district_name: None,
            province_name: province.map(str::to_string),
            gender: None,
            location: LatLng::new(0.0, 0.0),
            details: SchoolDetails::default(),
        }
    }

    fn district(id: &str, province: Option<&str>) -> District {
        District {
            id: id.into(),
            name: format!("District {id}"),
            province_name: province.map(str::to_string),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    #[test]
    fn all_is_identity() {
        let schools = vec![
            school("1", "A", Some("Sindh")),
            school("2", "B", None),
            school("3", "C", Some("Punjab")),
        ];
        let filtered = filter_by_province(&schools, &ProvinceSelection::All);
        assert_eq!(filtered.len(), schools.len());
        assert!(filtered.iter().zip(&schools).all(|(a, b)| *a == b));
    }

    #[test]
    fn single_province_list_filters_to_itself_or_nothing() {
        let schools = vec![school("1", "A", Some("Sindh")), school("2", "B", Some("Sindh"))];
        let sindh = filter_by_province(&schools, &"Sindh".into());
        assert_eq!(sindh.len(), 2);
        assert!(filter_by_province(&schools, &"Punjab".into()).is_empty());
    }

    #[test]
    fn filtering_keeps_input_order() {
        let schools = vec![
            school("1", "A", Some("Sindh")),
            school("2", "B", Some("Punjab")),
            school("3", "C", Some("Sindh")),
            school("4", "D", None),
        ];
        let ids: Vec<&str> = filter_by_province(&schools, &"Sindh".into())
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn works_on_districts_too() {
        let districts = vec![district("1", Some("Sindh")), district("2", Some("Punjab"))];
        assert_eq!(filter_by_province(&districts, &"Punjab".into())[0].id, "2");
    }

    #[test]
    fn selection_round_trips_through_its_string_form() {
        assert_eq!(ProvinceSelection::from("all"), ProvinceSelection::All);
        let parsed: ProvinceSelection = serde_json::from_str("\"Sindh\"").unwrap();
        assert_eq!(parsed, ProvinceSelection::Province("Sindh".into()));
        assert_eq!(serde_json::to_string(&ProvinceSelection::All).unwrap(), "\"all\"");
    }

    #[test]
    fn provinces_are_sorted_and_unique() {
        let districts = vec![
            district("1", Some("Sindh")),
            district("2", Some("Balochistan")),
            district("3", Some("Sindh")),
            district("4", None),
            district("5", Some("")),
        ];
        assert_eq!(provinces(&districts), ["Balochistan", "Sindh"]);
    }

    #[test]
    fn search_ignores_case_and_province() {
        let schools = vec![
            school("1", "Lahore Grammar School", Some("Punjab")),
            school("2", "Karachi Grammar School", Some("Sindh")),
            school("3", "Quetta Primary", None),
        ];
        let hits: Vec<&str> = search_schools(&schools, "grammar")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(hits, ["1", "2"]);
        assert!(search_schools(&schools, "   ").is_empty());
    }
}
