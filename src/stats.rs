//! Category and province aggregates, always rebuilt from the full dataset.

use crate::dataset::Dataset;
use crate::filter::{filter_by_province, provinces, ProvinceSelection};
use crate::types::{CategoryCount, School};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub total_schools: usize,
    pub schools_by_category: CategoryCount,
}

/// Counts schools per category key. Order of the input does not matter and
/// nothing fails: a missing category is counted as `"unknown"`.
pub fn aggregate<'a, I>(schools: I) -> CategorySummary
where
    I: IntoIterator<Item = &'a School>,
{
    let mut summary = CategorySummary::default();
    for school in schools {
        *summary
            .schools_by_category
            .entry(school.category_key().to_string())
            .or_insert(0) += 1;
        summary.total_schools += 1;
    }
    summary
}

/// Aggregate for one province (or `all`). `total` always equals the sum of
/// `by_category`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvinceStats {
    pub total: usize,
    pub by_category: CategoryCount,
    pub schools: Vec<School>,
    pub total_districts: usize,
}

pub fn province_stats(dataset: &Dataset, selection: &ProvinceSelection) -> ProvinceStats {
    let schools = filter_by_province(&dataset.schools, selection);
    let total_districts = filter_by_province(&dataset.districts, selection).len();
    let summary = aggregate(schools.iter().copied());

    ProvinceStats {
        total: summary.total_schools,
        by_category: summary.schools_by_category,
        schools: schools.into_iter().cloned().collect(),
        total_districts,
    }
}

/// Stats for every province named on a district, plus the `all` entry.
pub fn province_table(dataset: &Dataset) -> BTreeMap<String, ProvinceStats> {
    let mut table: BTreeMap<String, ProvinceStats> = provinces(&dataset.districts)
        .into_iter()
        .map(|name| {
            let stats = province_stats(dataset, &ProvinceSelection::Province(name.clone()));
            (name, stats)
        })
        .collect();
    table.insert(
        ProvinceSelection::All.to_string(),
        province_stats(dataset, &ProvinceSelection::All),
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{District, LatLng, SchoolDetails};
    use geo::MultiPolygon;

    fn school(id: &str, category: Option<&str>, province: &str) -> School {
        School {
            id: id.into(),
            name: format!("School {id}"),
            category: category.map(str::to_string),
            district_name: None,
            province_name: Some(province.into()),
            gender: None,
            location: LatLng::new(25.0, 68.0),
            details: SchoolDetails::default(),
        }
    }

    fn district(id: &str, province: &str) -> District {
        District {
            id: id.into(),
            name: format!("District {id}"),
            province_name: Some(province.into()),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    fn assert_consistent(stats: &ProvinceStats) {
        assert_eq!(stats.total, stats.by_category.values().sum::<usize>());
        assert_eq!(stats.total, stats.schools.len());
    }

    #[test]
    fn category_counts_sum_to_the_list_length() {
        let schools = vec![
            school("1", Some("primary"), "Sindh"),
            school("2", None, "Sindh"),
            school("3", Some(""), "Punjab"),
            school("4", Some("madrasa"), "Punjab"),
            school("5", Some("primary"), "Punjab"),
        ];
        let summary = aggregate(&schools);
        assert_eq!(summary.total_schools, schools.len());
        assert_eq!(summary.schools_by_category.values().sum::<usize>(), schools.len());
        assert_eq!(summary.schools_by_category["unknown"], 2);
        assert_eq!(summary.schools_by_category["madrasa"], 1);
        assert_eq!(summary.schools_by_category.len(), 3);
    }

    #[test]
    fn aggregation_ignores_input_order() {
        let mut schools = vec![
            school("1", Some("primary"), "Sindh"),
            school("2", Some("secondary"), "Sindh"),
            school("3", None, "Sindh"),
        ];
        let forward = aggregate(&schools);
        schools.reverse();
        assert_eq!(aggregate(&schools), forward);
    }

    #[test]
    fn whitespace_category_keeps_its_own_key() {
        let schools = vec![
            school("1", Some("  "), "Sindh"),
            school("2", Some(""), "Sindh"),
            school("3", None, "Sindh"),
        ];
        let summary = aggregate(&schools);
        assert_eq!(summary.total_schools, 3);
        assert_eq!(summary.schools_by_category["  "], 1);
        assert_eq!(summary.schools_by_category["unknown"], 2);
    }

    #[test]
    fn empty_list_has_no_keys() {
        let summary = aggregate(&Vec::<School>::new());
        assert_eq!(summary, CategorySummary::default());
    }

    #[test]
    fn global_and_province_stats_from_one_dataset() {
        let dataset = Dataset::new(
            vec![
                school("1", Some("primary"), "Sindh"),
                school("2", Some("primary"), "Sindh"),
                school("3", Some("secondary"), "Sindh"),
            ],
            vec![district("10", "Sindh"), district("11", "Sindh")],
        );

        let global = province_stats(&dataset, &ProvinceSelection::All);
        assert_eq!(global.total, 3);
        assert_eq!(global.by_category.len(), 2);
        assert_eq!(global.by_category["primary"], 2);
        assert_eq!(global.by_category["secondary"], 1);
        assert_eq!(global.total_districts, 2);
        assert_consistent(&global);

        let sindh = province_stats(&dataset, &"Sindh".into());
        assert_eq!(sindh.total, 3);
        assert_consistent(&sindh);

        let punjab = province_stats(&dataset, &"Punjab".into());
        assert_eq!(punjab.total, 0);
        assert_eq!(punjab.total_districts, 0);
        assert!(punjab.by_category.is_empty());
    }

    #[test]
    fn province_subset_only_counts_matching_schools() {
        let dataset = Dataset::new(
            vec![
                school("1", Some("primary"), "Sindh"),
                school("2", Some("primary"), "Punjab"),
                school("3", Some("secondary"), "Sindh"),
            ],
            vec![district("10", "Sindh"), district("11", "Punjab")],
        );
        let sindh = province_stats(&dataset, &"Sindh".into());
        assert_eq!(sindh.total, 2);
        assert_eq!(sindh.by_category["primary"], 1);
        let ids: Vec<&str> = sindh.schools.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
        assert_consistent(&sindh);
    }

    #[test]
    fn table_has_every_province_and_all() {
        let dataset = Dataset::new(
            vec![
                school("1", Some("primary"), "Sindh"),
                school("2", Some("university"), "Punjab"),
            ],
            vec![district("10", "Sindh"), district("11", "Punjab"), district("12", "Balochistan")],
        );
        let table = province_table(&dataset);
        let keys: Vec<&str> = table.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Balochistan", "Punjab", "Sindh", "all"]);
        assert_eq!(table["all"].total, 2);
        assert_eq!(table["Balochistan"].total, 0);
        table.values().for_each(assert_consistent);
    }
}
