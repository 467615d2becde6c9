use crate::api::MapBackend;
use crate::data::{load_districts, load_schools};
use crate::error::{BackendError, Result};
use crate::stats::aggregate;
use crate::types::{District, DistrictStats, NewSchool, School, SchoolDetails};
use async_trait::async_trait;
use geo::algorithm::contains::Contains;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

/// Backend over local GeoJSON files, for running without the REST service.
/// District stats are computed by point-in-polygon containment; created
/// schools live in memory until the process exits.
pub struct LocalBackend {
    districts: Vec<District>,
    schools: RwLock<Vec<School>>,
}

impl LocalBackend {
    pub fn new(schools: Vec<School>, districts: Vec<District>) -> Self {
        Self {
            districts,
            schools: RwLock::new(schools),
        }
    }

    pub fn from_files(schools: &Path, districts: &Path) -> Result<Self> {
        let schools = load_schools(schools)?;
        let districts = load_districts(districts)?;
        info!(
            "Loaded {} schools and {} districts from disk",
            schools.len(),
            districts.len()
        );
        Ok(Self::new(schools, districts))
    }

    fn district(&self, id: &str) -> Result<&District> {
        self.districts
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("district {}", id)))
    }
}

#[async_trait]
impl MapBackend for LocalBackend {
    async fn schools(&self) -> Result<Vec<School>> {
        Ok(self.schools.read().await.clone())
    }

    async fn districts(&self) -> Result<Vec<District>> {
        Ok(self.districts.clone())
    }

    async fn district_stats(&self, district_id: &str) -> Result<DistrictStats> {
        let district = self.district(district_id)?;
        let schools = self.schools.read().await;
        let summary = aggregate(
            schools
                .iter()
                .filter(|s| district.geometry.contains(&s.location.to_point())),
        );
        Ok(DistrictStats {
            total: summary.total_schools,
            by_category: summary.schools_by_category,
        })
    }

    async fn search_districts(&self, query: &str) -> Result<Vec<District>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .districts
            .iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d
                        .province_name
                        .as_deref()
                        .is_some_and(|p| p.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn create_school(&self, new: &NewSchool) -> Result<School> {
        let point = new.location().to_point();
        let district = self.districts.iter().find(|d| d.geometry.contains(&point));

        let mut schools = self.schools.write().await;
        let next_id = schools
            .iter()
            .filter_map(|s| s.id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);

        let school = School {
            id: next_id.to_string(),
            name: new.name.clone(),
            category: Some(new.category.key().to_string()),
            district_name: district.map(|d| d.name.clone()),
            province_name: district.and_then(|d| d.province_name.clone()),
            gender: None,
            location: new.location(),
            details: SchoolDetails::default(),
        };
        schools.push(school.clone());
        info!("Created school {} ({})", school.name, school.id);
        Ok(school)
    }
}
