use crate::hit_test::DistrictIndex;
use crate::types::{District, LatLng, School};
use std::fmt;

/// Immutable snapshot of everything fetched from the backend. Replaced
/// wholesale on reload, never patched.
#[derive(Default)]
pub struct Dataset {
    pub schools: Vec<School>,
    pub districts: Vec<District>,
    index: DistrictIndex,
}

impl Dataset {
    pub fn new(schools: Vec<School>, districts: Vec<District>) -> Self {
        let index = DistrictIndex::build(&districts);
        Self {
            schools,
            districts,
            index,
        }
    }

    pub fn school(&self, id: &str) -> Option<&School> {
        self.schools.iter().find(|s| s.id == id)
    }

    pub fn district(&self, id: &str) -> Option<&District> {
        self.districts.iter().find(|d| d.id == id)
    }

    pub fn district_at(&self, at: LatLng) -> Option<&District> {
        self.index.locate(&self.districts, at)
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("schools", &self.schools.len())
            .field("districts", &self.districts.len())
            .field("index", &self.index)
            .finish()
    }
}
