//! Selection state and the update rules that drive it.
//!
//! `AppModel` is owned by exactly one coordinator. Everything else asks for a
//! change by sending a [`Msg`]; `update` applies it and returns the
//! [`Effect`]s (network calls) the coordinator should run. Derived stats are
//! rebuilt from the cached dataset on every relevant change.

use crate::bounds::{bounds_of, geometry_bounds, Bounds};
use crate::dataset::Dataset;
use crate::filter::{filter_by_province, ProvinceSelection};
use crate::stats::{province_stats, ProvinceStats};
use crate::theme::FLY_TO_ZOOM;
use crate::types::{Category, DistrictStats, LatLng, MapStyle, NewSchool, School};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NAME_REQUIRED: &str = "School name is required";
pub const CREATE_FAILED: &str = "Failed to create school. Please try again.";

/// What the details drawer shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectedFeature {
    District {
        id: String,
        name: String,
        province_name: Option<String>,
        /// `None` when the stats lookup failed.
        stats: Option<DistrictStats>,
    },
    School {
        school: School,
    },
}

impl SelectedFeature {
    pub fn title(&self) -> &str {
        match self {
            SelectedFeature::District { name, .. } => name,
            SelectedFeature::School { school } => &school.name,
        }
    }
}

/// Viewport instruction for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraCommand {
    FitBounds { bounds: Bounds },
    FlyTo { target: LatLng, zoom: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub province: ProvinceSelection,
    pub feature: Option<SelectedFeature>,
    pub drawer_open: bool,
    pub fly_to: Option<School>,
    pub map_style: MapStyle,
    /// District highlighted on the map; independent of the drawer.
    pub highlighted_district: Option<String>,
}

impl SelectionState {
    /// `Some` selects and opens the drawer; `None` clears and closes it.
    pub fn select_feature(&mut self, feature: Option<SelectedFeature>) {
        self.drawer_open = feature.is_some();
        self.feature = feature;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolForm {
    pub coordinates: LatLng,
    pub name: String,
    pub category: Category,
    pub submitting: bool,
    pub error: Option<String>,
}

impl SchoolForm {
    fn new(coordinates: LatLng) -> Self {
        Self {
            coordinates,
            name: String::new(),
            category: Category::Primary,
            submitting: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddSchoolFlow {
    pub add_mode: bool,
    pub pending: Option<LatLng>,
    pub form: Option<SchoolForm>,
}

impl AddSchoolFlow {
    fn reset(&mut self) {
        self.add_mode = false;
        self.pending = None;
        self.form = None;
    }
}

/// User intents, as posted by the browser or issued by the CLI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SelectProvince { province: ProvinceSelection },
    MapClick { lat: f64, lng: f64 },
    SelectDistrict { district_id: String },
    SelectSchool { school_id: String },
    FlyTo { school_id: String },
    ClearFlyTo,
    CloseDrawer,
    SetMapStyle { style: MapStyle },
    ToggleAddMode,
    Search { term: String },
    EditForm {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        category: Option<Category>,
    },
    SubmitForm,
    CancelForm,
    Reload,
}

#[derive(Debug)]
pub enum Msg {
    Action(Action),
    DatasetLoaded(Dataset),
    DistrictStatsLoaded {
        seq: u64,
        district_id: String,
        stats: Option<DistrictStats>,
    },
    SchoolCreated(Result<School, String>),
}

impl From<Action> for Msg {
    fn from(action: Action) -> Self {
        Msg::Action(action)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadDataset,
    FetchDistrictStats { seq: u64, district_id: String },
    CreateSchool(NewSchool),
}

#[derive(Debug)]
pub struct AppModel {
    pub loading: bool,
    pub dataset: Arc<Dataset>,
    pub selection: SelectionState,
    pub add_school: AddSchoolFlow,
    pub search: String,
    pub camera: Option<CameraCommand>,
    pub global_stats: ProvinceStats,
    pub filtered_stats: ProvinceStats,
    stats_seq: u64,
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AppModel {
    /// Starts in the loading state; the first `Reload` fetches the dataset.
    pub fn new() -> Self {
        Self {
            loading: true,
            dataset: Arc::new(Dataset::default()),
            selection: SelectionState::default(),
            add_school: AddSchoolFlow::default(),
            search: String::new(),
            camera: None,
            global_stats: ProvinceStats::default(),
            filtered_stats: ProvinceStats::default(),
            stats_seq: 0,
        }
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Action(action) => self.apply_action(action),
            Msg::DatasetLoaded(dataset) => {
                self.on_dataset_loaded(dataset);
                Vec::new()
            }
            Msg::DistrictStatsLoaded {
                seq,
                district_id,
                stats,
            } => {
                self.on_district_stats(seq, district_id, stats);
                Vec::new()
            }
            Msg::SchoolCreated(result) => {
                self.on_school_created(result);
                Vec::new()
            }
        }
    }

    fn apply_action(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::SelectProvince { province } => self.select_province(province),
            Action::MapClick { lat, lng } => return self.map_click(LatLng::new(lat, lng)),
            Action::SelectDistrict { district_id } => return self.select_district(&district_id),
            Action::SelectSchool { school_id } => self.select_school(&school_id),
            Action::FlyTo { school_id } => self.fly_to(&school_id),
            Action::ClearFlyTo => self.selection.fly_to = None,
            Action::CloseDrawer => self.selection.select_feature(None),
            Action::SetMapStyle { style } => self.selection.map_style = style,
            Action::ToggleAddMode => {
                self.add_school.add_mode = !self.add_school.add_mode;
            }
            Action::Search { term } => self.search = term,
            Action::EditForm { name, category } => {
                if let Some(form) = self.add_school.form.as_mut() {
                    if let Some(name) = name {
                        form.name = name;
                    }
                    if let Some(category) = category {
                        form.category = category;
                    }
                    form.error = None;
                }
            }
            Action::SubmitForm => return self.submit_form(),
            Action::CancelForm => self.add_school.reset(),
            Action::Reload => {
                self.loading = true;
                return vec![Effect::LoadDataset];
            }
        }
        Vec::new()
    }

    fn on_dataset_loaded(&mut self, dataset: Dataset) {
        info!(
            schools = dataset.schools.len(),
            districts = dataset.districts.len(),
            "Dataset loaded"
        );
        self.dataset = Arc::new(dataset);
        self.loading = false;
        self.recompute();

        // A pending fly-to target wins over fitting the district extent.
        if self.selection.fly_to.is_none() {
            if let Some(bounds) = bounds_of(&self.dataset.districts) {
                self.camera = Some(CameraCommand::FitBounds { bounds });
            }
        }
    }

    /// Rebuilds global and filtered stats from the cached dataset.
    fn recompute(&mut self) {
        self.global_stats = province_stats(&self.dataset, &ProvinceSelection::All);
        self.filtered_stats = province_stats(&self.dataset, &self.selection.province);
    }

    fn select_province(&mut self, province: ProvinceSelection) {
        self.selection.province = province;
        self.recompute();

        if !self.selection.province.is_all() {
            let districts = filter_by_province(&self.dataset.districts, &self.selection.province);
            if let Some(bounds) = bounds_of(districts) {
                self.camera = Some(CameraCommand::FitBounds { bounds });
            }
        }
    }

    fn map_click(&mut self, at: LatLng) -> Vec<Effect> {
        if self.add_school.add_mode {
            self.add_school.pending = Some(at);
            self.add_school.add_mode = false;
            self.add_school.form = Some(SchoolForm::new(at));
            return Vec::new();
        }
        if self.add_school.form.is_some() {
            return Vec::new();
        }

        let district_id = match self.dataset.district_at(at) {
            Some(d) => d.id.clone(),
            None => return Vec::new(),
        };
        self.select_district(&district_id)
    }

    fn select_district(&mut self, district_id: &str) -> Vec<Effect> {
        if self.add_school.add_mode {
            return Vec::new();
        }
        let Some(district) = self.dataset.district(district_id) else {
            warn!("Ignoring selection of unknown district {}", district_id);
            return Vec::new();
        };

        self.selection.highlighted_district = Some(district.id.clone());
        if let Some(bounds) = geometry_bounds(&district.geometry) {
            self.camera = Some(CameraCommand::FitBounds { bounds });
        }

        self.stats_seq += 1;
        vec![Effect::FetchDistrictStats {
            seq: self.stats_seq,
            district_id: district.id.clone(),
        }]
    }

    fn on_district_stats(&mut self, seq: u64, district_id: String, stats: Option<DistrictStats>) {
        if seq != self.stats_seq {
            debug!(seq, latest = self.stats_seq, "Discarding stale stats for district {}", district_id);
            return;
        }

        let (name, province_name) = match self.dataset.district(&district_id) {
            Some(d) => (d.name.clone(), d.province_name.clone()),
            None => (district_id.clone(), None),
        };
        self.selection.select_feature(Some(SelectedFeature::District {
            id: district_id,
            name,
            province_name,
            stats,
        }));
    }

    fn select_school(&mut self, school_id: &str) {
        let Some(school) = self.dataset.school(school_id).cloned() else {
            warn!("Ignoring selection of unknown school {}", school_id);
            return;
        };
        self.selection.select_feature(Some(SelectedFeature::School {
            school: school.clone(),
        }));
        self.set_fly_to(school);
    }

    fn fly_to(&mut self, school_id: &str) {
        match self.dataset.school(school_id).cloned() {
            Some(school) => self.set_fly_to(school),
            None => warn!("Cannot fly to unknown school {}", school_id),
        }
    }

    fn set_fly_to(&mut self, school: School) {
        self.camera = Some(CameraCommand::FlyTo {
            target: school.location,
            zoom: FLY_TO_ZOOM,
        });
        self.selection.fly_to = Some(school);
    }

    fn submit_form(&mut self) -> Vec<Effect> {
        let Some(form) = self.add_school.form.as_mut() else {
            return Vec::new();
        };
        if form.submitting {
            return Vec::new();
        }

        let name = form.name.trim().to_string();
        if name.is_empty() {
            form.error = Some(NAME_REQUIRED.to_string());
            return Vec::new();
        }

        form.submitting = true;
        form.error = None;
        vec![Effect::CreateSchool(NewSchool {
            name,
            category: form.category,
            longitude: form.coordinates.lng,
            latitude: form.coordinates.lat,
        })]
    }

    fn on_school_created(&mut self, result: Result<School, String>) {
        match result {
            Ok(school) => {
                // Not merged into the cached dataset; visible after a reload.
                info!("School {} created as {}; reload to see it on the map", school.name, school.id);
                self.add_school.reset();
            }
            Err(e) => {
                warn!("Error creating school: {}", e);
                if let Some(form) = self.add_school.form.as_mut() {
                    form.submitting = false;
                    form.error = Some(CREATE_FAILED.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{District, SchoolDetails};
    use geo::{LineString, MultiPolygon, Polygon};

    fn school(id: &str, category: &str, province: &str, lat: f64, lng: f64) -> School {
        School {
            id: id.into(),
            name: format!("School {id}"),
            category: Some(category.into()),
            district_name: None,
            province_name: Some(province.into()),
            gender: None,
            location: LatLng::new(lat, lng),
            details: SchoolDetails::default(),
        }
    }

    fn square(id: &str, province: &str, min_lng: f64, min_lat: f64) -> District {
        let ring = LineString::from(vec![
            (min_lng, min_lat),
            (min_lng + 1.0, min_lat),
            (min_lng + 1.0, min_lat + 1.0),
            (min_lng, min_lat + 1.0),
        ]);
        District {
            id: id.into(),
            name: format!("District {id}"),
            province_name: Some(province.into()),
            geometry: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                school("1", "primary", "Sindh", 24.5, 66.5),
                school("2", "primary", "Sindh", 25.5, 67.5),
                school("3", "secondary", "Punjab", 31.5, 74.5),
            ],
            vec![
                square("10", "Sindh", 66.0, 24.0),
                square("11", "Sindh", 67.0, 25.0),
                square("20", "Punjab", 74.0, 31.0),
            ],
        )
    }

    fn loaded() -> AppModel {
        let mut model = AppModel::new();
        assert_eq!(model.update(Action::Reload.into()), vec![Effect::LoadDataset]);
        model.update(Msg::DatasetLoaded(dataset()));
        model
    }

    #[test]
    fn loading_derives_global_stats_and_fits_all_districts() {
        let model = loaded();
        assert!(!model.loading);
        assert_eq!(model.global_stats.total, 3);
        assert_eq!(model.global_stats.by_category["primary"], 2);
        assert_eq!(model.filtered_stats, model.global_stats);
        assert_eq!(
            model.camera,
            Some(CameraCommand::FitBounds {
                bounds: Bounds {
                    min_lat: 24.0,
                    min_lng: 66.0,
                    max_lat: 32.0,
                    max_lng: 75.0
                }
            })
        );
    }

    #[test]
    fn empty_dataset_still_leaves_loading() {
        let mut model = AppModel::new();
        model.update(Msg::DatasetLoaded(Dataset::default()));
        assert!(!model.loading);
        assert_eq!(model.global_stats.total, 0);
        assert_eq!(model.camera, None);
    }

    #[test]
    fn province_selection_rebuilds_filtered_stats() {
        let mut model = loaded();
        model.update(
            Action::SelectProvince {
                province: "Sindh".into(),
            }
            .into(),
        );
        assert_eq!(model.filtered_stats.total, 2);
        assert_eq!(model.filtered_stats.total_districts, 2);
        assert_eq!(model.global_stats.total, 3);
        assert!(matches!(
            model.camera,
            Some(CameraCommand::FitBounds { bounds }) if bounds.max_lng == 68.0
        ));

        model.update(
            Action::SelectProvince {
                province: ProvinceSelection::All,
            }
            .into(),
        );
        assert_eq!(model.filtered_stats, model.global_stats);
    }

    #[test]
    fn selecting_a_school_opens_drawer_and_sets_fly_to() {
        let mut model = loaded();
        model.update(
            Action::SelectSchool {
                school_id: "3".into(),
            }
            .into(),
        );
        assert!(model.selection.drawer_open);
        assert_eq!(model.selection.fly_to.as_ref().map(|s| s.id.as_str()), Some("3"));
        assert_eq!(model.selection.feature.as_ref().map(|f| f.title()), Some("School 3"));
        assert!(matches!(model.camera, Some(CameraCommand::FlyTo { zoom, .. }) if zoom == FLY_TO_ZOOM));

        model.update(Action::CloseDrawer.into());
        assert!(!model.selection.drawer_open);
        assert_eq!(model.selection.feature, None);
        assert_eq!(model.selection.fly_to.as_ref().map(|s| s.id.as_str()), Some("3"));
    }

    #[test]
    fn pending_fly_to_suppresses_fit_on_reload() {
        let mut model = loaded();
        model.update(Action::FlyTo { school_id: "1".into() }.into());
        let camera = model.camera.clone();
        assert_eq!(model.update(Action::Reload.into()), vec![Effect::LoadDataset]);
        model.update(Msg::DatasetLoaded(dataset()));
        assert_eq!(model.camera, camera);

        model.update(Action::ClearFlyTo.into());
        model.update(Msg::DatasetLoaded(dataset()));
        assert!(matches!(model.camera, Some(CameraCommand::FitBounds { .. })));
    }

    #[test]
    fn district_click_fetches_stats_then_opens_drawer() {
        let mut model = loaded();
        let effects = model.update(Action::MapClick { lat: 31.5, lng: 74.5 }.into());
        assert_eq!(
            effects,
            vec![Effect::FetchDistrictStats {
                seq: 1,
                district_id: "20".into()
            }]
        );
        assert_eq!(model.selection.highlighted_district.as_deref(), Some("20"));
        assert!(!model.selection.drawer_open);

        model.update(Msg::DistrictStatsLoaded {
            seq: 1,
            district_id: "20".into(),
            stats: None,
        });
        assert!(model.selection.drawer_open);
        match &model.selection.feature {
            Some(SelectedFeature::District { name, stats, .. }) => {
                assert_eq!(name, "District 20");
                assert_eq!(stats, &None);
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn stale_district_stats_are_discarded() {
        let mut model = loaded();
        model.update(Action::SelectDistrict { district_id: "10".into() }.into());
        model.update(Action::SelectDistrict { district_id: "20".into() }.into());

        model.update(Msg::DistrictStatsLoaded {
            seq: 1,
            district_id: "10".into(),
            stats: Some(DistrictStats::default()),
        });
        assert_eq!(model.selection.feature, None);

        model.update(Msg::DistrictStatsLoaded {
            seq: 2,
            district_id: "20".into(),
            stats: Some(DistrictStats::default()),
        });
        assert_eq!(model.selection.feature.as_ref().map(|f| f.title()), Some("District 20"));
    }

    #[test]
    fn clicks_outside_add_mode_never_open_the_form() {
        let mut model = loaded();
        assert!(model.update(Action::MapClick { lat: 0.0, lng: 0.0 }.into()).is_empty());
        assert_eq!(model.add_school.form, None);
        assert_eq!(model.add_school.pending, None);
    }

    #[test]
    fn empty_name_blocks_submission() {
        let mut model = loaded();
        model.update(Action::ToggleAddMode.into());
        assert!(model.update(Action::MapClick { lat: 30.0, lng: 70.0 }.into()).is_empty());
        assert_eq!(model.add_school.pending, Some(LatLng::new(30.0, 70.0)));

        model.update(
            Action::EditForm {
                name: Some("   ".into()),
                category: None,
            }
            .into(),
        );
        let effects = model.update(Action::SubmitForm.into());
        assert!(effects.is_empty());
        let form = model.add_school.form.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some(NAME_REQUIRED));
        assert!(!form.submitting);
    }

    #[test]
    fn create_school_flow() {
        let mut model = loaded();
        model.update(Action::ToggleAddMode.into());
        model.update(Action::MapClick { lat: 30.0, lng: 70.0 }.into());
        model.update(
            Action::EditForm {
                name: Some("Quetta Grammar".into()),
                category: Some(Category::University),
            }
            .into(),
        );

        let effects = model.update(Action::SubmitForm.into());
        assert_eq!(
            effects,
            vec![Effect::CreateSchool(NewSchool {
                name: "Quetta Grammar".into(),
                category: Category::University,
                longitude: 70.0,
                latitude: 30.0,
            })]
        );
        // Double submit while in flight is ignored.
        assert!(model.update(Action::SubmitForm.into()).is_empty());

        model.update(Msg::SchoolCreated(Err("503".into())));
        let form = model.add_school.form.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some(CREATE_FAILED));
        assert!(!form.submitting);

        assert_eq!(model.update(Action::SubmitForm.into()).len(), 1);
        let created = school("99", "university", "Balochistan", 30.0, 70.0);
        model.update(Msg::SchoolCreated(Ok(created)));
        assert_eq!(model.add_school, AddSchoolFlow::default());
        // Not merged until reload.
        assert_eq!(model.dataset.schools.len(), 3);
    }

    #[test]
    fn district_selection_is_ignored_in_add_mode() {
        let mut model = loaded();
        model.update(Action::ToggleAddMode.into());
        assert!(model
            .update(Action::SelectDistrict { district_id: "10".into() }.into())
            .is_empty());
        assert_eq!(model.selection.highlighted_district, None);
    }

    #[test]
    fn map_style_changes_nothing_else() {
        let mut model = loaded();
        let stats = model.filtered_stats.clone();
        let camera = model.camera.clone();
        model.update(Action::SetMapStyle { style: MapStyle::Street }.into());
        assert_eq!(model.selection.map_style, MapStyle::Street);
        assert_eq!(model.filtered_stats, stats);
        assert_eq!(model.camera, camera);
    }

    #[test]
    fn actions_deserialize_from_tagged_json() {
        let action: Action =
            serde_json::from_str(r#"{"type": "select_province", "province": "Sindh"}"#).unwrap();
        assert_eq!(
            action,
            Action::SelectProvince {
                province: ProvinceSelection::Province("Sindh".into())
            }
        );
        let action: Action = serde_json::from_str(r#"{"type": "edit_form", "name": "X"}"#).unwrap();
        assert_eq!(
            action,
            Action::EditForm {
                name: Some("X".into()),
                category: None
            }
        );
        let action: Action =
            serde_json::from_str(r#"{"type": "set_map_style", "style": "satellite"}"#).unwrap();
        assert_eq!(action, Action::SetMapStyle { style: MapStyle::Satellite });
    }
}
