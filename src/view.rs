//! Composes the model into the serializable view tree served to the browser.

use crate::filter::{filter_by_province, provinces, search_schools, ProvinceSelection};
use crate::selection::{AppModel, CameraCommand, SchoolForm, SelectedFeature};
use crate::theme::{
    category_label, district_style, school_marker, title_case, DistrictStyle, MarkerStyle,
    TileLayer, DEFAULT_CENTER, DEFAULT_ZOOM,
};
use crate::types::{Category, CategoryCount, DistrictStats, LatLng, MapStyle, School};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub loading: bool,
    pub map: MapView,
    pub sidebar: SidebarView,
    pub drawer: Option<DrawerView>,
    pub add_mode: bool,
    pub form: Option<SchoolForm>,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub style: MapStyle,
    pub tiles: TileLayer,
    pub background: &'static str,
    pub center: LatLng,
    pub zoom: f64,
    pub camera: Option<CameraCommand>,
    pub cursor: &'static str,
    pub districts: Vec<DistrictLayer>,
    pub schools: Vec<SchoolMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictLayer {
    pub id: String,
    pub name: String,
    pub province_name: Option<String>,
    pub selected: bool,
    pub style: DistrictStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolMarker {
    pub id: String,
    pub name: String,
    pub location: LatLng,
    pub category: String,
    pub category_label: String,
    pub district_name: String,
    pub style: MarkerStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarMode {
    Stats,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarView {
    pub selected_province: ProvinceSelection,
    pub provinces: Vec<ProvinceOption>,
    pub mode: SidebarMode,
    pub search: String,
    pub stats: StatsView,
    pub directory: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceOption {
    pub value: ProvinceSelection,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub total_schools: usize,
    pub total_districts: usize,
    pub distribution: Vec<ChartSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub key: String,
    pub label: String,
    pub value: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub category_label: String,
    pub color: &'static str,
    pub district_name: String,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawerView {
    pub open: bool,
    pub kind: &'static str,
    pub title: String,
    /// District figures; absent when the lookup failed.
    pub stats: Option<StatsView>,
    /// School attributes as label/value rows.
    pub details: Vec<DetailRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

pub fn compose(model: &AppModel) -> ViewModel {
    ViewModel {
        loading: model.loading,
        map: compose_map(model),
        sidebar: compose_sidebar(model),
        drawer: compose_drawer(model),
        add_mode: model.add_school.add_mode,
        form: model.add_school.form.clone(),
        legend: legend(),
    }
}

fn compose_map(model: &AppModel) -> MapView {
    let style = model.selection.map_style;
    let highlighted = model.selection.highlighted_district.as_deref();

    let districts = model
        .dataset
        .districts
        .iter()
        .map(|d| {
            let selected = highlighted == Some(d.id.as_str());
            DistrictLayer {
                id: d.id.clone(),
                name: d.name.clone(),
                province_name: d.province_name.clone(),
                selected,
                style: district_style(style, selected),
            }
        })
        .collect();

    let schools = model
        .dataset
        .schools
        .iter()
        .map(|s| SchoolMarker {
            id: s.id.clone(),
            name: s.name.clone(),
            location: s.location,
            category: s.category_key().to_string(),
            category_label: category_label(s.category_key()),
            district_name: s.district_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            style: school_marker(s.category_key()),
        })
        .collect();

    MapView {
        style,
        tiles: style.tile_layer(),
        background: style.background(),
        center: DEFAULT_CENTER,
        zoom: DEFAULT_ZOOM,
        camera: model.camera.clone(),
        cursor: if model.add_school.add_mode { "crosshair" } else { "" },
        districts,
        schools,
    }
}

fn compose_sidebar(model: &AppModel) -> SidebarView {
    let selected = &model.selection.province;
    let search_active = !model.search.trim().is_empty();

    let mode = if search_active || !selected.is_all() {
        SidebarMode::List
    } else {
        SidebarMode::Stats
    };

    // Search spans every province; otherwise the directory lists the
    // selected province and stays empty for "all".
    let listed: Vec<&School> = if search_active {
        search_schools(&model.dataset.schools, &model.search)
    } else if selected.is_all() {
        Vec::new()
    } else {
        filter_by_province(&model.dataset.schools, selected)
    };

    let mut options = vec![ProvinceOption {
        value: ProvinceSelection::All,
        label: "All Provinces".to_string(),
    }];
    options.extend(provinces(&model.dataset.districts).into_iter().map(|p| ProvinceOption {
        label: title_case(&p),
        value: ProvinceSelection::Province(p),
    }));

    SidebarView {
        selected_province: selected.clone(),
        provinces: options,
        mode,
        search: model.search.clone(),
        stats: StatsView {
            total_schools: model.filtered_stats.total,
            total_districts: model.filtered_stats.total_districts,
            distribution: distribution(&model.filtered_stats.by_category),
        },
        directory: listed.into_iter().map(directory_entry).collect(),
    }
}

fn directory_entry(school: &School) -> DirectoryEntry {
    let key = school.category_key();
    DirectoryEntry {
        id: school.id.clone(),
        name: school.name.clone(),
        category_label: category_label(key),
        color: Category::from_key(key).color(),
        district_name: school
            .district_name
            .clone()
            .unwrap_or_else(|| "Unknown District".to_string()),
        gender: school.gender.clone(),
    }
}

/// Chart slices, largest first; ties broken by key so the output is stable.
fn distribution(by_category: &CategoryCount) -> Vec<ChartSlice> {
    let mut slices: Vec<ChartSlice> = by_category
        .iter()
        .map(|(key, &value)| ChartSlice {
            key: key.clone(),
            label: category_label(key),
            value,
            color: Category::from_key(key).color(),
        })
        .collect();
    slices.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    slices
}

fn compose_drawer(model: &AppModel) -> Option<DrawerView> {
    let feature = model.selection.feature.as_ref()?;
    let open = model.selection.drawer_open;

    Some(match feature {
        SelectedFeature::District { name, stats, .. } => DrawerView {
            open,
            kind: "district",
            title: name.clone(),
            stats: stats.as_ref().map(district_stats_view),
            details: Vec::new(),
        },
        SelectedFeature::School { school } => DrawerView {
            open,
            kind: "school",
            title: school.name.clone(),
            stats: None,
            details: school_details(school),
        },
    })
}

fn district_stats_view(stats: &DistrictStats) -> StatsView {
    StatsView {
        total_schools: stats.total,
        total_districts: 1,
        distribution: distribution(&stats.by_category),
    }
}

fn school_details(school: &School) -> Vec<DetailRow> {
    fn row(key: &str, value: Option<String>) -> DetailRow {
        DetailRow {
            label: title_case(key),
            value: value.filter(|v| !v.is_empty()).unwrap_or_else(|| "-".to_string()),
        }
    }
    fn yes_no(v: Option<bool>) -> Option<String> {
        v.map(|b| if b { "Yes" } else { "No" }.to_string())
    }

    let d = &school.details;
    vec![
        row("name", Some(school.name.clone())),
        row("category", Some(category_label(school.category_key()))),
        row("district_name", school.district_name.clone()),
        row("province_name", school.province_name.clone()),
        row("gender", school.gender.clone()),
        row("num_students", d.num_students.map(|v| v.to_string())),
        row("num_teachers", d.num_teachers.map(|v| v.to_string())),
        row("num_classrooms", d.num_classrooms.map(|v| v.to_string())),
        row("establishment_year", d.establishment_year.map(|v| v.to_string())),
        row("has_library", yes_no(d.has_library)),
        row("has_computer_lab", yes_no(d.has_computer_lab)),
        row("has_playground", yes_no(d.has_playground)),
    ]
}

fn legend() -> Vec<LegendEntry> {
    Category::SELECTABLE
        .iter()
        .chain(std::iter::once(&Category::Other))
        .map(|c| LegendEntry {
            key: c.key(),
            label: c.label(),
            color: c.color(),
        })
        .collect()
}
