use crate::config::ApiConfig;
use crate::data::{parse_districts, parse_schools, school_from_feature};
use crate::error::{BackendError, Result};
use crate::types::{District, DistrictStats, NewSchool, School};
use async_trait::async_trait;
use geojson::{Feature, GeoJson};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::info;

/// The REST/GeoJSON collaborator the map talks to.
#[async_trait]
pub trait MapBackend: Send + Sync {
    async fn schools(&self) -> Result<Vec<School>>;
    async fn districts(&self) -> Result<Vec<District>>;
    async fn district_stats(&self, district_id: &str) -> Result<DistrictStats>;
    /// Districts whose name or province matches `query`.
    async fn search_districts(&self, query: &str) -> Result<Vec<District>>;
    async fn create_school(&self, school: &NewSchool) -> Result<School>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_geojson(&self, path: &str, query: &[(&str, &str)]) -> Result<GeoJson> {
        let url = self.endpoint(path);
        info!("HTTP GET request to: {}", url);
        let resp = self.client.get(&url).query(query).send().await?;
        let body = ensure_success(resp, &url)?.text().await?;
        Ok(body.parse::<GeoJson>()?)
    }
}

fn ensure_success(resp: Response, url: &str) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp)
}

#[async_trait]
impl MapBackend for ApiClient {
    async fn schools(&self) -> Result<Vec<School>> {
        parse_schools(self.get_geojson("schools/", &[]).await?)
    }

    async fn districts(&self) -> Result<Vec<District>> {
        parse_districts(self.get_geojson("districts/", &[]).await?)
    }

    async fn district_stats(&self, district_id: &str) -> Result<DistrictStats> {
        let url = self.endpoint(&format!("districts/{}/stats/", district_id));
        info!("HTTP GET request to: {}", url);
        let resp = self.client.get(&url).send().await?;
        Ok(ensure_success(resp, &url)?.json::<DistrictStats>().await?)
    }

    async fn search_districts(&self, query: &str) -> Result<Vec<District>> {
        parse_districts(self.get_geojson("districts/", &[("search", query)]).await?)
    }

    async fn create_school(&self, school: &NewSchool) -> Result<School> {
        let url = self.endpoint("schools/");
        info!("HTTP POST request to: {} ({})", url, school.name);
        let resp = self.client.post(&url).json(school).send().await?;
        let feature = ensure_success(resp, &url)?.json::<Feature>().await?;
        school_from_feature(&feature).ok_or_else(|| BackendError::UnexpectedShape {
            expected: "a school point feature",
            found: "a feature without id or point geometry".to_string(),
        })
    }
}
