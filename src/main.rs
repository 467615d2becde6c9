pub mod api;
pub mod bounds;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod local;
pub mod render;
pub mod selection;
pub mod server;
pub mod stats;
pub mod theme;
pub mod types;
pub mod view;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{ApiClient, MapBackend};
use crate::config::AppConfig;
use crate::coordinator::CoordinatorHandle;
use crate::filter::ProvinceSelection;
use crate::local::LocalBackend;
use crate::selection::Action;
use crate::types::{Category, MapStyle};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Overrides `[api] base_url` from the config file
    #[arg(long, env = "SCHOOL_MAP_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive map and its JSON API
    Serve,
    /// Print school counts for a province
    Stats {
        #[arg(short, long, default_value = "all")]
        province: String,
    },
    /// Render the map to a PNG file
    Snapshot {
        #[arg(short, long, value_name = "FILE", default_value = "map.png")]
        out: PathBuf,
        #[arg(short, long, default_value = "all")]
        province: String,
        #[arg(short, long, value_enum, default_value_t = MapStyle::Dark)]
        style: MapStyle,
    },
    /// Create a school through the add-school flow
    AddSchool {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        category: Category,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lng: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("school_map=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let mut app_config = AppConfig::load_from_file(&cli.config)?;
    if let Some(url) = cli.api_url {
        app_config.api.base_url = url;
    }

    let backend = backend(&app_config)?;
    let coordinator = coordinator::spawn(Arc::clone(&backend));

    match cli.command {
        Commands::Serve => {
            info!("Serving map with config: {:?}", cli.config);
            server::start_server(&app_config, coordinator, backend).await?;
        }
        Commands::Stats { province } => {
            let snapshot = coordinator.wait_until_loaded().await?;
            let selection = ProvinceSelection::from(province.as_str());
            let stats = stats::province_stats(&snapshot.dataset, &selection);

            println!("Province: {}", selection);
            println!("Districts: {}", stats.total_districts);
            println!("Schools: {}", stats.total);
            let mut categories: Vec<_> = stats.by_category.iter().collect();
            categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (key, count) in categories {
                println!("  {:<20} {}", theme::category_label(key), count);
            }
        }
        Commands::Snapshot {
            out,
            province,
            style,
        } => {
            coordinator.wait_until_loaded().await?;
            let selection = ProvinceSelection::from(province.as_str());
            coordinator.dispatch(Action::SetMapStyle { style }).await?;
            coordinator
                .dispatch(Action::SelectProvince {
                    province: selection.clone(),
                })
                .await?;
            let snapshot = coordinator
                .wait_for(|s| s.view.map.style == style && s.view.sidebar.selected_province == selection)
                .await?;

            let img = render::render_snapshot(&snapshot, &app_config.render);
            render::save_snapshot(&img, &out)?;
        }
        Commands::AddSchool {
            name,
            category,
            lat,
            lng,
        } => {
            coordinator.wait_until_loaded().await?;
            add_school(&coordinator, name, category, lat, lng).await?;
        }
    }

    Ok(())
}

fn backend(config: &AppConfig) -> Result<Arc<dyn MapBackend>> {
    match &config.input {
        Some(input) => {
            info!("Using local GeoJSON input");
            let local = LocalBackend::from_files(&input.schools, &input.districts)
                .context("Failed to load local GeoJSON input")?;
            Ok(Arc::new(local))
        }
        None => {
            info!("Using backend at {}", config.api.base_url);
            let client = ApiClient::new(&config.api).context("Failed to build HTTP client")?;
            Ok(Arc::new(client))
        }
    }
}

/// Drives the same steps a user takes on the map: enter add mode, click the
/// location, fill in the form, submit.
async fn add_school(
    coordinator: &CoordinatorHandle,
    name: String,
    category: Category,
    lat: f64,
    lng: f64,
) -> Result<()> {
    for action in [
        Action::ToggleAddMode,
        Action::MapClick { lat, lng },
        Action::EditForm {
            name: Some(name.clone()),
            category: Some(category),
        },
    ] {
        coordinator.dispatch(action).await?;
    }
    coordinator
        .wait_for(|s| s.view.form.as_ref().is_some_and(|f| f.name == name))
        .await?;

    coordinator.dispatch(Action::SubmitForm).await?;
    let snapshot = coordinator
        .wait_for(|s| s.view.form.as_ref().map_or(true, |f| f.error.is_some()))
        .await?;

    if let Some(error) = snapshot.view.form.as_ref().and_then(|f| f.error.as_ref()) {
        bail!("{}", error);
    }
    println!("Created school {:?} at ({}, {})", name, lat, lng);
    Ok(())
}
