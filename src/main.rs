//! spotfinder: fishing spot analysis relay and command-line client.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use spotfinder_core::{AppError, Config, ConfigError, CredentialProvider};
use spotfinder_geo::location::{FixedPosition, Unsupported};
use spotfinder_geo::{Bounds, Coordinate, GeolocationResolver, PositionSource, SessionLocation};
use spotfinder_server::AppState;
use spotfinder_store::{SecretResolver, SecretStore, SqliteStore};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "spotfinder", version, about = "Fishing spot finder relay")]
struct Cli {
    /// Config file (defaults to <config dir>/spotfinder/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the JSON relay
    Serve {
        #[arg(long)]
        bind: Option<IpAddr>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fish species for a place, from the store when already analyzed
    Analyze {
        #[arg(long)]
        place_id: String,
        #[arg(long)]
        name: String,
    },
    /// Current weather with fishing commentary
    Weather(CoordArgs),
    /// Regulations for a coordinate or a named region
    Regulations {
        #[command(flatten)]
        coord: OptionalCoordArgs,
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        region: Option<String>,
    },
    /// Region name for a coordinate, or for the configured home position
    Region(OptionalCoordArgs),
    /// Candidate fishing spots near a coordinate
    Spots {
        #[command(flatten)]
        coord: CoordArgs,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        keyword: Option<String>,
    },
    /// Ask the fishing expert
    Chat {
        message: String,
        #[arg(long, default_value = "")]
        region: String,
    },
    /// Identify the fish in a photo
    Identify { image: PathBuf },
    /// Marine protected areas inside a bounding box
    Areas {
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        #[arg(long, allow_hyphen_values = true)]
        west: f64,
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
    },
    /// Generate descriptions for stored spots that lack one
    BackfillDescriptions,
    /// Manage stored provider keys
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand)]
enum SecretAction {
    /// Store a key, overriding the environment
    Set { name: String, value: String },
}

#[derive(Args)]
struct CoordArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,
}

impl CoordArgs {
    fn coordinate(&self) -> Result<Coordinate> {
        Ok(Coordinate::new(self.lat, self.lng).validated()?)
    }
}

#[derive(Args)]
struct OptionalCoordArgs {
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lng: Option<f64>,
}

impl OptionalCoordArgs {
    fn coordinate(&self) -> Result<Option<Coordinate>> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Ok(Some(Coordinate::new(lat, lng).validated()?)),
            _ => Ok(None),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Position from the command line, otherwise from the configured home.
async fn locate(config: &Config, coord: &OptionalCoordArgs) -> Result<Coordinate> {
    if let Some(coord) = coord.coordinate()? {
        return Ok(coord);
    }
    let source: Arc<dyn PositionSource> = match config.location.home {
        Some(home) => Arc::new(FixedPosition(Coordinate::new(home.latitude, home.longitude))),
        None => Arc::new(Unsupported),
    };
    let session = SessionLocation::new(GeolocationResolver::new(
        source,
        Duration::from_secs(config.location.timeout_secs),
    ));
    session
        .get_or_resolve()
        .await
        .context("No --lat/--lng given and no usable [location.home] in config")
}

#[tokio::main]
async fn main() -> Result<()> {
    spotfinder_core::init()?;
    let cli = Cli::parse();

    let (config, validation) = Config::load_validated(cli.config.as_deref())?;
    for warning in &validation.warnings {
        tracing::warn!("Config: {}", warning);
    }
    if !validation.is_valid() {
        return Err(AppError::Config(ConfigError::Invalid(validation.error_summary())).into());
    }

    let store = Arc::new(
        SqliteStore::open(config.store_path())
            .with_context(|| format!("Failed to open store at {}", config.store_path().display()))?,
    );

    if let Command::Secret {
        action: SecretAction::Set { name, value },
    } = &cli.command
    {
        store.set_secret(name, value)?;
        println!("Stored {}", name);
        return Ok(());
    }

    let credentials: Arc<dyn CredentialProvider> = Arc::new(SecretResolver::new(store.clone()));
    let state = AppState::from_config(&config, credentials, store)?;

    match cli.command {
        Command::Serve { bind, port } => {
            let ip = match bind {
                Some(ip) => ip,
                None => config.server.bind_address.parse()?,
            };
            let addr = SocketAddr::new(ip, port.unwrap_or(config.server.port));
            spotfinder_server::serve(state, addr, &config.server.cors_origin()).await?;
        }
        Command::Analyze { place_id, name } => {
            print_json(&state.spots.get_analysis(&place_id, &name).await?)?;
        }
        Command::Weather(coord) => {
            print_json(&state.weather.analyze(coord.coordinate()?).await?)?;
        }
        Command::Regulations { coord, region } => {
            let info = match region {
                Some(region) => state.regulations.for_region(&region).await?,
                None => {
                    let coord = locate(&config, &coord).await?;
                    state.regulations.get_regulations(coord).await?
                }
            };
            print_json(&info)?;
        }
        Command::Region(coord) => {
            let coord = locate(&config, &coord).await?;
            println!("{}", state.regions.resolve_region(coord).await);
        }
        Command::Spots {
            coord,
            radius,
            keyword,
        } => {
            let places = state
                .places
                .nearby_search(
                    coord.coordinate()?,
                    radius.unwrap_or(config.places.radius_meters),
                    keyword.as_deref().unwrap_or(&config.places.keyword),
                )
                .await?;
            print_json(&places)?;
        }
        Command::Chat { message, region } => {
            println!("{}", state.chat.chat(&message, &region).await?);
        }
        Command::Identify { image } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            print_json(&state.fish.identify(bytes).await?)?;
        }
        Command::Areas {
            south,
            west,
            north,
            east,
        } => {
            let areas = state
                .mpa
                .fetch_in_bounds(Bounds {
                    south,
                    west,
                    north,
                    east,
                })
                .await?;
            let stored = state.areas.upsert_areas(&areas)?;
            tracing::info!("Stored {} protected areas", stored);
            print_json(&areas)?;
        }
        Command::BackfillDescriptions => {
            let report = state.backfill.run().await?;
            println!(
                "Updated {} fishing spot descriptions ({} failed)",
                report.updated, report.failed
            );
        }
        Command::Secret { .. } => {}
    }

    Ok(())
}
