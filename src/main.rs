//! CLI entry point for the parcel rater.
//!
//! Quotes UPS and USPS, downloads UPS Ground transit maps, looks up zones,
//! and picks the cheapest rate that arrives by a deadline.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use parcel_rater::{
    common::{Carrier, Dimensions, Location, Rate, RateRequest, Weight},
    config::{self, UpsCredentials, UspsCredentials},
    fetch::{BasicClient, UserAgent},
    ground::{ColorLegend, GeometryTable, GroundTransit},
    infra::{
        ups::{self, TokenStore, UpsClient, maps, zones},
        usps::UspsClient,
    },
    output::{ZoneRecord, append_records, print_json, print_pretty, write_zones},
    rates::{best_rate, normalize},
    services::CarrierApi,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "parcel_rater")]
#[command(about = "Compare UPS and USPS parcel rates", long_about = None)]
struct Cli {
    /// Alternate Ground map region table (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    regions: Option<PathBuf>,

    /// Alternate Ground map color legend (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    legend: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Package and route shared by the quoting commands.
#[derive(Args)]
struct PackageArgs {
    /// Origin zip code
    #[arg(short, long)]
    from_zip: String,

    /// Package weight in ounces
    #[arg(short = 'z', long)]
    ounces: u32,

    /// Package size as LxWxH in inches
    #[arg(short, long)]
    size: Dimensions,

    /// Ship date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct GroundArgs {
    /// Directory holding downloaded Ground maps and maps.csv
    #[arg(long, default_value = ".")]
    map_dir: PathBuf,

    /// Keep the carrier's Ground estimate instead of reading the map
    #[arg(long)]
    ignore_ground: bool,

    /// Request a new UPS token instead of using the cached one
    #[arg(long)]
    new_token: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote UPS services
    Ups {
        #[command(flatten)]
        package: PackageArgs,

        /// Destination as STATE,ZIP (e.g. CA,94103)
        #[arg(short, long, value_name = "STATE,ZIP")]
        to_loc: String,

        #[command(flatten)]
        ground: GroundArgs,

        /// Download the Ground map for the origin before quoting
        #[arg(long)]
        download_maps: bool,

        /// CSV file to append rates to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Quote USPS services
    Usps {
        #[command(flatten)]
        package: PackageArgs,

        /// Destination zip code
        #[arg(short, long)]
        to_zip: String,

        /// CSV file to append rates to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Quote both carriers and pick the cheapest rate arriving in time
    Best {
        #[command(flatten)]
        package: PackageArgs,

        /// Destination as STATE,ZIP (e.g. CA,94103)
        #[arg(short, long, value_name = "STATE,ZIP")]
        to_loc: String,

        /// Latest acceptable delivery date (YYYY-MM-DD)
        #[arg(short, long)]
        arrive_by: NaiveDate,

        #[command(flatten)]
        ground: GroundArgs,
    },
    /// Request a new UPS OAuth token and print it
    UpsToken,
    /// Download UPS Ground maps for comma-separated origin zips
    UpsMaps {
        /// Origin zips, comma separated
        #[arg(value_name = "FROM_ZIPS")]
        from_zips: String,

        /// Directory to save maps and maps.csv in
        #[arg(short = 'd', long, default_value = ".")]
        map_dir: PathBuf,

        /// Maximum number of concurrent downloads
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Print UPS Ground and USPS zones from one origin to comma-separated
    /// destinations as CSV
    Zones {
        from_zip: String,

        /// Destination zips, comma separated
        to_zips: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/parcel_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("parcel_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let ground = ground_transit(cli.regions.as_deref(), cli.legend.as_deref())?;

    match cli.command {
        Commands::Ups {
            package,
            to_loc,
            ground: ground_args,
            download_maps,
            output,
        } => {
            let (to_state, to_zip) = parse_to_loc(&to_loc)?;
            let request = rate_request(&package, Some(to_state), to_zip);

            if download_maps {
                fetch_maps(&[package.from_zip.clone()], &ground_args.map_dir, 1).await?;
            }

            let client = ups_client(ground_args.new_token).await?;
            let response = client.quote(&request).await?;
            let rates = normalize(
                &response,
                &request,
                &ground,
                &ground_args.map_dir,
                ground_args.ignore_ground,
            );

            emit(Carrier::Ups, &rates, output.as_deref())?;
        }
        Commands::Usps {
            package,
            to_zip,
            output,
        } => {
            let request = rate_request(&package, None, to_zip);
            let client = usps_client()?;
            let response = client.quote(&request).await?;
            let rates = normalize(&response, &request, &ground, Path::new("."), true);

            emit(Carrier::Usps, &rates, output.as_deref())?;
        }
        Commands::Best {
            package,
            to_loc,
            arrive_by,
            ground: ground_args,
        } => {
            let (to_state, to_zip) = parse_to_loc(&to_loc)?;
            let request = rate_request(&package, Some(to_state), to_zip);

            let mut carriers: Vec<Box<dyn CarrierApi>> = Vec::new();
            match ups_client(ground_args.new_token).await {
                Ok(client) => carriers.push(Box::new(client)),
                Err(e) => warn!(error = %e, "Skipping UPS"),
            }
            match usps_client() {
                Ok(client) => carriers.push(Box::new(client)),
                Err(e) => warn!(error = %e, "Skipping USPS"),
            }

            let mut rates = Vec::new();
            for carrier in &carriers {
                match carrier.quote(&request).await {
                    Ok(response) => rates.extend(normalize(
                        &response,
                        &request,
                        &ground,
                        &ground_args.map_dir,
                        ground_args.ignore_ground,
                    )),
                    Err(e) => error!(carrier = %carrier.carrier(), error = %e, "Quote failed"),
                }
            }

            print_pretty(&rates);
            let best = best_rate(&rates, arrive_by)?;
            info!(service = %best.service, price = %best.price, "Best rate selected");
            print_json(&best)?;
        }
        Commands::UpsToken => {
            let credentials = UpsCredentials::from_env()?;
            let store = TokenStore::new(config::ups_token_path());
            let token = ups::get_token(
                BasicClient::new(),
                ups::UPS_API_URL,
                &credentials,
                &store,
                true,
            )
            .await?;
            print_json(&token)?;
        }
        Commands::UpsMaps {
            from_zips,
            map_dir,
            concurrency,
        } => {
            let zips = split_list(&from_zips);
            fetch_maps(&zips, &map_dir, concurrency).await?;
        }
        Commands::Zones { from_zip, to_zips } => {
            let to_zips = split_list(&to_zips);
            let http = UserAgent::new(BasicClient::new(), &config::user_agent());

            let ups_zones =
                zones::ground_zones(&http, maps::UPS_WEB_URL, &from_zip, &to_zips).await?;

            // GetZone is a public endpoint; no Web Tools user is needed.
            let usps = UspsClient::new(
                &http,
                UspsCredentials {
                    user_id: String::new(),
                    password: String::new(),
                },
            );
            let usps_zones = usps.zones(&from_zip, &to_zips, today()).await?;

            let records: Vec<_> = to_zips
                .into_iter()
                .zip(ups_zones.into_iter().zip(usps_zones))
                .map(|(to_zip, (ups_zone, usps_zone))| ZoneRecord {
                    from_zip: from_zip.clone(),
                    to_zip,
                    ups_zone,
                    usps_zone,
                })
                .collect();
            write_zones(std::io::stdout().lock(), &records)?;
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits `STATE,ZIP`.
fn parse_to_loc(to_loc: &str) -> Result<(String, String)> {
    match to_loc.split_once(',') {
        Some((state, zip)) if !state.trim().is_empty() && !zip.trim().is_empty() => {
            Ok((state.trim().to_uppercase(), zip.trim().to_string()))
        }
        _ => bail!("destination must be STATE,ZIP, got '{to_loc}'"),
    }
}

fn rate_request(package: &PackageArgs, to_state: Option<String>, to_zip: String) -> RateRequest {
    RateRequest {
        origination: Location::us(package.from_zip.clone(), None),
        destination: Location::us(to_zip, to_state),
        weight: Weight::new(0, package.ounces),
        dimensions: package.size,
        ship_date: package.date.unwrap_or_else(today),
    }
}

fn ground_transit(regions: Option<&Path>, legend: Option<&Path>) -> Result<GroundTransit> {
    let geometry = match regions {
        Some(path) => GeometryTable::load(path)?,
        None => GeometryTable::bundled()?,
    };
    let legend = match legend {
        Some(path) => ColorLegend::load(path)?,
        None => ColorLegend::bundled()?,
    };
    Ok(GroundTransit::new(geometry, legend))
}

async fn ups_client(new_token: bool) -> Result<UpsClient<BasicClient>> {
    let credentials = UpsCredentials::from_env()?;
    let store = TokenStore::new(config::ups_token_path());
    let http = BasicClient::new();
    let token = ups::get_token(&http, ups::UPS_API_URL, &credentials, &store, new_token)
        .await
        .context("failed to obtain UPS token")?;
    Ok(UpsClient::new(http, &token.access_token)?)
}

fn usps_client() -> Result<UspsClient<BasicClient>> {
    Ok(UspsClient::new(BasicClient::new(), UspsCredentials::from_env()?))
}

async fn fetch_maps(zips: &[String], map_dir: &Path, concurrency: usize) -> Result<()> {
    let http = Arc::new(UserAgent::new(BasicClient::new(), &config::user_agent()));
    let indexed =
        maps::download_maps(http, maps::UPS_WEB_URL, zips, today(), map_dir, concurrency).await?;
    if indexed == 0 && !zips.is_empty() {
        bail!("no maps were downloaded");
    }
    Ok(())
}

fn emit(carrier: Carrier, rates: &[Rate], output: Option<&str>) -> Result<()> {
    print_pretty(rates);
    if let Some(path) = output {
        append_records(path, carrier, rates)?;
        info!(path, rows = rates.len(), "Rates written");
    }
    print_json(rates)
}
