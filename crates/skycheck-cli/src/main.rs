//! skycheck: check that a city exists, then show its current weather.

mod error_mapping;
mod lookup;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use skycheck_core::{AppError, Config};
use skycheck_gazetteer::ValidationProblem;

use crate::lookup::{LookupOutcome, WeatherLookup};

/// City weather lookup
#[derive(Parser)]
#[command(name = "skycheck", about = "Validate a city and show its current weather")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    /// City name; the configured default city is used when omitted
    city: Option<String>,

    /// Two-letter country code
    #[arg(long, short)]
    country: Option<String>,

    /// Print the raw API response
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Only check that the city (and country) exist
    Validate {
        city: String,
        #[arg(long, short)]
        country: Option<String>,
    },
    /// Check a city (and country) and store it as the default location
    SetDefault {
        city: String,
        #[arg(long, short)]
        country: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    skycheck_core::init()?;
    let cli = Cli::parse();

    Ok(match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            eprintln!("{} ({})", e.user_message(), e);
            if e.is_retryable() {
                eprintln!("This may be temporary; try again shortly.");
            }
            ExitCode::FAILURE
        }
    })
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let (config, _) = Config::load_validated(cli.config.as_deref())?;
    let lookup = WeatherLookup::from_config(&config)?;

    match cli.command {
        Some(Command::Validate { city, country }) => {
            validate(&lookup, &city, country.as_deref())
        }
        Some(Command::SetDefault { city, country }) => {
            set_default(&lookup, cli.config.as_deref(), &city, country.as_deref())
        }
        None => fetch(&lookup, cli.city.as_deref(), cli.country.as_deref(), cli.json).await,
    }
}

fn validate(lookup: &WeatherLookup, city: &str, country: Option<&str>) -> Result<ExitCode, AppError> {
    let result = lookup.validate(Some(city), country)?;
    match result.problem() {
        Some(problem) => {
            let err = lookup.problem_error(problem, city, country);
            eprintln!("{}", err.user_message());
            Ok(ExitCode::from(2))
        }
        None => {
            println!("{} is a known city", city);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn set_default(
    lookup: &WeatherLookup,
    config_path: Option<&Path>,
    city: &str,
    country: Option<&str>,
) -> Result<ExitCode, AppError> {
    match store_default(lookup, config_path, city, country)? {
        Some(problem) => {
            let err = lookup.problem_error(problem, city, country);
            eprintln!("{}", err.user_message());
            Ok(ExitCode::from(2))
        }
        None => {
            println!("Default location set to {}", city);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Save a recognized city as the default; the file keeps its other settings.
/// Returns the problem instead when the city is not recognized.
fn store_default(
    lookup: &WeatherLookup,
    config_path: Option<&Path>,
    city: &str,
    country: Option<&str>,
) -> Result<Option<ValidationProblem>, AppError> {
    let country = country.filter(|c| !c.is_empty());
    if let Some(problem) = lookup.validate(Some(city), country)?.problem() {
        return Ok(Some(problem));
    }

    let (mut config, path) = Config::load_for_edit(config_path)?;
    config.weather.default_city = Some(city.to_string());
    config.weather.default_country_code = country.map(str::to_uppercase);
    config.save_to(&path)?;

    tracing::info!("Default location saved to {}", path.display());
    Ok(None)
}

async fn fetch(
    lookup: &WeatherLookup,
    city: Option<&str>,
    country: Option<&str>,
    json: bool,
) -> Result<ExitCode, AppError> {
    let (location, code) = lookup.effective_location(city, country);
    match lookup.lookup(city, country).await? {
        LookupOutcome::Invalid(problem) => {
            let err = lookup.problem_error(problem, location.unwrap_or_default(), code);
            eprintln!("{}", err.user_message());
            Ok(ExitCode::from(2))
        }
        LookupOutcome::Disabled => {
            println!("Weather lookups are disabled: no API key configured.");
            Ok(ExitCode::SUCCESS)
        }
        LookupOutcome::Weather(reading) => {
            if json {
                let pretty = serde_json::to_string_pretty(reading.payload())
                    .map_err(anyhow::Error::from)?;
                println!("{}", pretty);
            } else {
                let country_name = code.and_then(|c| lookup.country_label(c));
                println!("{}", weather_title(location, country_name));
                match reading.current() {
                    Some(current) => println!("{}", current),
                    None => println!("No current conditions in response."),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn weather_title(city: Option<&str>, country: Option<&str>) -> String {
    let mut title = String::new();
    if let Some(country) = country {
        title.push_str(&format!(" Country: {},", country));
    }
    if let Some(city) = city {
        title.push_str(&format!(" City: {}", city));
    }
    if title.is_empty() {
        "Weather:".to_string()
    } else {
        format!("Weather for:{}", title)
    }
}
