//! `parade_risk` command-line entry point.
//!
//! ```bash
//! # Risk of a bad beach day in Sydney on Jan 15, from the last 15 years
//! parade_risk analyze --city "Sydney, Australia" --date 2027-01-15 --activity "Beach Day"
//!
//! # Raw coordinates, with exports and a temperature trend
//! parade_risk analyze --lat 40.6936 --lon -89.589 --date 2027-07-04 --activity Parade \
//!     --format json --summary-out summary.json --table-out history.json --trend temp_max
//!
//! parade_risk profiles
//! parade_risk locations
//! ```

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use parade_risk::analysis::trend::{self, TrendVariable};
use parade_risk::analysis::{self, Analysis};
use parade_risk::assessment::advice;
use parade_risk::assessment::tiers::{Confidence, RiskTier};
use parade_risk::config::Settings;
use parade_risk::export::{self, ExportFormat, ExportMetadata, SummaryRow};
use parade_risk::ingest::power::PowerClient;
use parade_risk::ingest::{CachedFetcher, FetchProgress, HistoricalFetcher};
use parade_risk::locations::{self, LOCATION_REGISTRY};
use parade_risk::logging::{self, DataSource};
use parade_risk::model::FetchRequest;
use parade_risk::profiles::ActivityProfile;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "parade_risk",
    about = "Will it rain on my parade? Historical weather risk for a day and an activity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze historical weather risk for a location, date and activity
    Analyze(AnalyzeArgs),
    /// List activity profiles and their thresholds
    Profiles,
    /// List preset locations
    Locations,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Preset location, e.g. "Toronto" or "London, England"
    #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present = "lat")]
    city: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Label used for coordinates in the report and exports
    #[arg(long)]
    name: Option<String>,

    /// Target date (YYYY-MM-DD); only month and day are used
    #[arg(long)]
    date: NaiveDate,

    /// Activity profile name
    #[arg(long, default_value = "General Outdoor")]
    activity: String,

    /// Years of history to sample (default from settings, normally 15)
    #[arg(long)]
    years_back: Option<u32>,

    /// Export format for --summary-out and --table-out (csv or json)
    #[arg(long, default_value = "csv")]
    format: ExportFormat,

    /// Write the one-row summary here
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Write the filtered historical table here
    #[arg(long)]
    table_out: Option<PathBuf>,

    /// Print the year-over-year trend of a variable (e.g. temp_max, precipitation)
    #[arg(long)]
    trend: Option<TrendVariable>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let outcome = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Profiles => run_profiles(),
        Command::Locations => {
            run_locations();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_profiles() -> Result<(), Box<dyn Error>> {
    let settings = Settings::load()?;
    println!(
        "{:<18} {:>8} {:>8} {:>8} {:>8}  {}",
        "Activity", "min °C", "max °C", "rain mm", "wind m/s", "Description"
    );
    for p in settings.catalog().iter() {
        let t = p.thresholds;
        println!(
            "{:<18} {:>8.1} {:>8.1} {:>8.1} {:>8.1}  {}",
            p.name, t.temp_min, t.temp_max, t.rain, t.wind, p.description
        );
    }
    Ok(())
}

fn run_locations() {
    for l in LOCATION_REGISTRY {
        println!("{:<40} {:>9.4} {:>10.4}", l.display_name(), l.latitude, l.longitude);
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load()?;
    let catalog = settings.catalog();
    let profile = catalog.find(&args.activity).ok_or_else(|| {
        format!(
            "unknown activity '{}' (available: {})",
            args.activity,
            catalog.names().join(", ")
        )
    })?;

    let (place, latitude, longitude) = match (&args.city, args.lat, args.lon) {
        (Some(city), _, _) => {
            let l = locations::resolve_location(city)?;
            (l.display_name(), l.latitude, l.longitude)
        }
        (None, Some(lat), Some(lon)) => {
            let label = args.name.clone().unwrap_or_else(|| format!("{:.4}, {:.4}", lat, lon));
            (label, lat, lon)
        }
        _ => return Err("give either --city or both --lat and --lon".into()),
    };

    let years_back = args.years_back.unwrap_or(settings.fetch.years_back);
    let request = FetchRequest::new(latitude, longitude, args.date.month(), args.date.day(), years_back)?;

    let client = PowerClient::with_settings(
        &settings.provider.base_url,
        &settings.provider.community,
        settings.provider.timeout(),
    )?;
    // One analysis per process: this cache never hits, but keeps the same
    // code path as library callers that hold the fetcher.
    let fetcher = CachedFetcher::with_cache(
        HistoricalFetcher::with_floor_year(client, settings.fetch.floor_year),
        settings.cache.ttl(),
        settings.cache.capacity,
    );

    logging::info(
        DataSource::System,
        Some(&request.label()),
        &format!("analyzing '{}' for {}", profile.name, place),
    );
    let result = analysis::analyze_request(&fetcher, &request, &profile.thresholds, print_progress)?;
    eprintln!();

    print_report(&place, args.date, profile, &result);

    if let Some(variable) = args.trend {
        print_trend(&result, variable);
    }

    let generated_on = Utc::now().date_naive();
    if let Some(path) = &args.summary_out {
        let metadata = ExportMetadata::new(
            &place,
            latitude,
            longitude,
            args.date,
            generated_on,
            &export::SUMMARY_COLUMNS,
        );
        let row = SummaryRow::from_result(&place, args.date, &profile.name, &result.result);
        export::write_summary_file(path, args.format, &metadata, &row)?;
        logging::info(
            DataSource::Export,
            None,
            &format!("summary written to {}", path.display()),
        );
    }
    if let Some(path) = &args.table_out {
        let metadata = ExportMetadata::new(
            &place,
            latitude,
            longitude,
            args.date,
            generated_on,
            &export::TABLE_COLUMNS,
        );
        export::write_table_file(path, args.format, &metadata, &result.result.filtered_table)?;
        logging::info(
            DataSource::Export,
            None,
            &format!(
                "{} records written to {}",
                result.result.filtered_table.len(),
                path.display()
            ),
        );
    }
    Ok(())
}

fn print_progress(p: FetchProgress) {
    eprint!("\rFetching {} ({}/{})...", p.year, p.index, p.total);
}

fn print_report(place: &str, date: NaiveDate, profile: &ActivityProfile, analysis: &Analysis) {
    let r = &analysis.result;
    let s = &r.stats;

    println!("{} on {} for {}", place, date.format("%B %-d"), profile.name);
    println!(
        "Overall risk: {:.1}% ({})    Confidence: {}",
        r.overall_risk,
        RiskTier::from_overall(r.overall_risk),
        Confidence::of(s)
    );
    println!(
        "Based on {} days from {} of {} years",
        s.total_days, analysis.successful_years, analysis.requested_years
    );
    println!();

    println!("Risk factors");
    for (name, pct) in r.risks.core() {
        println!("  {:<20} {:>5.1}%", name, pct);
    }
    if let Some(pct) = r.risks.high_humidity {
        println!("  {:<20} {:>5.1}%", "high_humidity", pct);
    }
    if let Some(pct) = r.risks.uncomfortable_heat {
        println!("  {:<20} {:>5.1}%", "uncomfortable_heat", pct);
    }
    println!();

    println!("Typical conditions");
    println!("  High / low           {:.1} / {:.1} °C", s.typical_high, s.typical_low);
    println!("  Average temperature  {:.1} °C", s.avg_temp);
    println!("  Record high / low    {:.1} / {:.1} °C", s.max_temp_ever, s.min_temp_ever);
    println!(
        "  Rain days            {} of {} ({:.0}%)",
        s.rainy_days,
        s.total_days,
        s.rain_chance()
    );
    println!("  Precipitation        avg {:.1} mm, max {:.1} mm", s.avg_precip, s.max_precip_ever);
    println!("  Wind                 avg {:.1} m/s, max {:.1} m/s", s.avg_wind, s.max_wind_ever);
    if let Some(h) = s.avg_humidity {
        println!("  Humidity             {:.0}%", h);
    }
    if let Some(c) = s.avg_cloud_cover {
        println!("  Cloud cover          {:.0}%", c);
    }
    println!();

    println!("{}", advice::recommend(r.overall_risk, &profile.name).message);

    let good = advice::favorable_conditions(&r.risks);
    println!("Favorable:");
    if good.is_empty() {
        println!("  - Weather conditions are highly variable");
    }
    for g in good {
        println!("  - {}", g);
    }

    let concerns = advice::concerns(&r.risks);
    println!("Watch out for:");
    if concerns.is_empty() {
        println!("  - No major weather concerns identified");
    }
    for c in concerns {
        println!("  - {}", c);
    }

    for a in &analysis.advisories {
        println!();
        println!("Note: {}", a);
    }
}

fn print_trend(analysis: &Analysis, variable: TrendVariable) {
    let t = trend::yearly_trend(&analysis.result.filtered_table, variable);
    println!();
    println!("Trend: {} ({})", variable, variable.unit());
    for p in &t.points {
        match p.moving_average {
            Some(ma) => println!("  {}  {:>7.2}  (3-yr avg {:.2})", p.year, p.mean, ma),
            None => println!("  {}  {:>7.2}", p.year, p.mean),
        }
    }
    match t.slope_per_year {
        Some(slope) => println!("  slope: {:+.3} {}/year", slope, variable.unit()),
        None => println!("  not enough years for a slope"),
    }
}
