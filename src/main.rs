// Entry point and command-line flow.
//
// - `delays` writes the five delay tables from the vessel sheet.
// - `report` prints every dashboard section and writes a JSON summary.
// - `interactive` (the default) offers both from a menu, loading each
//   source only once per run.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use port_report::config::ReportConfig;
use port_report::output::{self, preview_section};
use port_report::pipeline::{self, Report, Session};
use port_report::temporal::TimestampPolicy;
use port_report::util::{format_int, format_number};

// Loaded tables survive across menu choices.
static SESSION: Lazy<Mutex<Session>> = Lazy::new(|| Mutex::new(Session::new()));

#[derive(Parser, Debug)]
#[command(name = "port_report", about = "Port-call delay and trade analytics")]
struct Cli {
    #[command(flatten)]
    sources: SourceArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Vessel operations sheet (.xlsx, .xls, .ods or .csv)
    #[arg(long, env = "PORT_REPORT_VESSELS", default_value = "vessel_calls.xlsx")]
    vessels: PathBuf,

    /// Foreign trade sheet; the report still runs without it
    #[arg(long, env = "PORT_REPORT_TRADE", default_value = "trade.xlsx")]
    trade: PathBuf,

    /// Directory for the generated tables
    #[arg(long, env = "PORT_REPORT_OUT", default_value = ".")]
    out_dir: PathBuf,

    /// Reporting year (trade column headers, movement seasonality)
    #[arg(long, env = "PORT_REPORT_YEAR", default_value_t = 2024)]
    year: i32,

    /// Timestamp format of the vessel sheet; "lenient" accepts any known format
    #[arg(long, env = "PORT_REPORT_TIMESTAMP_FORMAT", default_value = "%d/%m/%Y %H:%M")]
    timestamp_format: String,

    /// Rows shown per section preview
    #[arg(long, env = "PORT_REPORT_PREVIEW_ROWS", default_value_t = 5)]
    preview_rows: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the delay tables
    Delays,
    /// Print the dashboard sections and write report_summary.json
    Report,
    /// Menu-driven session (default)
    Interactive,
}

impl SourceArgs {
    fn into_config(self) -> ReportConfig {
        let timestamps = if self.timestamp_format.eq_ignore_ascii_case("lenient") {
            TimestampPolicy::Lenient
        } else {
            TimestampPolicy::Strict(self.timestamp_format)
        };
        ReportConfig {
            vessel_path: self.vessels,
            trade_path: self.trade,
            output_dir: self.out_dir,
            report_year: self.year,
            timestamps,
            preview_rows: self.preview_rows,
            ..ReportConfig::default()
        }
    }
}

fn session() -> std::sync::MutexGuard<'static, Session> {
    SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing the common prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(config: &ReportConfig) -> Result<()> {
    let mut session = session();
    let vessels = session
        .dashboard_vessels(config)
        .with_context(|| format!("loading {}", config.vessel_path.display()))?;
    println!(
        "Vessel calls loaded: {} calls with cargo movements",
        format_int(vessels.calls.len() as u64)
    );
    match session.trade(config).get() {
        Some(trade) => println!("Trade records loaded: {}", format_int(trade.records.len() as u64)),
        None => println!("Trade dataset unavailable; trade sections will be skipped."),
    }
    println!();
    Ok(())
}

fn handle_delays(config: &ReportConfig) -> Result<()> {
    let written = pipeline::run_delays(&mut session(), config)
        .with_context(|| format!("generating delay tables from {}", config.vessel_path.display()))?;
    println!("Delay tables saved:");
    for path in &written {
        println!("  {}", path.display());
    }
    println!();
    Ok(())
}

fn print_report(report: &Report, rows: usize) {
    preview_section("Monthly mean port stay vs operation time (hours)", &report.stay_vs_operation, rows);
    preview_section(
        "Monthly mean port stay vs operation time, outliers removed",
        &report.stay_vs_operation_filtered,
        rows,
    );
    preview_section("Monthly operational vs non-operational time", &report.operational_split, rows);
    preview_section(
        "Monthly operational vs non-operational time, outliers removed",
        &report.operational_split_filtered,
        rows,
    );
    preview_section("Total movements per month", &report.movements, rows);
    preview_section("Movements vs operation hours per month", &report.movements_vs_operation, rows);
    preview_section("Movements vs port stay hours per month", &report.movements_vs_stay, rows);
    preview_section("Mean port stay minus operation time per month", &report.stay_operation_gap, rows);
    preview_section("Movement seasonality", &report.movement_seasonality, rows);
    preview_section("Export + import weight per month", &report.trade_seasonality, rows);
    preview_section("Most efficient services (movements per hour)", &report.service_efficiency, rows);
    preview_section("Top exports by municipality and product", &report.municipality_exports, rows);

    let countries = report.country_concentration.clone().map(|c| {
        println!(
            "Top 3 destination countries hold {}% of exports.\n",
            format_number(c.top3_share_pct, 2)
        );
        c.top
    });
    preview_section("Export share by destination country", &countries, rows);
    preview_section("Sections with the highest FOB value per kg", &report.high_value_sections, rows);
}

fn handle_report(config: &ReportConfig) -> Result<()> {
    let report = pipeline::build_report(&mut session(), config)
        .with_context(|| format!("building report from {}", config.vessel_path.display()))?;
    print_report(&report, config.preview_rows);

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let summary_path = config.output_dir.join("report_summary.json");
    output::write_json(&summary_path, &report.summary)?;
    println!("Summary saved to {}", summary_path.display());
    println!(
        "{{\"total_vessel_calls\": {}, \"period\": \"{} to {}\"}}\n",
        format_int(report.summary.total_vessel_calls as u64),
        report.summary.first_month.map(|m| m.to_string()).unwrap_or_default(),
        report.summary.last_month.map(|m| m.to_string()).unwrap_or_default(),
    );
    Ok(())
}

fn interactive(config: &ReportConfig) {
    loop {
        println!("Port Report:");
        println!("[1] Load the files");
        println!("[2] Generate delay tables");
        println!("[3] Show report sections\n");
        let result = match read_choice().as_str() {
            "1" => handle_load(config),
            "2" => handle_delays(config),
            "3" => handle_report(config),
            "" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
                continue;
            }
        };
        if let Err(e) = result {
            error!("{:#}", e);
            continue;
        }
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.sources.into_config();
    info!(
        "vessels: {}, trade: {}, output: {}",
        config.vessel_path.display(),
        config.trade_path.display(),
        config.output_dir.display()
    );

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Delays => handle_delays(&config),
        Command::Report => handle_report(&config),
        Command::Interactive => {
            interactive(&config);
            Ok(())
        }
    }
}
