mod console;
mod transcript;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use console::ConsoleState;
use lgview_model::{DiagnosticMethod, Location, NetworkInfo, SpeedTestSize};
use lgview_stream::{
    speedtest_url, ClientConfig, ExecutionController, ExecutionPhase, HttpSettings,
    HttpTransport, LocationContext, API_URL_ENV, DEFAULT_API_URL, LOCATIONS_ENV,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use transcript::{write_json, Transcript};

#[derive(Parser)]
#[command(name = "lgview", version, about = "Looking-glass client")]
struct Cli {
    /// Base URL used when no location list is configured.
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// JSON list of {"id","name","url"} location records.
    #[arg(long, env = LOCATIONS_ENV, global = true)]
    locations: Option<String>,

    #[arg(long, default_value_t = 10_000, global = true)]
    connect_timeout_ms: u64,

    #[arg(long, default_value_t = 15_000, global = true)]
    request_timeout_ms: u64,

    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured test locations.
    Locations,
    Info(InfoArgs),
    Run(RunArgs),
    Console(ConsoleArgs),
    Speedtest(SpeedtestArgs),
}

#[derive(Args)]
#[command(about = "Show the network identity of a test location")]
struct InfoArgs {
    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
#[command(
    about = "Stream a diagnostic command from a test location. Ctrl-C cancels the run."
)]
struct RunArgs {
    /// ping, ping6, traceroute, traceroute6, mtr or mtr6
    method: DiagnosticMethod,

    target: String,

    #[arg(long)]
    location: Option<String>,

    /// Write a JSON transcript of the run to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
#[command(about = "Interactive terminal: Enter runs or cancels, Tab switches method, arrows switch location")]
struct ConsoleArgs {
    #[arg(long)]
    location: Option<String>,

    #[arg(long, default_value = "ping")]
    method: DiagnosticMethod,

    #[arg(long, default_value = "google.com")]
    target: String,
}

#[derive(Args)]
#[command(about = "Print the speed test download URL of a test location")]
struct SpeedtestArgs {
    /// 100m, 1g or 10g
    #[arg(long, default_value = "100m")]
    size: SpeedTestSize,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    open: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Console(_)));

    let config = ClientConfig {
        default_url: cli.api_url,
        locations_json: cli.locations,
        http: HttpSettings {
            connect_timeout_ms: cli.connect_timeout_ms,
            request_timeout_ms: cli.request_timeout_ms,
        },
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command {
        Commands::Locations => run_locations(&config),
        Commands::Info(args) => runtime.block_on(run_info(args, &config)),
        Commands::Run(args) => runtime.block_on(run_run(args, &config)),
        Commands::Console(args) => runtime.block_on(run_console(args, &config)),
        Commands::Speedtest(args) => run_speedtest(args, &config),
    }
}

fn init_tracing(verbose: u8, interactive: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // The console owns the whole screen; log lines would tear it.
    if interactive {
        builder.with_writer(io::sink).init();
    } else {
        builder.with_writer(io::stderr).init();
    }
}

fn location_context(config: &ClientConfig, selected: Option<&str>) -> Result<LocationContext> {
    let mut locations = LocationContext::from_config(config);
    if let Some(id) = selected {
        locations.select(id)?;
    }
    Ok(locations)
}

fn current_location(locations: &LocationContext) -> Result<Location> {
    locations
        .current()
        .cloned()
        .ok_or_else(|| anyhow!("no location selected"))
}

fn run_locations(config: &ClientConfig) -> Result<()> {
    let locations = LocationContext::from_config(config);
    let current = locations.current_index();
    let id_width = locations
        .locations()
        .iter()
        .map(|location| location.id.len())
        .max()
        .unwrap_or(0);

    for (index, location) in locations.locations().iter().enumerate() {
        let marker = if Some(index) == current { '*' } else { ' ' };
        println!(
            "{marker} {:<id_width$}  {}  ({})",
            location.id, location.name, location.url
        );
    }
    Ok(())
}

async fn run_info(args: InfoArgs, config: &ClientConfig) -> Result<()> {
    let locations = location_context(config, args.location.as_deref())?;
    let location = current_location(&locations)?;
    let transport = HttpTransport::new(config.http.clone())?;

    let info = transport
        .network_info(&location.url)
        .await
        .with_context(|| format!("failed to load network information from {}", location.url))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(&location, &info);
    }
    Ok(())
}

fn print_info(location: &Location, info: &NetworkInfo) {
    println!("{} ({})", location.name, location.url);
    println!("  location:     {}", info.location);
    println!("  map:          {}", info.map_url);
    println!("  facility:     {}", info.facility);
    println!("  facility url: {}", info.facility_url);
    println!("  ipv4:         {}", info.looking_glass_ipv4);
    println!("  ipv6:         {}", info.looking_glass_ipv6);
    println!("  your ip:      {}", info.your_ip);
}

async fn run_run(args: RunArgs, config: &ClientConfig) -> Result<()> {
    let locations = location_context(config, args.location.as_deref())?;
    let transport = Arc::new(HttpTransport::new(config.http.clone())?);
    let mut controller = ExecutionController::new(transport);

    let (interrupt_tx, mut interrupt_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let started_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    controller.start(args.method, &args.target, locations.current())?;

    let mut printed = 0;
    while controller.is_running() {
        tokio::select! {
            event = controller.next_event() => match event {
                Some(event) => {
                    controller.apply(event);
                }
                None => break,
            },
            Some(()) = interrupt_rx.recv() => {
                controller.cancel();
            }
        }
        printed = flush_output(controller.output(), printed)?;
    }
    flush_output(controller.output(), printed)?;
    if !controller.output().ends_with('\n') {
        println!();
    }

    let phase = controller.phase();
    if let (Some(path), Some(state)) = (&args.out, controller.state()) {
        let transcript = Transcript {
            version: env!("CARGO_PKG_VERSION").to_string(),
            location: state.location().clone(),
            method: state.method(),
            target: state.target().to_string(),
            started_at_utc,
            finished_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            outcome: phase_name(phase).to_string(),
            output: state.output().to_string(),
        };
        write_json(path, &transcript)?;
    }

    match phase {
        ExecutionPhase::Failed => Err(anyhow!("{} {} failed", args.method, args.target)),
        _ => Ok(()),
    }
}

fn flush_output(output: &str, printed: usize) -> Result<usize> {
    if output.len() > printed {
        let mut stdout = io::stdout();
        stdout
            .write_all(output[printed..].as_bytes())
            .context("failed to write output")?;
        stdout.flush().context("failed to flush output")?;
    }
    Ok(output.len())
}

fn phase_name(phase: ExecutionPhase) -> &'static str {
    match phase {
        ExecutionPhase::Idle => "idle",
        ExecutionPhase::Running => "running",
        ExecutionPhase::Completed => "completed",
        ExecutionPhase::Failed => "failed",
        ExecutionPhase::Cancelled => "cancelled",
    }
}

async fn run_console(args: ConsoleArgs, config: &ClientConfig) -> Result<()> {
    let locations = location_context(config, args.location.as_deref())?;
    let transport = Arc::new(HttpTransport::new(config.http.clone())?);
    let state = ConsoleState::new(args.method, args.target);
    console::run(locations, transport, state).await
}

fn run_speedtest(args: SpeedtestArgs, config: &ClientConfig) -> Result<()> {
    let locations = location_context(config, args.location.as_deref())?;
    let location = current_location(&locations)?;
    let url = speedtest_url(&location.url, args.size);
    println!("{url}");

    if args.open {
        open_url(&url)?;
    }
    Ok(())
}

fn open_url(url: &str) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "linux") {
        Command::new("xdg-open")
    } else {
        return Err(anyhow!("--open is not supported on this OS"));
    };

    let status = cmd
        .arg(url)
        .status()
        .map_err(|err| anyhow!("failed to launch opener: {err}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("open command failed with status: {status}"))
    }
}
