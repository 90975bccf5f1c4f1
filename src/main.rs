use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use p2x_calc::backend::{submit, HttpBackend};
use p2x_calc::config::{BodyEncoding, Config, ConfigOverrides};
use p2x_calc::forms::{BeksForm, CalculatorForm, DsrForm, P2gForm, P2hForm};
use p2x_calc::output::csv::{report_to_csv, request_to_csv};
use p2x_calc::output::json::render_json;
use p2x_calc::output::table::{render_report, render_request_table};
use p2x_calc::output::CalculationReport;
use p2x_calc::products::CalculatorVariant;
use p2x_calc::response::CalculationResult;
use p2x_calc::server::run_server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "p2x-calc",
    about = "Balancing-market calculators for BEKS, P2H, P2G and DSR assets"
)]
struct Cli {
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Calculator backend base URL.
    #[arg(long = "be-url", env = "P2X_BE_URL", global = true)]
    be_url: Option<String>,
    /// Send the APIM secret header.
    #[arg(
        long = "local-mode",
        env = "P2X_LOCAL_MODE",
        global = true,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    local_mode: Option<bool>,
    #[arg(long = "apim-secret", env = "P2X_APIM_SECRET", hide_env_values = true, global = true)]
    apim_secret: Option<String>,
    #[arg(long = "body-encoding", value_enum, global = true)]
    body_encoding: Option<BodyEncoding>,
    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Print the request body without calling the backend.
    #[arg(long)]
    dry_run: bool,
    /// Write the raw backend response to this file as JSON.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Battery energy storage.
    Beks {
        #[command(flatten)]
        form: BeksForm,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Power-to-heat.
    P2h {
        #[command(flatten)]
        form: P2hForm,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Power-to-gas.
    P2g {
        #[command(flatten)]
        form: P2gForm,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Demand-side response.
    Dsr {
        #[command(flatten)]
        form: DsrForm,
        #[command(flatten)]
        run: RunArgs,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        backend_url: cli.be_url.clone(),
        local_mode: cli.local_mode,
        apim_secret: cli.apim_secret.clone(),
        body_encoding: cli.body_encoding,
        timeout_secs: cli.timeout,
    });

    match &cli.command {
        Commands::Config { init, show } => {
            handle_config_command(*init, *show, &config, &config_path)
        }
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, addr).await
        }
        Commands::Beks { form, run } => run_calculator(&config, form, run, cli.output).await,
        Commands::P2h { form, run } => run_calculator(&config, form, run, cli.output).await,
        Commands::P2g { form, run } => run_calculator(&config, form, run, cli.output).await,
        Commands::Dsr { form, run } => run_calculator(&config, form, run, cli.output).await,
    }
}

async fn run_calculator(
    config: &Config,
    form: &dyn CalculatorForm,
    run: &RunArgs,
    output: OutputFormat,
) -> Result<()> {
    let variant = form.variant();
    if run.dry_run {
        let body = form.to_request_body()?;
        return print_request(variant, &body, output);
    }

    let backend = HttpBackend::new(&config.backend)?;
    let requested_at = Utc::now();
    let submission = submit(&backend, form)
        .await
        .with_context(|| format!("{variant} calculation failed"))?;
    let report = CalculationReport::new(
        submission,
        config.backend.endpoint(variant),
        requested_at,
    );
    if let Some(path) = &run.save {
        save_response(path, &report)?;
    }
    print_report(&report, output)
}

fn save_response(path: &Path, report: &CalculationReport) -> Result<()> {
    fs::write(path, render_json(&report.response)?)
        .with_context(|| format!("failed writing response: {}", path.display()))?;
    info!("saved {} response to {}", report.calculator, path.display());
    Ok(())
}

fn print_request(variant: CalculatorVariant, body: &serde_json::Value, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Table => println!("{}", render_request_table(variant, body)),
        OutputFormat::Json => println!("{}", render_json(body)?),
        OutputFormat::Csv => print!("{}", request_to_csv(body)?),
    }
    Ok(())
}

fn print_report(report: &CalculationReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Table => {
            let result = CalculationResult::new(report.response.clone());
            println!("{} results ({})", report.calculator, report.requested_at.to_rfc3339());
            println!("{}", render_report(&result));
        }
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => {
            let result = CalculationResult::new(report.response.clone());
            print!("{}", report_to_csv(&result)?);
        }
    }
    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(&config.redacted())?);
    }
    Ok(())
}
