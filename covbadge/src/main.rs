// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the covbadge binary.
//!
//! Without a subcommand the binary serves badges over HTTP. The `routes` and
//! `render` subcommands inspect the route table and render badges offline.

use std::{
    fs, io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    process,
    time::Duration,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use covbadge::{
    BadgeKind, BadgeService, BadgeSpec, Counter, CoverageCounters, Error, RouteTable,
    ServiceSettings, config, io_error, load_routes, measure, metric, render_badge, server,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve Jacoco coverage and complexity badges for CircleCI builds.
#[derive(Debug, Parser,)]
#[command(name = "covbadge", version, about = "Serve Jacoco coverage badges for CircleCI builds")]
struct Cli
{
    #[command(subcommand)]
    command: Option<Command,>,

    /// Server options used when no subcommand is given.
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Serve badges over HTTP.
    Serve(ServeArgs,),
    /// Print the effective route table as JSON.
    Routes(RoutesArgs,),
    /// Render one badge to a PNG file.
    Render(RenderArgs,),
}

#[derive(Debug, Args, Clone,)]
struct ServeArgs
{
    /// Address to listen on.
    #[arg(long = "host", env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long = "port", env = "PORT", default_value_t = 5000)]
    port: u16,

    /// CircleCI v1 project API root.
    #[arg(long = "circle-url", env = "CIRCLE_CI_URL", default_value = config::DEFAULT_CIRCLE_URL)]
    circle_url: String,

    /// Branch whose latest successful build is used.
    #[arg(long = "branch", env = "CIRCLE_BRANCH", default_value = config::DEFAULT_BRANCH)]
    branch: String,

    /// Timeout applied to each upstream call, in seconds.
    #[arg(long = "timeout-secs", env = "UPSTREAM_TIMEOUT_SECS", default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// YAML document overriding or extending the built-in routes.
    #[arg(long = "routes", value_name = "PATH")]
    routes: Option<PathBuf,>,
}

impl ServeArgs
{
    fn settings(&self,) -> Result<ServiceSettings, Error,>
    {
        Ok(ServiceSettings {
            circle_url: self.circle_url.clone(),
            branch:     self.branch.clone(),
            timeout:    Duration::from_secs(self.timeout_secs,),
            routes:     load_routes(self.routes.as_deref(),)?,
        },)
    }

    fn address(&self,) -> SocketAddr
    {
        SocketAddr::new(self.host, self.port,)
    }
}

#[derive(Debug, Args,)]
struct RoutesArgs
{
    /// YAML document overriding or extending the built-in routes.
    #[arg(long = "routes", value_name = "PATH")]
    routes: Option<PathBuf,>,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Debug, Args,)]
struct RenderArgs
{
    /// Badge kind: line, branch or complexity.
    #[arg(long = "kind", value_name = "KIND")]
    kind: BadgeKind,

    /// Covered count for line and branch badges.
    #[arg(long = "covered", value_name = "N", conflicts_with = "error")]
    covered: Option<u64,>,

    /// Missed count for line and branch badges.
    #[arg(long = "missed", value_name = "N", conflicts_with = "error")]
    missed: Option<u64,>,

    /// Total cyclomatic complexity for complexity badges.
    #[arg(long = "complexity", value_name = "N", conflicts_with = "error")]
    complexity: Option<u64,>,

    /// Covered method count for complexity badges.
    #[arg(long = "methods", value_name = "N", conflicts_with = "error")]
    methods: Option<u64,>,

    /// Render the error badge instead of a metric.
    #[arg(long = "error", action = ArgAction::SetTrue)]
    error: bool,

    /// Destination PNG file.
    #[arg(long = "output", value_name = "PATH")]
    output: PathBuf,
}

impl RenderArgs
{
    fn spec(&self,) -> Result<BadgeSpec, Error,>
    {
        if self.error {
            return Ok(BadgeSpec::errored(self.kind,),);
        }

        let mut counters = CoverageCounters::default();
        match self.kind {
            BadgeKind::Line | BadgeKind::Branch => {
                let name = if self.kind == BadgeKind::Line { metric::INSTRUCTION } else { metric::BRANCH };
                let (covered, missed,) = self.covered.zip(self.missed,).ok_or_else(|| {
                    Error::validation(format!("{} badges need --covered and --missed", self.kind),)
                },)?;
                counters.insert(
                    name,
                    Counter {
                        covered,
                        missed,
                    },
                );
            }
            BadgeKind::Complexity => {
                let (complexity, methods,) = self.complexity.zip(self.methods,).ok_or_else(|| {
                    Error::validation("complexity badges need --complexity and --methods",)
                },)?;
                counters.insert(
                    metric::COMPLEXITY,
                    Counter {
                        covered: complexity, missed: 0,
                    },
                );
                counters.insert(
                    metric::METHOD,
                    Counter {
                        covered: methods, missed: 0,
                    },
                );
            }
        }

        measure(self.kind, &counters,)
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();
    if let Err(error,) = run(Cli::parse(),).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    tracing_subscriber::fmt().with_env_filter(filter,).with_writer(io::stderr,).init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, startup and rendering errors.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    match cli.command {
        Some(Command::Serve(args,),) => run_serve(&args,).await,
        Some(Command::Routes(args,),) => run_routes(&args,),
        Some(Command::Render(args,),) => run_render(&args,),
        None => run_serve(&cli.serve,).await,
    }
}

async fn run_serve(args: &ServeArgs,) -> Result<(), Error,>
{
    let settings = args.settings()?;
    info!(
        "Using {} (branch {}, timeout {}s) with {} routes",
        settings.circle_url,
        settings.branch,
        settings.timeout.as_secs(),
        settings.routes.routes.len()
    );
    let service = BadgeService::new(&settings,)?;
    server::serve(args.address(), service,).await
}

fn run_routes(args: &RoutesArgs,) -> Result<(), Error,>
{
    let table = load_routes(args.routes.as_deref(),)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_route_table(&mut handle, &table, args.pretty,)
}

fn write_route_table<W: io::Write,>(writer: &mut W, table: &RouteTable, pretty: bool,) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, table,)?;
    } else {
        serde_json::to_writer(writer, table,)?;
    }

    Ok((),)
}

fn run_render(args: &RenderArgs,) -> Result<(), Error,>
{
    let spec = args.spec()?;
    let bytes = render_badge(&spec,)?;
    write_badge(&args.output, &bytes,)?;
    info!("Wrote {} badge '{}' to {}", spec.kind, spec.metric_text, args.output.display());
    Ok((),)
}

fn write_badge(path: &Path, bytes: &[u8],) -> Result<(), Error,>
{
    fs::write(path, bytes,).map_err(|source| io_error(path, source,),)
}
