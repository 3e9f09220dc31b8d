use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info};

use crate::{
    config::{PlannerConfig, DEFAULT_MODEL},
    core::Orchestrator,
    types::{DetailLevel, TravelRequest},
};

fn connection_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .value_name("KEY")
                .help("API key (or set OPENAI_API_KEY)"),
        )
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .value_name("URL")
                .help("Chat completions base URL (or set OPENAI_BASE_URL / OPENROUTER_BASE_URL)"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help(format!("Model for every stage (default {DEFAULT_MODEL})")),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Per-request timeout in seconds"),
        )
}

fn command() -> Command {
    Command::new("tripweaver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn travel preferences into enriched itineraries")
        .subcommand_required(true)
        .subcommand(connection_args(
            Command::new("plan")
                .about("Run one planning request and print the plan as JSON")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("JSON")
                        .required(true)
                        .help("Request JSON, or @path to read it from a file"),
                )
                .arg(
                    Arg::new("detail-level")
                        .short('d')
                        .long("detail-level")
                        .value_name("LEVEL")
                        .value_parser(["high_level", "medium", "full", "enhanced"])
                        .default_value("full"),
                )
                .arg(
                    Arg::new("debug")
                        .long("debug")
                        .action(ArgAction::SetTrue)
                        .help("Attach the execution trace to the plan"),
                ),
        ))
        .subcommand(connection_args(
            Command::new("serve").about("Serve the HTTP API").arg(
                Arg::new("addr")
                    .short('a')
                    .long("addr")
                    .value_name("HOST:PORT")
                    .help("Listen address (or set TRIPWEAVER_ADDR)"),
            ),
        ))
}

/// Environment first, then flags on top.
fn load_config(matches: &ArgMatches) -> anyhow::Result<PlannerConfig> {
    let mut config = match matches.get_one::<String>("api-key") {
        Some(key) => PlannerConfig::from_env()
            .map(|config| PlannerConfig {
                api_key: key.clone(),
                ..config
            })
            .unwrap_or_else(|_| PlannerConfig::new(key.clone())),
        None => PlannerConfig::from_env()
            .context("an API key is required: set OPENAI_API_KEY or pass --api-key")?,
    };

    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config = config.with_model(model.clone());
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config = config.with_request_timeout(Duration::from_secs(*secs));
    }
    Ok(config)
}

fn read_request(input: &str) -> anyhow::Result<TravelRequest> {
    let text = match input.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?
        }
        None => input.to_string(),
    };
    serde_json::from_str(&text).context("request is not a valid travel request")
}

async fn run_plan(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(matches)?;
    let input = matches
        .get_one::<String>("input")
        .ok_or_else(|| anyhow!("--input is required"))?;
    let request = read_request(input)?;
    let level: DetailLevel = matches
        .get_one::<String>("detail-level")
        .map(String::as_str)
        .unwrap_or("full")
        .parse()?;
    let debug = matches.get_flag("debug");

    info!(model = %config.model, base_url = %config.base_url, level = level.as_str(), "planning");
    let orchestrator = Orchestrator::from_config(&config)?;

    match orchestrator.generate_plan(request, level, debug).await {
        Ok(plan) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            if let Some(trace) = &plan.debug_trace {
                eprintln!("{}", trace.replay());
            }
            Ok(())
        }
        Err(failure) => {
            error!(plan_id = %failure.plan_id, error = %failure.error, "planning failed");
            println!("{}", serde_json::to_string_pretty(&failure.to_payload())?);
            bail!("planning failed: {}", failure.error)
        }
    }
}

#[cfg(feature = "server")]
async fn run_serve(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(matches)?;
    if let Some(addr) = matches.get_one::<String>("addr") {
        config = config.with_addr(addr.clone());
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    crate::server::serve(orchestrator, &config.addr).await?;
    Ok(())
}

#[cfg(not(feature = "server"))]
async fn run_serve(_matches: &ArgMatches) -> anyhow::Result<()> {
    bail!("the server feature is not enabled; rebuild with --features server")
}

/// CLI entry point for the tripweaver binary
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tripweaver=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = command().get_matches();
    match matches.subcommand() {
        Some(("plan", sub)) => run_plan(sub).await,
        Some(("serve", sub)) => run_serve(sub).await,
        _ => bail!("unknown command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn test_plan_arguments_parse() {
        let matches = command()
            .try_get_matches_from([
                "tripweaver",
                "plan",
                "--input",
                r#"{"budget": 900}"#,
                "--detail-level",
                "medium",
                "--debug",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();

        assert_eq!(name, "plan");
        assert_eq!(sub.get_one::<String>("detail-level").unwrap(), "medium");
        assert!(sub.get_flag("debug"));
        let request = read_request(sub.get_one::<String>("input").unwrap()).unwrap();
        assert_eq!(request.constraints.budget, Some(900.0));
    }

    #[test]
    fn test_unknown_detail_level_is_rejected() {
        let result = command().try_get_matches_from([
            "tripweaver",
            "plan",
            "--input",
            "{}",
            "--detail-level",
            "exhaustive",
        ]);
        assert!(result.is_err());
    }
}
