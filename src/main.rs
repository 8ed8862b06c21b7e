use clap::{Parser, Subcommand};
use probeplan::config::PlannerConfig;
use probeplan::error::Error;
use probeplan::planner::tool_surface::{
    self, ProbeActuateRequest, ProbeResetRequest, ProbeStatusRequest, ProbeWaitHitRequest,
    RecipeGenerateRequest, TargetInferRequest,
};
use probeplan::probe::{self, control_plane, launch_args::SystemProperties};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "probeplan-agent", about = "In-process probe agent and reproduction planner")]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    json_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the in-process probe's control-plane HTTP server.
    Serve {
        #[arg(long)]
        args: Option<String>,
    },
    /// `debug_ping`: checks the planner tool surface is wired up.
    Ping,
    /// `target_infer`: ranks indexed methods against hints.
    InferTarget {
        project_root: PathBuf,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        line: Option<usize>,
    },
    /// `recipe_generate`: infers a target, a request candidate, and a plan.
    Recipe {
        project_root: PathBuf,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        line: Option<usize>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// `probe_status`: reads a key's current hit count.
    Status { key: String },
    /// `probe_reset`: zeroes a key's hit record.
    Reset { key: String },
    /// `probe_wait_hit`: polls a line-level key for an inline hit.
    WaitHit {
        key: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// `probe_actuate`: arms forced actuation on a line-level key.
    Actuate {
        target_key: String,
        #[arg(long)]
        return_boolean: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    probeplan::logging::init_tracing(cli.verbose);
    let json_errors = cli.json_errors;

    if let Err(e) = run_command(cli.command).await {
        print_error(&e, json_errors);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Serve { args } => {
            let (launch_args, runtime, reset_ledger) =
                probe::install(args.as_deref().unwrap_or(""), &SystemProperties::new());
            control_plane::serve(&launch_args.host, launch_args.port, runtime, reset_ledger)
                .map_err(|e| Error::configuration(e.to_string()))?;
        }
        Commands::Ping => {
            println!("{}", serde_json::to_string_pretty(&tool_surface::debug_ping()).unwrap());
        }
        Commands::InferTarget { project_root, class, method, line } => {
            let response = tool_surface::target_infer(&TargetInferRequest {
                project_root,
                class_hint: class,
                method_hint: method,
                line_hint: line,
            });
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
        Commands::Recipe { project_root, class, method, line, username, password } => {
            let response = tool_surface::recipe_generate(&RecipeGenerateRequest {
                project_root,
                class_hint: class,
                method_hint: method,
                line_hint: line,
                username,
                password,
                auth_token: None,
            });
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
        Commands::Status { key } => {
            let config = PlannerConfig::from_env()?;
            let response = tool_surface::probe_status(&config, &ProbeStatusRequest { key }).await?;
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
        Commands::Reset { key } => {
            let config = PlannerConfig::from_env()?;
            let response = tool_surface::probe_reset(&config, &ProbeResetRequest { key }).await?;
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
        Commands::WaitHit { key, timeout_ms } => {
            let config = PlannerConfig::from_env()?;
            let response = tool_surface::probe_wait_hit(
                &config,
                &ProbeWaitHitRequest { key, timeout_ms, poll_interval_ms: None, max_retries: None },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
        Commands::Actuate { target_key, return_boolean } => {
            let config = PlannerConfig::from_env()?;
            let response = tool_surface::probe_actuate(
                &config,
                &ProbeActuateRequest { target_key, return_boolean, actuator_id: None },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
    }
    Ok(())
}

fn print_error(error: &Error, json_errors: bool) {
    if json_errors {
        eprintln!("{}", serde_json::to_string_pretty(&error.to_json()).unwrap());
    } else {
        eprintln!("error: {error}");
    }
}
