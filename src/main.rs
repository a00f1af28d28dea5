//! distkit CLI
//!
//! Entry point for the `distkit` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use distkit::config::{env_layer, overrides_layer};
use distkit::runner::SystemRunner;
use distkit::transport::HttpTransport;
use distkit::{logging, resolve_platforms, EffectiveConfig, ExitCode, Pipeline, PointerOps};

#[derive(Parser)]
#[command(name = "distkit")]
#[command(about = "Build, fingerprint and publish versioned cross-compiled binaries", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file (default: ~/.config/distkit/config.toml if present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Release registry base URL (DISTURL)
    #[arg(long, global = true)]
    registry_url: Option<String>,

    /// Package storage base URL (S3DISTURL)
    #[arg(long, global = true)]
    storage_url: Option<String>,

    /// Artifact name (BUILDNAME)
    #[arg(long, global = true)]
    name: Option<String>,

    /// Branch to build (BUILDBRANCH)
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Repository to clone (BUILDREPO)
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Checkout directory, removed and recreated for every platform
    #[arg(long, global = true)]
    workdir: Option<String>,

    /// go or cargo
    #[arg(long, global = true)]
    toolchain: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish platforms (`all`, `<os>-<arch>`..., or the host)
    Build {
        platforms: Vec<String>,

        /// Print the batch summary as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Also write the batch summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Point platforms at an already registered version
    Repoint {
        version: String,

        platforms: Vec<String>,
    },

    /// Show the current version of each platform
    Status {
        platforms: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration (secrets redacted)
    Config,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.log_json);

    let effective = match load_config(&cli.global) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };

    let code = match cli.command {
        Commands::Build {
            platforms,
            json,
            summary,
        } => run_build(&effective, &platforms, json, summary),
        Commands::Repoint { version, platforms } => run_repoint(&effective, &version, &platforms),
        Commands::Status { platforms, json } => run_status(&effective, &platforms, json),
        Commands::Config => run_config(&effective),
    };
    process::exit(code.as_i32());
}

fn load_config(global: &GlobalArgs) -> Result<EffectiveConfig, distkit::ConfigError> {
    let file = global.config.clone().or_else(|| {
        let path = PathBuf::from(std::env::var_os("HOME")?)
            .join(".config")
            .join("distkit")
            .join("config.toml");
        path.is_file().then_some(path)
    });

    let env = env_layer(|var| std::env::var(var).ok());
    let cli = overrides_layer([
        ("registry.url", global.registry_url.clone()),
        ("storage.url", global.storage_url.clone()),
        ("artifact.name", global.name.clone()),
        ("source.branch", global.branch.clone()),
        ("source.repository", global.repo.clone()),
        ("source.workdir", global.workdir.clone()),
        ("build.toolchain", global.toolchain.clone()),
    ]);

    EffectiveConfig::build(file.as_deref(), Some(env), Some(cli))
}

fn http_transport(effective: &EffectiveConfig) -> Result<HttpTransport, ExitCode> {
    let settings = &effective.settings;
    HttpTransport::new(settings.connect_timeout, settings.timeout).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::Config
    })
}

fn run_build(
    effective: &EffectiveConfig,
    names: &[String],
    json: bool,
    summary_path: Option<PathBuf>,
) -> ExitCode {
    let settings = &effective.settings;
    let platforms = match resolve_platforms(settings, names) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::Config;
        }
    };
    let transport = match http_transport(effective) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let runner = SystemRunner::new();

    let summary = Pipeline::new(settings, &runner, &transport).run_batch(&platforms);

    if let Some(path) = summary_path {
        if let Err(e) = summary.write_to_file(&path) {
            error!(path = %path.display(), error = %e, "failed to write summary");
        }
    }

    if json {
        match summary.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
    } else {
        for outcome in &summary.outcomes {
            let detail = match (&outcome.message, &outcome.version) {
                (Some(message), _) => message.clone(),
                (None, Some(version)) => version.clone(),
                (None, None) => String::new(),
            };
            println!(
                "{:<16} {:<18} {}",
                outcome.platform.to_string(),
                outcome.status.as_str(),
                detail
            );
        }
        println!("{}", summary.human_summary);
    }

    summary.exit_code()
}

fn run_repoint(effective: &EffectiveConfig, version: &str, names: &[String]) -> ExitCode {
    let settings = &effective.settings;
    let platforms = match resolve_platforms(settings, names) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::Config;
        }
    };
    let transport = match http_transport(effective) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let outcomes = PointerOps::new(settings, &transport).repoint(version, &platforms);
    let mut failed = false;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => println!("{:<16} -> {}", outcome.platform.to_string(), version),
            Err(e) => {
                failed = true;
                println!("{:<16} failed: {}", outcome.platform.to_string(), e);
            }
        }
    }

    if failed {
        ExitCode::PlatformFailed
    } else {
        ExitCode::Success
    }
}

fn run_status(effective: &EffectiveConfig, names: &[String], json: bool) -> ExitCode {
    let settings = &effective.settings;
    let platforms = match resolve_platforms(settings, names) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::Config;
        }
    };
    let transport = match http_transport(effective) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let status = PointerOps::new(settings, &transport).status(&platforms);
    let failed = status.iter().any(|(_, r)| r.is_err());

    if json {
        let output: Vec<serde_json::Value> = status
            .iter()
            .map(|(platform, result)| match result {
                Ok(version) => serde_json::json!({ "platform": platform, "version": version }),
                Err(e) => serde_json::json!({ "platform": platform, "error": e.to_string() }),
            })
            .collect();
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
    } else {
        for (platform, result) in &status {
            match result {
                Ok(Some(version)) => println!("{:<16} {}", platform.to_string(), version),
                Ok(None) => println!("{:<16} <none>", platform.to_string()),
                Err(e) => println!("{:<16} error: {}", platform.to_string(), e),
            }
        }
    }

    if failed {
        ExitCode::PlatformFailed
    } else {
        ExitCode::Success
    }
}

fn run_config(effective: &EffectiveConfig) -> ExitCode {
    match effective.to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::Config
        }
    }
}
