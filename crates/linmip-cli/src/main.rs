mod models;

use clap::{Parser, Subcommand, ValueEnum};
use linmip_solver::{ModelError, Report, SolutionStatus, Solver, SolverSettings};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "linmip")]
#[command(about = "Solve the bundled linear and mixed-integer models", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. debug, linmip_solver=trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the bundled models
    List,
    /// Solve a bundled model and print the solution
    Solve {
        /// Name of the model (see `list`)
        model: String,
        /// Show duals, slacks and reduced costs
        #[arg(short, long)]
        analysis: bool,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// TOML file with solver settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Check that every bundled model builds
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("unknown model '{0}' (run `linmip list`)")]
    UnknownModel(String),
    #[error("cannot read {path}: {source}")]
    ReadConfig { path: PathBuf, source: std::io::Error },
    #[error("invalid settings in {path}: {source}")]
    ParseConfig { path: PathBuf, source: toml::de::Error },
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when the command ran but did not reach a proven optimum.
fn run(command: Commands) -> Result<bool, CliError> {
    match command {
        Commands::List => {
            for bundled in models::MODELS {
                println!("  {:16} {}", bundled.name, bundled.description);
            }
            Ok(true)
        }
        Commands::Solve {
            model,
            analysis,
            format,
            config,
        } => {
            let bundled = models::find(&model).ok_or_else(|| CliError::UnknownModel(model.clone()))?;
            let settings = match config {
                Some(path) => load_settings(&path)?,
                None => SolverSettings::default(),
            };
            debug!(?settings, "Solver settings");

            let model = (bundled.build)()?;
            info!(
                model = model.name(),
                variables = model.num_variables(),
                constraints = model.num_constraints(),
                "Solving"
            );
            let solution = Solver::with_settings(settings).solve(&model)?;

            let mut report = Report::from_solution(&solution);
            if !analysis {
                report.constraints.clear();
                for line in &mut report.variables {
                    line.reduced_cost = None;
                    line.basic = None;
                }
            }

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Pretty => {
                    println!("Model: {}", model.name());
                    println!("{}", report);
                    match solution.status() {
                        SolutionStatus::Optimal => {}
                        SolutionStatus::Infeasible => {
                            println!("No solution exists that satisfies all constraints.")
                        }
                        SolutionStatus::Unbounded => println!("The problem has no finite optimal solution."),
                        SolutionStatus::ResourceLimitReached => {
                            println!("Solver budget exhausted before optimality was proven.")
                        }
                    }
                }
            }
            Ok(solution.status() == SolutionStatus::Optimal)
        }
        Commands::Check => {
            let mut all_valid = true;
            for bundled in models::MODELS {
                match (bundled.build)() {
                    Ok(model) => println!(
                        "✓ {:16} {} variables, {} constraints{}",
                        bundled.name,
                        model.num_variables(),
                        model.num_constraints(),
                        if model.has_integer_variables() { ", integer" } else { "" }
                    ),
                    Err(e) => {
                        eprintln!("✗ {} has errors:", bundled.name);
                        eprintln!("  {}", e);
                        all_valid = false;
                    }
                }
            }
            Ok(all_valid)
        }
    }
}

fn load_settings(path: &Path) -> Result<SolverSettings, CliError> {
    let source = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&source).map_err(|source| CliError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_settings_from_toml() {
        let path = std::env::temp_dir().join(format!("linmip-settings-{}.toml", std::process::id()));
        std::fs::write(&path, "max_iterations = 500\nnode_limit = 10\n").unwrap();

        let settings = load_settings(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.max_iterations, 500);
        assert_eq!(settings.node_limit, 10);
        assert_eq!(settings.tolerance, SolverSettings::default().tolerance);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_settings(Path::new("/nonexistent/linmip.toml")).unwrap_err();
        assert!(matches!(err, CliError::ReadConfig { .. }), "unexpected error: {}", err);
    }

    #[test]
    fn test_unknown_model() {
        let command = Commands::Solve {
            model: "nope".to_string(),
            analysis: false,
            format: Format::Pretty,
            config: None,
        };
        assert!(matches!(run(command), Err(CliError::UnknownModel(name)) if name == "nope"));
    }

    #[test]
    fn test_cli_parses_solve_arguments() {
        let cli = Cli::try_parse_from(["linmip", "solve", "pipes", "--analysis", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Solve {
                model,
                analysis,
                format,
                config,
            } => {
                assert_eq!(model, "pipes");
                assert!(analysis);
                assert!(matches!(format, Format::Json));
                assert!(config.is_none());
            }
            _ => panic!("expected solve command"),
        }
    }
}
