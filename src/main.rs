use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use novelkit::budget::{BudgetRequest, BudgetResult, ModelLimits, TokenBudgetPlanner};
use novelkit::config::{BudgetOverrides, ConfigManager};
use novelkit::report::{self, CountOutcome};
use novelkit::text::HeuristicCounter;
use std::path::PathBuf;

// ============================================================================
// CLI Argument Parsing
// ============================================================================

#[derive(Parser)]
#[command(name = "novelkit", version, about = "Token budgets for thinking-enabled drafting runs")]
struct Cli {
    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan max_tokens and the thinking budget for a prompt of known size
    Plan {
        /// Measured or estimated prompt size in tokens
        #[arg(long, alias = "prompt_tokens")]
        prompt_tokens: i64,

        #[command(flatten)]
        budget: BudgetArgs,
    },
    /// Count words and tokens in a text file and check its thinking budget
    Count {
        /// File containing the text to analyze
        #[arg(long, alias = "text_file")]
        text_file: PathBuf,

        /// Directory to save the report (defaults to the configured save_dir)
        #[arg(long, alias = "save_dir")]
        save_dir: Option<PathBuf>,

        /// File that receives the list of created files, one per line
        #[arg(long, alias = "output_tracking")]
        output_tracking: Option<PathBuf>,

        #[command(flatten)]
        budget: BudgetArgs,
    },
    /// List known models and their limits
    Models,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
struct BudgetArgs {
    /// Model whose limits to plan against
    #[arg(long)]
    model: Option<String>,

    /// Context window of the model
    #[arg(long, alias = "context_window")]
    context_window: Option<i64>,

    /// Maximum tokens for AI output (API tier cap)
    #[arg(long, alias = "betas_max_tokens")]
    betas_max_tokens: Option<i64>,

    /// Thinking tokens the run needs
    #[arg(long, alias = "thinking_budget_tokens")]
    thinking_budget_tokens: Option<i64>,

    /// Tokens reserved for visible output
    #[arg(long, alias = "desired_output_tokens")]
    desired_output_tokens: Option<i64>,

    /// Absolute ceiling on thinking tokens for a streamed request
    #[arg(long, alias = "thinking_hard_cap")]
    thinking_hard_cap: Option<i64>,
}

impl From<BudgetArgs> for BudgetOverrides {
    fn from(args: BudgetArgs) -> Self {
        Self {
            model: args.model,
            context_window: args.context_window,
            betas_max_tokens: args.betas_max_tokens,
            thinking_budget_tokens: args.thinking_budget_tokens,
            desired_output_tokens: args.desired_output_tokens,
            thinking_hard_cap: args.thinking_hard_cap,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get {
        /// Key to get (all, model, save-dir, budget)
        key: String,
    },
    /// Set a config value
    Set {
        /// Key to set (e.g., "model", "save-dir", "desired-output-tokens")
        key: String,
        /// Value to set
        value: String,
    },
    /// Show the config file location
    Path,
}

/// JSON envelope for non-interactive output
fn json_output(success: bool, data: serde_json::Value, error: Option<&str>) -> String {
    serde_json::json!({
        "success": success,
        "data": data,
        "error": error,
    })
    .to_string()
}

fn main() {
    // Check for --json flag before initializing logging
    let json_mode = std::env::args().any(|arg| arg == "--json");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("novelkit=info"));

    if json_mode {
        // In JSON mode: send logs to stderr with no ANSI colors
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    } else if std::env::var("NOVELKIT_LOG_JSON").is_ok() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    let cli = Cli::parse();

    if let Err(err) = run_command(cli.command, cli.json) {
        if cli.json {
            println!("{}", json_output(false, serde_json::Value::Null, Some(&format!("{:#}", err))));
        } else {
            eprintln!("Error: {:#}", err);
        }
        std::process::exit(1);
    }
}

// ============================================================================
// Command Runner
// ============================================================================

fn run_command(command: Commands, json_mode: bool) -> Result<()> {
    match command {
        Commands::Plan {
            prompt_tokens,
            budget,
        } => {
            let config_manager = ConfigManager::new()?;
            let request = config_manager
                .get()
                .budget
                .resolve(&budget.into(), prompt_tokens)?;
            let result = TokenBudgetPlanner::plan(&request)?;

            if json_mode {
                println!(
                    "{}",
                    json_output(
                        result.sufficient,
                        serde_json::json!({ "request": request, "result": result }),
                        insufficient_message(&result).as_deref(),
                    )
                );
            } else {
                print_token_stats(&request, &result);
                print_verdict(&request, &result);
            }

            if !result.sufficient {
                std::process::exit(1);
            }
        }
        Commands::Count {
            text_file,
            save_dir,
            output_tracking,
            budget,
        } => {
            let config_manager = ConfigManager::new()?;
            let config = config_manager.get();
            let save_dir = save_dir.unwrap_or_else(|| config.output.save_dir.clone());

            if !json_mode {
                println!("Counting tokens for text file: {}", text_file.display());
            }
            let outcome = report::run_count(
                &text_file,
                &config.budget,
                &budget.into(),
                &HeuristicCounter,
                &save_dir,
                output_tracking.as_deref(),
            )?;
            let CountOutcome {
                stats,
                request,
                result,
                report_path,
            } = outcome;

            if json_mode {
                println!(
                    "{}",
                    json_output(
                        result.sufficient,
                        serde_json::json!({
                            "stats": stats,
                            "request": request,
                            "result": result,
                            "report": report_path,
                        }),
                        insufficient_message(&result).as_deref(),
                    )
                );
            } else {
                println!();
                println!("Word count: {}", stats.word_count);
                print_token_stats(&request, &result);
                print_verdict(&request, &result);
            }

            let Some(report_path) = report_path else {
                std::process::exit(1);
            };

            if !json_mode {
                println!("Words per token ratio: {:.2}", stats.words_per_token);
                println!();
                println!("***************************************************************************");
                println!("Counts for text file: {}", text_file.display());
                println!("{} words", stats.word_count);
                println!("{} tokens (estimated)", stats.prompt_tokens);
                println!("***************************************************************************");
                println!("Report saved to: {}", report_path.display());
            }
        }
        Commands::Models => {
            let models = ModelLimits::all();
            if json_mode {
                println!(
                    "{}",
                    json_output(true, serde_json::json!({ "models": models }), None)
                );
            } else {
                let default = ModelLimits::default_model();
                println!("Known models:");
                for m in models {
                    let marker = if m.id == default.id { "*" } else { " " };
                    println!("  {} {} ({})", marker, m.id, m.display_name);
                    println!("      context window: {}", m.context_window);
                    match m.beta_max_output_tokens {
                        Some(beta) => println!(
                            "      max output: {} ({} with {})",
                            m.max_output_tokens,
                            beta,
                            m.beta_header.as_deref().unwrap_or("beta")
                        ),
                        None => println!("      max output: {}", m.max_output_tokens),
                    }
                    println!("      thinking cap: {}", m.thinking_hard_cap);
                }
            }
        }
        Commands::Config { action } => {
            let mut config_manager = ConfigManager::new()?;
            match action {
                ConfigAction::Get { key } => {
                    let config = config_manager.get();
                    let (data, text) = match key.as_str() {
                        "all" => (serde_json::to_value(config)?, toml::to_string_pretty(config)?),
                        "budget" => (
                            serde_json::to_value(&config.budget)?,
                            toml::to_string_pretty(&config.budget)?,
                        ),
                        "model" => (
                            serde_json::json!({ "model": config.budget.model }),
                            config.budget.model.clone(),
                        ),
                        "save-dir" => (
                            serde_json::json!({ "save_dir": config.output.save_dir }),
                            config.output.save_dir.display().to_string(),
                        ),
                        other => {
                            anyhow::bail!(
                                "Unknown config key: '{}'. Valid keys: all, model, save-dir, budget",
                                other
                            );
                        }
                    };
                    if json_mode {
                        println!("{}", json_output(true, data, None));
                    } else {
                        println!("{}", text.trim_end());
                    }
                }
                ConfigAction::Set { key, value } => {
                    config_manager.get_mut().set(&key, &value)?;
                    config_manager.save()?;
                    if json_mode {
                        println!(
                            "{}",
                            json_output(true, serde_json::json!({ "key": key, "value": value }), None)
                        );
                    } else {
                        println!("Set {} = {}", key, value);
                    }
                }
                ConfigAction::Path => {
                    let path = config_manager.config_path();
                    if json_mode {
                        println!("{}", json_output(true, serde_json::json!({ "path": path }), None));
                    } else {
                        println!("{}", path.display());
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_token_stats(request: &BudgetRequest, result: &BudgetResult) {
    println!("Token stats:");
    println!("Max AI model context window: [{}] tokens", request.context_window);
    println!("Input prompt tokens: [{}]", request.prompt_tokens);
    println!(
        "Available tokens: [{}] = {} - {}",
        result.available_tokens, request.context_window, request.prompt_tokens
    );
    println!("Desired output tokens: [{}]", request.desired_output_tokens);
    println!("AI model thinking budget: [{}] tokens", result.thinking_budget);
    println!("Max output tokens (max_tokens): [{}] tokens", result.max_tokens);
}

fn print_verdict(request: &BudgetRequest, result: &BudgetResult) {
    match insufficient_message(result) {
        Some(msg) => println!("Error: {}", msg),
        None => {
            println!("✓ Thinking budget is sufficient!");
            println!(
                "✓ Text is ready for use with requested thinking budget of {} tokens",
                request.requested_thinking_tokens
            );
        }
    }
}

fn insufficient_message(result: &BudgetResult) -> Option<String> {
    result.ensure_sufficient().err().map(|_| {
        format!(
            "prompt is too large to have a {} thinking budget!",
            result.requested_thinking_tokens
        )
    })
}
