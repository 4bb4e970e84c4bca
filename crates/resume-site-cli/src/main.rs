//! resume-site — entry point.

use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use resume_site::accessibility::Impact;
use resume_site_cli::commands::visual::ScreenshotInput;
use resume_site_cli::commands::{audit, skills, visual};
use resume_site_cli::{exit_code_for, resolve_visual_config, resolve_visual_dir, VisualOverrides};

#[derive(Parser)]
#[command(
    name = "resume-site",
    about = "Checks for the resume site — skill experience years, visual regression, performance and accessibility gates",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Print machine-readable results on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Years of experience with a single skill.
    Years {
        /// Job-list JSON document.
        #[arg(short, long)]
        jobs: PathBuf,

        /// Skill to look up; parenthetical notes are ignored.
        #[arg(short, long)]
        skill: String,

        /// Date used for "Present" (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Annotate skill labels with their years of experience.
    Skills {
        /// Job-list JSON document.
        #[arg(short, long)]
        jobs: PathBuf,

        /// Skill label, e.g. "React (Hooks)". Repeatable.
        #[arg(short, long = "label")]
        labels: Vec<String>,

        /// Category line, e.g. "Frontend: React, Vue". Repeatable.
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// Date used for "Present" (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Compare a screenshot against the stored baseline.
    Visual {
        /// Screenshot written by the browser driver. Use "-" to read base64 from stdin.
        #[arg(short, long)]
        screenshot: PathBuf,

        /// MIME type of base64 input read from stdin.
        #[arg(long, default_value = "image/png")]
        mime: String,

        /// Directory holding baseline.png and results/.
        /// Also reads from VISUAL_DIR env var.
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// JSON config file (defaults to ./visual-regression.json when present).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Create the baseline from this capture when it is missing.
        #[arg(long)]
        bootstrap: bool,

        /// Allow --bootstrap to create a baseline while running in CI.
        /// Also reads from VISUAL_ALLOW_CI_BOOTSTRAP env var.
        #[arg(long)]
        allow_ci_bootstrap: bool,

        /// Apply the CI threshold and remediation messages.
        #[arg(long)]
        ci: bool,

        /// Per-channel sensitivity (0-1).
        #[arg(long)]
        channel_threshold: Option<f64>,

        /// Pass/fail cutoff in percent (0-100).
        #[arg(long)]
        diff_threshold: Option<f64>,
    },

    /// Check page performance metrics against a budget.
    Perf {
        /// Metrics JSON written by the browser driver.
        #[arg(short, long)]
        metrics: PathBuf,

        /// Budget JSON overriding the default limits.
        #[arg(long)]
        budget: Option<PathBuf>,

        /// Write a Markdown summary here.
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Check an axe-core accessibility report.
    A11y {
        /// axe results JSON.
        #[arg(short, long)]
        results: PathBuf,

        /// Ignore violations below this impact (minor, moderate, serious, critical).
        #[arg(long)]
        min_impact: Option<Impact>,

        /// Write a Markdown summary here.
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   resume-site completions bash > ~/.local/share/bash-completion/completions/resume-site
    ///   resume-site completions zsh > ~/.zfunc/_resume-site
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match run(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(exit_code_for(&e));
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let as_json = cli.json;

    let output = match cli.command {
        Commands::Years { jobs, skill, today } => {
            let jobs = skills::read_jobs(&jobs)?;
            skills::years(&jobs, &skill, skills::effective_today(today), as_json)
        }

        Commands::Skills {
            jobs,
            labels,
            categories,
            today,
        } => {
            let jobs = skills::read_jobs(&jobs)?;
            skills::skills(&jobs, &labels, &categories, skills::effective_today(today), as_json)?
        }

        Commands::Visual {
            screenshot,
            mime,
            dir,
            config,
            bootstrap,
            allow_ci_bootstrap,
            ci,
            channel_threshold,
            diff_threshold,
        } => {
            let overrides = VisualOverrides {
                bootstrap,
                allow_ci_bootstrap,
                ci,
                channel_threshold,
                diff_threshold,
            };
            let config = resolve_visual_config(config.as_deref(), &overrides)?;
            let dir = resolve_visual_dir(dir.as_deref());

            let input = if screenshot.as_os_str() == "-" {
                let mut data = String::new();
                std::io::stdin().read_to_string(&mut data)?;
                ScreenshotInput::Base64 { data, mime: &mime }
            } else {
                ScreenshotInput::File(&screenshot)
            };
            visual::run(config, &dir, input, as_json)?
        }

        Commands::Perf {
            metrics,
            budget,
            summary,
        } => audit::perf(&metrics, budget.as_deref(), summary.as_deref())?,

        Commands::A11y {
            results,
            min_impact,
            summary,
        } => audit::a11y(&results, min_impact, summary.as_deref())?,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "resume-site", &mut std::io::stdout());
            String::new()
        }
    };

    Ok(output)
}
