use care_tier::assessment::{
    AnswerSet, AssessmentEngine, AssessmentReport, HttpLlmProvider, Mediator, RuleSet,
};
use care_tier::config::AppConfig;
use care_tier::error::AppError;
use care_tier::telemetry;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "care-tier",
    about = "Recommend a care category and daily care hours from a completed needs assessment",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a completed questionnaire and print the recommendation
    Assess(AssessArgs),
    /// Load a rule document and report whether it is valid
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct AssessArgs {
    /// JSON object mapping field ids to the selected option value(s)
    #[arg(long)]
    answers: PathBuf,
    /// Rule document to use instead of CARE_RULES_PATH or the bundled rules
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Skip the LLM advisory even when an endpoint is configured
    #[arg(long)]
    no_llm: bool,
    /// Override the LLM deadline in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Rule document to check (defaults to CARE_RULES_PATH or the bundled rules)
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Assess(args) => {
            let report = run_assessment(&args, &config).await?;
            if args.json {
                let rendered = serde_json::to_string_pretty(&report).map_err(AppError::Output)?;
                println!("{rendered}");
            } else {
                render_report(&report);
            }
            Ok(())
        }
        Command::Validate(args) => {
            let path = args.rules.as_deref().or(config.rules.path.as_deref());
            let rules = load_rules(path)?;
            render_validation(path, &rules);
            Ok(())
        }
    }
}

fn load_rules(path: Option<&Path>) -> Result<Arc<RuleSet>, AppError> {
    let rules = match path {
        Some(path) => RuleSet::from_path(path)?,
        None => RuleSet::standard()?,
    };
    Ok(Arc::new(rules))
}

fn read_answers(path: &Path) -> Result<AnswerSet, AppError> {
    let raw = fs::read_to_string(path)?;
    AnswerSet::from_json_str(&raw).map_err(|source| AppError::Answers {
        path: path.to_path_buf(),
        source,
    })
}

async fn run_assessment(
    args: &AssessArgs,
    config: &AppConfig,
) -> Result<AssessmentReport, AppError> {
    let rules = load_rules(args.rules.as_deref().or(config.rules.path.as_deref()))?;
    let answers = read_answers(&args.answers)?;

    let endpoint = config
        .llm
        .endpoint
        .as_deref()
        .filter(|_| config.llm.is_active() && !args.no_llm);

    let report = match endpoint {
        Some(endpoint) => {
            let mut provider = HttpLlmProvider::new(endpoint, config.llm.model.as_str());
            if let Some(key) = config.llm.api_key.as_deref() {
                provider = provider.with_api_key(key);
            }
            let timeout = args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(config.llm.timeout);

            info!(
                ?config.environment,
                model = %config.llm.model,
                timeout_secs = timeout.as_secs(),
                "assessing with llm advisory"
            );
            let mediator = Mediator::new(Arc::new(provider)).with_timeout(timeout);
            AssessmentEngine::with_mediator(rules, mediator)
                .assess(&answers)
                .await
        }
        None => {
            info!(?config.environment, "assessing deterministically");
            AssessmentEngine::deterministic(rules).assess(&answers).await
        }
    };

    Ok(report)
}

fn render_report(report: &AssessmentReport) {
    let care = &report.care;
    let hours = &report.hours;

    println!("Care assessment ({})", report.assessed_at.format("%Y-%m-%d %H:%M UTC"));

    println!("\nRecommended care: {}", care.summary());
    if care.category != care.baseline_category {
        println!("Score threshold suggested: {}", care.baseline_category);
    }
    println!(
        "Eligible categories: {}",
        care.allowed_categories
            .iter()
            .map(|category| category.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for line in &care.rationale {
        println!("- {line}");
    }

    println!("\nRecommended daily care: {}", hours.summary());
    println!("Display ranges: {}", hours.band.display_ranges().join(", "));
    for line in &hours.rationale {
        println!("- {line}");
    }

    if care.source.is_fallback() || hours.source.is_fallback() {
        println!("\nNote: the LLM advisory could not be used; deterministic results were kept.");
    }
}

fn render_validation(path: Option<&Path>, rules: &RuleSet) {
    match path {
        Some(path) => println!("Rule document {} is valid", path.display()),
        None => println!("Bundled rule document is valid"),
    }

    let range = rules.score_range();
    println!(
        "{} categories, {} fields, {} gates; reachable score {}-{}",
        rules.categories().len(),
        rules.fields().len(),
        rules.gates().len(),
        range.min,
        range.max
    );
    for threshold in rules.thresholds() {
        println!(
            "- {}: {}-{}",
            rules.category_label(&threshold.category),
            threshold.min_score,
            threshold.max_score
        );
    }
}
