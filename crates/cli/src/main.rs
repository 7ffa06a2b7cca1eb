use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use sc_core::RawInput;
use sc_features::PriceTierMode;
use sc_predictors::FeatureImportance;
use sc_runtime::config::parse_price_tiers;
use sc_runtime::loader::{read_records, write_scenarios};
use sc_runtime::metrics::PipelineMetrics;
use sc_runtime::{
    analytics, init_tracing, pipeline, AppContext, BundleArtifact, ConfigOverrides, LoadOptions,
    PipelineConfig,
};

#[derive(Parser)]
#[command(name = "salescast")]
#[command(about = "Sales-potential model training and scenario ranking", long_about = None)]
struct Cli {
    /// Config file (defaults to ./salescast.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a dataset, train both models and rank category/brand scenarios
    Run {
        /// Product/customer CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Write ranked scenarios to this CSV
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the trained bundle to this JSON file
        #[arg(short, long)]
        bundle: Option<PathBuf>,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        n_estimators: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Price-tier edges: reference or per_batch
        #[arg(long, value_parser = parse_price_tiers)]
        price_tiers: Option<PriceTierMode>,
    },

    /// Predict sales potential for one customer with a saved bundle
    Predict {
        #[arg(short, long)]
        bundle: PathBuf,

        #[command(flatten)]
        fields: PredictArgs,
    },

    /// Summarize a dataset
    Analytics {
        #[arg(short, long)]
        data: PathBuf,
    },
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    price: f64,
    #[arg(long)]
    age: i64,
    /// Gender code
    #[arg(long)]
    gender: i64,
    #[arg(long)]
    frequency: i64,
    #[arg(long)]
    satisfaction: i64,
    /// 1 if the customer intends to buy, else 0
    #[arg(long)]
    intent: i64,
}

impl PredictArgs {
    fn to_input(&self) -> RawInput {
        RawInput::new()
            .with("price", self.price)
            .with("age", self.age)
            .with("gender", self.gender)
            .with("frequency", self.frequency)
            .with("satisfaction", self.satisfaction)
            .with("intent", self.intent)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut overrides =
        ConfigOverrides { log_level: cli.log_level.clone(), ..ConfigOverrides::default() };
    if let Command::Run { top_k, n_estimators, seed, price_tiers, .. } = &cli.command {
        overrides.top_k = *top_k;
        overrides.n_estimators = *n_estimators;
        overrides.random_state = *seed;
        overrides.price_tiers = *price_tiers;
    }
    let config = PipelineConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides,
    })
    .context("loading configuration")?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Run { data, out, bundle, .. } => {
            run(config, &data, out.as_deref(), bundle.as_deref())
        }
        Command::Predict { bundle, fields } => predict(&bundle, &fields),
        Command::Analytics { data } => summarize(config, &data),
    }
}

fn run(
    config: PipelineConfig,
    data: &Path,
    out: Option<&Path>,
    bundle_path: Option<&Path>,
) -> Result<()> {
    let started = Instant::now();
    let records = read_records(data).with_context(|| format!("reading {}", data.display()))?;
    let ctx = AppContext::build(config, &records).context("training models")?;

    let bundle = ctx.bundle();
    println!("Model performance:");
    for variant in bundle.variants() {
        println!(
            "  {:<18} MAE {:>10.2}  MSE {:>12.2}  R2 {:>7.4}",
            variant.kind.name(),
            variant.metrics.mae,
            variant.metrics.mse,
            variant.metrics.r2
        );
    }
    println!("Selected: {}", bundle.best_kind());

    match bundle.feature_importance() {
        FeatureImportance::Ranked(ranked) => {
            println!("Top features:");
            for entry in ranked.iter().take(10) {
                println!("  {:<32} {:.4}", entry.feature.name(), entry.importance);
            }
        }
        FeatureImportance::Unavailable(kind) => {
            println!("Feature importance unavailable for {kind}")
        }
    }

    let scenarios = ctx.scenarios().context("scoring scenarios")?;
    println!("Top scenarios:");
    for s in &scenarios {
        println!(
            "  {:<16} {:<16} {:>10.2} -> {:.2}",
            s.category, s.brand, s.price, s.predicted_sales
        );
    }

    if let Some(path) = out {
        write_scenarios(path, &scenarios).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = bundle_path {
        ctx.artifact().save(path).with_context(|| format!("writing {}", path.display()))?;
    }

    println!("{}", ctx.metrics().snapshot().to_json_line("run", Some(started.elapsed())));
    Ok(())
}

fn predict(bundle: &Path, fields: &PredictArgs) -> Result<()> {
    let artifact =
        BundleArtifact::load(bundle).with_context(|| format!("loading {}", bundle.display()))?;
    let prediction = artifact.predict_one(&fields.to_input()).context("predicting")?;
    info!(model = %artifact.selected.kind, prediction, "prediction served");
    let top_features: Vec<_> = match artifact.selected.feature_importance() {
        FeatureImportance::Ranked(ranked) => ranked.into_iter().take(5).collect(),
        FeatureImportance::Unavailable(_) => Vec::new(),
    };
    let body = serde_json::json!({
        "predicted_sales": prediction,
        "model": artifact.selected.kind.name(),
        "top_features": top_features,
    });
    println!("{body}");
    Ok(())
}

fn summarize(config: PipelineConfig, data: &Path) -> Result<()> {
    let records = read_records(data).with_context(|| format!("reading {}", data.display()))?;
    let metrics = PipelineMetrics::default();
    let processed =
        pipeline::process_dataset(&config, &records, &metrics).context("processing dataset")?;
    let summary = analytics::summarize(&processed.records).context("summarizing dataset")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
