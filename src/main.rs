use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};

use ensamble_bagging::{
    BaggingClassifier, BaggingConfig, DecisionTreeConfig, MaxFeatures, OobMode, SplitCriterion,
};
use ensamble_io::{
    ClassNames, DatasetReader, FeatureVector, Health, ModelInfo, Prediction, ResultWriter,
    TrainingSummary, to_json,
};

/// The fitted model type: labels are integer class codes.
type Model = BaggingClassifier<u32>;

#[derive(Parser)]
#[command(name = "ensamble")]
#[command(about = "Bagging ensemble classifier: train, inspect, and predict")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel prediction (defaults to all cores)
    #[arg(long, global = true, env = "ENSAMBLE_THREADS")]
    threads: Option<usize>,
}

/// Service identity reported by `info`. Each flag falls back to its
/// environment variable, which may come from a `.env` file.
#[derive(Args, Debug, Clone)]
struct Settings {
    /// Application name
    #[arg(long, global = true, env = "ENSAMBLE_APP_NAME", default_value = "Ensamble API")]
    app_name: String,

    /// Application version
    #[arg(long, global = true, env = "ENSAMBLE_APP_VERSION", default_value = "1.0.0")]
    app_version: String,

    /// Team identifier
    #[arg(long, global = true, env = "ENSAMBLE_MODEL_TEAM", default_value = "pi")]
    model_team: String,

    /// Model family label
    #[arg(
        long,
        global = true,
        env = "ENSAMBLE_MODEL_TYPE",
        default_value = "RandomForestClassifier"
    )]
    model_type: String,
}

#[derive(Subcommand)]
enum Command {
    /// Fit an ensemble on a labeled CSV and save it
    Train {
        /// Path to the labeled CSV (features first, integer class code last)
        #[arg(long)]
        data: PathBuf,

        /// Path to write the model binary
        #[arg(long)]
        output: PathBuf,

        /// Number of estimators
        #[arg(long, env = "ENSAMBLE_N_ESTIMATORS", default_value_t = 100)]
        n_estimators: usize,

        /// Maximum depth of every estimator
        #[arg(long, env = "ENSAMBLE_MAX_DEPTH", default_value_t = 8)]
        max_depth: usize,

        /// Grow estimators without a depth limit (overrides --max-depth)
        #[arg(long, default_value_t = false)]
        unlimited_depth: bool,

        /// Features per estimator: "sqrt", "all", a fraction like 0.5, or a count like 3
        #[arg(long, env = "ENSAMBLE_MAX_FEATURES", default_value = "sqrt")]
        max_features: String,

        /// Split quality criterion: "gini" or "entropy"
        #[arg(long, env = "ENSAMBLE_CRITERION", default_value = "gini")]
        criterion: String,

        /// Minimum rows a node needs before it may split
        #[arg(long, default_value_t = 2)]
        min_samples_split: usize,

        /// Minimum rows on each side of a split
        #[arg(long, default_value_t = 1)]
        min_samples_leaf: usize,

        /// Compute the out-of-bag accuracy
        #[arg(long, default_value_t = false)]
        oob: bool,

        /// RNG seed for reproducibility
        #[arg(long, env = "ENSAMBLE_SEED", default_value_t = 42)]
        seed: u64,

        /// Seed from OS entropy instead of --seed
        #[arg(long, default_value_t = false)]
        random_seed: bool,

        /// Also write the training summary to {report_dir}/{model stem}_train.json
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Predict the class of one feature vector
    Predict {
        /// Path to the trained model binary
        #[arg(long, env = "ENSAMBLE_MODEL")]
        model: PathBuf,

        /// Comma-separated feature values, e.g. 5.1,3.5,1.4,0.2
        #[arg(long, allow_hyphen_values = true)]
        features: String,

        /// Comma-separated class names in class-code order
        #[arg(
            long,
            env = "ENSAMBLE_CLASS_NAMES",
            default_value = "setosa,versicolor,virginica"
        )]
        class_names: String,
    },

    /// Print model configuration and metadata
    Info {
        /// Path to the trained model binary
        #[arg(long, env = "ENSAMBLE_MODEL")]
        model: PathBuf,
    },

    /// Check that the model loads
    Health {
        /// Path to the trained model binary
        #[arg(long, env = "ENSAMBLE_MODEL")]
        model: PathBuf,
    },
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s.trim() {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "all" => Ok(MaxFeatures::All),
        other if other.contains('.') => other
            .parse::<f64>()
            .map(MaxFeatures::Fraction)
            .with_context(|| format!("invalid max_features fraction: {other}")),
        other => other.parse::<usize>().map(MaxFeatures::Count).with_context(|| {
            format!("unknown max_features: {other} (expected sqrt, all, a fraction, or a count)")
        }),
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s.trim().to_ascii_lowercase().as_str() {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn describe_criterion(criterion: SplitCriterion) -> String {
    match criterion {
        SplitCriterion::Gini => "gini".to_string(),
        SplitCriterion::Entropy => "entropy".to_string(),
    }
}

fn describe_max_features(policy: MaxFeatures) -> String {
    match policy {
        MaxFeatures::Sqrt => "sqrt".to_string(),
        MaxFeatures::All => "all".to_string(),
        MaxFeatures::Fraction(f) => f.to_string(),
        MaxFeatures::Count(k) => k.to_string(),
    }
}

fn load_model(path: &Path) -> Result<Model> {
    let model = Model::load(path)
        .with_context(|| format!("failed to load model {}", path.display()))?;
    info!(
        n_estimators = model.members().len(),
        n_features = model.n_features(),
        n_classes = model.classes().len(),
        "model loaded"
    );
    Ok(model)
}

fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            output,
            n_estimators,
            max_depth,
            unlimited_depth,
            max_features,
            criterion,
            min_samples_split,
            min_samples_leaf,
            oob,
            seed,
            random_seed,
            report_dir,
        } => {
            let dataset = DatasetReader::new(&data)
                .read()
                .context("failed to read training CSV")?;
            let n_samples = dataset.n_samples();
            let n_features = dataset.n_features();
            let (features, labels) = dataset.into_parts();

            let config = BaggingConfig::new(n_estimators)?
                .with_max_features(parse_max_features(&max_features)?)
                .with_max_depth((!unlimited_depth).then_some(max_depth))
                .with_oob_mode(if oob { OobMode::Enabled } else { OobMode::Disabled })
                .with_seed((!random_seed).then_some(seed));

            let trees = DecisionTreeConfig::new()
                .with_criterion(parse_criterion(&criterion)?)
                .with_min_samples_split(min_samples_split)
                .with_min_samples_leaf(min_samples_leaf);
            trees.validate().context("invalid tree settings")?;

            let mut model: Model = config.build_with(trees);
            model
                .fit(&features, &labels)
                .context("ensemble training failed")?;
            model.save(&output).context("failed to save model")?;

            let summary = TrainingSummary {
                n_samples,
                n_features,
                n_classes: model.classes().len(),
                n_estimators: model.members().len(),
                oob_score: model.oob_score()?,
                model_path: output.display().to_string(),
            };

            if let Some(dir) = report_dir {
                let stem = output
                    .file_stem()
                    .map_or_else(|| "model".into(), |s| s.to_string_lossy());
                ResultWriter::new(&dir)?.write(&format!("{stem}_train"), &summary)?;
            }

            println!("{}", to_json(&summary)?);
        }

        Command::Predict {
            model,
            features,
            class_names,
        } => {
            let model = load_model(&model)?;
            let input = FeatureVector::parse(&features, model.n_features())
                .context("invalid prediction input")?;
            let code = model
                .predict_one(input.as_slice())
                .context("prediction failed")?;

            let prediction = Prediction {
                prediction: ClassNames::parse(&class_names).name(code).to_string(),
            };
            info!(code, prediction = %prediction.prediction, "prediction made");
            println!("{}", to_json(&prediction)?);
        }

        Command::Info { model } => {
            let model = load_model(&model)?;
            let config = model.config();
            let output = ModelInfo {
                app_name: cli.settings.app_name,
                version: cli.settings.app_version,
                team: cli.settings.model_team,
                model: cli.settings.model_type,
                n_estimators: config.n_estimators(),
                max_features: describe_max_features(config.max_features()),
                max_depth: config.max_depth(),
                criterion: describe_criterion(model.factory().criterion()),
                min_samples_split: model.factory().min_samples_split(),
                min_samples_leaf: model.factory().min_samples_leaf(),
                n_features: model.n_features(),
                classes: model.classes().to_vec(),
                oob_score: model.oob_score()?,
            };
            println!("{}", to_json(&output)?);
        }

        Command::Health { model } => {
            load_model(&model)?;
            println!("{}", to_json(&Health::ok())?);
        }
    }

    Ok(())
}
