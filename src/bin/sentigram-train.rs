//! Runs the full sentiment training pipeline from the command line.

use std::path::PathBuf;
use std::str::FromStr;

use sentigram::classifier::Loss;
use sentigram::config::PipelineConfig;
use sentigram::logging;
use sentigram::pipeline::{CancelToken, run};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("{err}");
    }
    if let Err(err) = execute() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn execute() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = PipelineConfig::load(options.config_path.as_deref())
        .map_err(|err| err.to_string())?;
    options.apply(&mut config);

    let report = run(&config, &CancelToken::new()).map_err(|err| err.to_string())?;

    if options.json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
        println!("{rendered}");
        return Ok(());
    }

    println!("rows loaded: {}", report.rows_loaded);
    println!(
        "train/validation: {}/{}",
        report.train_samples, report.validation_samples
    );
    println!(
        "N={}  Precision@1={:.4}  Recall@1={:.4}",
        report.evaluation.sample_count,
        report.evaluation.precision_at_1,
        report.evaluation.recall_at_1
    );
    if let Some(prediction) = &report.demo_prediction {
        println!(
            "demo prediction: label={}  confidence={:.3}",
            prediction.label, prediction.confidence
        );
    }
    println!("model saved to: {}", report.model_path.display());
    Ok(())
}

#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    text_column: Option<String>,
    label_column: Option<String>,
    validation_fraction: Option<f64>,
    seed: Option<u64>,
    lexicon: Option<PathBuf>,
    demo_text: Option<String>,
    learning_rate: Option<f32>,
    epochs: Option<usize>,
    word_ngrams: Option<usize>,
    dim: Option<usize>,
    loss: Option<Loss>,
    minn: Option<usize>,
    maxn: Option<usize>,
    buckets: Option<usize>,
    min_count: Option<u64>,
    train_seed: Option<u64>,
    json: bool,
}

impl CliOptions {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(value) = &self.input {
            config.input_path = value.clone();
        }
        if let Some(value) = &self.output_dir {
            config.output_dir = value.clone();
        }
        if let Some(value) = &self.text_column {
            config.text_column = value.clone();
        }
        if let Some(value) = &self.label_column {
            config.label_column = value.clone();
        }
        if let Some(value) = self.validation_fraction {
            config.validation_fraction = value;
        }
        if let Some(value) = self.seed {
            config.seed = value;
        }
        if let Some(value) = &self.lexicon {
            config.lexicon_path = Some(value.clone());
        }
        if let Some(value) = &self.demo_text {
            config.demo_text = Some(value.clone());
        }
        if let Some(value) = self.learning_rate {
            config.training.learning_rate = value;
        }
        if let Some(value) = self.epochs {
            config.training.epochs = value;
        }
        if let Some(value) = self.word_ngrams {
            config.training.max_ngram_order = value;
        }
        if let Some(value) = self.dim {
            config.training.embedding_dim = value;
        }
        if let Some(value) = self.loss {
            config.training.loss = value;
        }
        if let Some(value) = self.minn {
            config.training.min_subword_len = value;
        }
        if let Some(value) = self.maxn {
            config.training.max_subword_len = value;
        }
        if let Some(value) = self.buckets {
            config.training.hash_buckets = value;
        }
        if let Some(value) = self.min_count {
            config.training.min_word_count = value;
        }
        if let Some(value) = self.train_seed {
            config.training.seed = value;
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => options.config_path = Some(PathBuf::from(take(&args, &mut idx, "--config")?)),
            "--input" => options.input = Some(PathBuf::from(take(&args, &mut idx, "--input")?)),
            "--output-dir" => {
                options.output_dir = Some(PathBuf::from(take(&args, &mut idx, "--output-dir")?));
            }
            "--text-col" => options.text_column = Some(take(&args, &mut idx, "--text-col")?),
            "--label-col" => options.label_column = Some(take(&args, &mut idx, "--label-col")?),
            "--validation-fraction" => {
                options.validation_fraction =
                    Some(parse(&take(&args, &mut idx, "--validation-fraction")?)?);
            }
            "--seed" => options.seed = Some(parse(&take(&args, &mut idx, "--seed")?)?),
            "--lexicon" => options.lexicon = Some(PathBuf::from(take(&args, &mut idx, "--lexicon")?)),
            "--demo" => options.demo_text = Some(take(&args, &mut idx, "--demo")?),
            "--learning-rate" => {
                options.learning_rate = Some(parse(&take(&args, &mut idx, "--learning-rate")?)?);
            }
            "--epochs" => options.epochs = Some(parse(&take(&args, &mut idx, "--epochs")?)?),
            "--word-ngrams" => {
                options.word_ngrams = Some(parse(&take(&args, &mut idx, "--word-ngrams")?)?);
            }
            "--dim" => options.dim = Some(parse(&take(&args, &mut idx, "--dim")?)?),
            "--loss" => {
                let value = take(&args, &mut idx, "--loss")?;
                options.loss = Some(Loss::from_str(&value)?);
            }
            "--minn" => options.minn = Some(parse(&take(&args, &mut idx, "--minn")?)?),
            "--maxn" => options.maxn = Some(parse(&take(&args, &mut idx, "--maxn")?)?),
            "--buckets" => options.buckets = Some(parse(&take(&args, &mut idx, "--buckets")?)?),
            "--min-count" => options.min_count = Some(parse(&take(&args, &mut idx, "--min-count")?)?),
            "--train-seed" => options.train_seed = Some(parse(&take(&args, &mut idx, "--train-seed")?)?),
            "--json" => options.json = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn take(args: &[String], idx: &mut usize, flag: &str) -> Result<String, String> {
    *idx += 1;
    args.get(*idx)
        .cloned()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid value: {value}"))
}

fn help_text() -> String {
    [
        "sentigram-train",
        "",
        "Trains and evaluates the review sentiment classifier from a labeled CSV.",
        "",
        "Usage:",
        "  sentigram-train [--config sentigram.toml] [options]",
        "",
        "Options:",
        "  --config <file>               TOML config file (default: $SENTIGRAM_CONFIG or built-in defaults).",
        "  --input <file>                Labeled CSV dataset (default: reviews.csv).",
        "  --output-dir <dir>            Destination for train.txt/valid.txt/model (default: out).",
        "  --text-col <name>             Text column name (default: comment).",
        "  --label-col <name>            Label column name (default: label).",
        "  --validation-fraction <f64>   Validation share in (0, 1) (default: 0.2).",
        "  --seed <u64>                  Split seed (default: 42).",
        "  --lexicon <file>              Multi-word phrase lexicon for segmentation.",
        "  --demo <text>                 Classify this text at the end of the run.",
        "  --learning-rate <f32>         Learning rate (default: 0.3).",
        "  --epochs <n>                  Epoch count (default: 10).",
        "  --word-ngrams <n>             Word context window (default: 2).",
        "  --dim <n>                     Embedding dimension (default: 100).",
        "  --loss <hs|softmax|ova>       Loss function (default: hs).",
        "  --minn <n>                    Minimum subword length (default: 2).",
        "  --maxn <n>                    Maximum subword length (default: 5).",
        "  --buckets <n>                 Hashed n-gram rows (default: 100000).",
        "  --min-count <n>               Minimum word count for the vocabulary (default: 1).",
        "  --train-seed <u64>            Training seed (default: 42).",
        "  --json                        Print the run report as JSON.",
    ]
    .join("\n")
}
