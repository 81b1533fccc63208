//! Classifies a single text against a saved sentiment model.

use std::path::PathBuf;

use sentigram::logging;
use sentigram::service::SentimentTagger;

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("{err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let (model_path, lexicon_path, text) = parse_args(std::env::args().skip(1).collect())?;
    let tagger = SentimentTagger::load(&model_path, lexicon_path.as_deref())
        .map_err(|err| err.to_string())?;
    let prediction = tagger.predict(&text);
    println!(
        "label={}  confidence={:.3}",
        prediction.label, prediction.confidence
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<(PathBuf, Option<PathBuf>, String), String> {
    let mut model_path = PathBuf::from("out/sentiment_model.bin");
    let mut lexicon_path: Option<PathBuf> = None;
    let mut text_parts: Vec<String> = Vec::new();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model requires a value".to_string())?;
                model_path = PathBuf::from(value);
            }
            "--lexicon" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--lexicon requires a value".to_string())?;
                lexicon_path = Some(PathBuf::from(value));
            }
            other => text_parts.push(other.to_string()),
        }
        idx += 1;
    }

    if text_parts.is_empty() {
        return Err(help_text());
    }
    Ok((model_path, lexicon_path, text_parts.join(" ")))
}

fn help_text() -> String {
    [
        "sentigram-predict",
        "",
        "Classifies one text with a trained sentiment model.",
        "",
        "Usage:",
        "  sentigram-predict [--model out/sentiment_model.bin] [--lexicon file] <text>...",
    ]
    .join("\n")
}
