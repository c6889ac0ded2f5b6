//! Evaluate one heart-sound recording and print the outcome as JSON.

use std::path::PathBuf;

use serde_json::json;
use vetcardio::classifier::{self, Classifier, ClassifierState};
use vetcardio::evaluation::{EvaluationPipeline, StagedAudio};
use vetcardio::records::{EvaluationRecord, EvaluationSink, MemorySink};
use vetcardio::upload::AudioContainer;
use vetcardio::{logging, settings};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    audio_path: PathBuf,
    animal_id: Option<String>,
    consume: bool,
    write_config: bool,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    if options.write_config {
        let path = settings::write_config_file().map_err(|err| err.to_string())?;
        eprintln!("Wrote {}", path.display());
    }
    let settings = settings::load_or_default().map_err(|err| err.to_string())?;

    let model_path = settings
        .resolved_model_path()
        .map_err(|err| err.to_string())?;
    classifier::install_global(Classifier::from_model_path(&model_path))
        .map_err(|_| "classifier already installed".to_string())?;
    let classifier = classifier::global().ok_or_else(|| "classifier not installed".to_string())?;
    if settings.preload_model && classifier.preload() == ClassifierState::Unavailable {
        eprintln!(
            "Model unavailable at {}: {}",
            model_path.display(),
            classifier.unavailable_reason().unwrap_or("unknown error")
        );
    }

    let file_name = options
        .audio_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if AudioContainer::from_file_name(file_name).is_none() {
        return Err(format!(
            "unsupported_extension: {} is not a WAV or MP3 file",
            options.audio_path.display()
        ));
    }

    let pipeline =
        EvaluationPipeline::from_settings(classifier, &settings).map_err(|err| err.to_string())?;
    let staged = if options.consume {
        StagedAudio::adopt(&options.audio_path)
    } else {
        StagedAudio::copy_into(pipeline.staging_dir(), &options.audio_path).map_err(|err| {
            format!(
                "staging_failed: could not stage {}: {err}",
                options.audio_path.display()
            )
        })?
    };
    let outcome = pipeline
        .evaluate(staged)
        .map_err(|err| format!("{}: {err}", err.code()))?;

    let report = match options.animal_id {
        Some(animal_id) => {
            let sink = MemorySink::new();
            let record = EvaluationRecord::from_outcome(animal_id, &outcome);
            sink.store(record.clone()).map_err(|err| err.to_string())?;
            json!({ "outcome": outcome, "record": record })
        }
        None => json!({ "outcome": outcome }),
    };
    let text = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut audio_path: Option<PathBuf> = None;
    let mut animal_id: Option<String> = None;
    let mut consume = false;
    let mut write_config = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--animal" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--animal requires a value".to_string())?;
                animal_id = Some(value.to_string());
            }
            "--consume" => consume = true,
            "--write-config" => write_config = true,
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            path => {
                if audio_path.is_some() {
                    return Err(format!("Unexpected extra path: {path}"));
                }
                audio_path = Some(PathBuf::from(path));
            }
        }
        idx += 1;
    }

    let audio_path = audio_path.ok_or_else(help_text)?;
    Ok(CliOptions {
        audio_path,
        animal_id,
        consume,
        write_config,
    })
}

fn help_text() -> String {
    [
        "Usage: vetcardio <audio.wav|audio.mp3> [--animal <id>] [--consume] [--write-config]",
        "",
        "  --animal <id>    Also print the evaluation record for this animal",
        "  --consume        Evaluate the file in place and delete it afterwards",
        "  --write-config   Save the effective settings to config.toml",
    ]
    .join("\n")
}
