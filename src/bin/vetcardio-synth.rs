//! Write a synthetic phonocardiogram WAV for fixtures and demos.

use std::path::PathBuf;

use vetcardio::synth::{PcgParams, generate_pcg, write_wav};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let (out_path, params) = parse_args(std::env::args().skip(1).collect())?;
    let samples = generate_pcg(&params).map_err(|err| err.to_string())?;
    write_wav(&out_path, &samples, params.sample_rate).map_err(|err| err.to_string())?;
    println!(
        "Wrote {} ({} samples, severity {})",
        out_path.display(),
        samples.len(),
        params.severity
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<(PathBuf, PcgParams), String> {
    let mut out_path: Option<PathBuf> = None;
    let mut params = PcgParams::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--severity" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--severity requires a value".to_string())?;
                params.severity = value
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid --severity value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                params.seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            "--seconds" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--seconds requires a value".to_string())?;
                params.duration_secs = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --seconds value: {value}"))?;
            }
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            path => out_path = Some(PathBuf::from(path)),
        }
        idx += 1;
    }

    let out_path = out_path.ok_or_else(help_text)?;
    Ok((out_path, params))
}

fn help_text() -> String {
    "Usage: vetcardio-synth <out.wav> [--severity N] [--seed N] [--seconds S]".to_string()
}
