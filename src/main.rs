#![deny(missing_docs)]
#![deny(warnings)]

//! Command-line entry point: analyse one WAV file and render its thumbnail.

use std::path::{Path, PathBuf};

use tracksnip::config::{self, Settings};
use tracksnip::logging;
use tracksnip::render::{self, Fade};
use tracksnip::segment::novelty::NoveltySegmenter;
use tracksnip::thumbnail::{RankingMode, ThumbnailPolicy, TrackAnalyser};
use tracksnip::waveform::decode;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(default_log_directive(options.quiet, options.verbose)) {
        eprintln!("Logging disabled: {err}");
    }

    let settings = config::load_or_default().map_err(|err| err.to_string())?;
    let policy = build_policy(&settings, &options);
    let fade = build_fade(&settings, &options);

    tracing::info!(input = %options.input.display(), "loading audio");
    let audio = decode::load_wav(&options.input).map_err(|err| err.to_string())?;
    let segmenter = NoveltySegmenter::new(audio.sample_rate()).map_err(|err| err.to_string())?;

    let mut analyser = TrackAnalyser::new(policy);
    analyser.load(audio);
    tracing::info!("processing audio");
    analyser
        .process_all(Box::new(segmenter))
        .map_err(|err| err.to_string())?;

    let thumbnail = analyser.thumbnail().map_err(|err| err.to_string())?;
    let start_seconds = analyser
        .in_seconds(thumbnail.start)
        .map_err(|err| err.to_string())?;
    let duration_seconds = analyser
        .in_seconds(thumbnail.len())
        .map_err(|err| err.to_string())?;
    tracing::info!(
        start_seconds,
        duration_seconds,
        "creating thumbnail excerpt"
    );

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&options.input, &settings.io.output_append));
    render::create_thumbnail(&options.input, &output, start_seconds, duration_seconds, fade)
        .map_err(|err| err.to_string())?;

    if options.json {
        let summary = serde_json::json!({
            "input": options.input.display().to_string(),
            "output": output.display().to_string(),
            "start_sample": thumbnail.start,
            "end_sample": thumbnail.end,
            "start_seconds": start_seconds,
            "duration_seconds": duration_seconds,
        });
        println!("{summary}");
    }
    Ok(())
}

#[derive(Clone, Debug, Default)]
struct Options {
    input: PathBuf,
    output: Option<PathBuf>,
    fade: Option<(f64, f64)>,
    crop: Option<(f64, f64)>,
    length: Option<f64>,
    prelude: Option<f64>,
    dynamic: bool,
    no_applause: bool,
    quiet: bool,
    verbose: u8,
    json: bool,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut input = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--version" => {
                println!("tracksnip {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "-o" | "--output" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--output requires a value".to_string())?;
                options.output = Some(PathBuf::from(value));
            }
            "-f" | "--fade" => {
                options.fade = Some(parse_pair(&args, &mut idx, "--fade")?);
            }
            "-c" | "--crop" => {
                options.crop = Some(parse_pair(&args, &mut idx, "--crop")?);
            }
            "-l" | "--length" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--length requires a value".to_string())?;
                let length = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --length value: {value}"))?;
                if length <= 0.0 {
                    return Err("--length must be positive".to_string());
                }
                options.length = Some(length);
            }
            "-p" | "--prelude" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--prelude requires a value".to_string())?;
                let prelude = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --prelude value: {value}"))?;
                if prelude < 0.0 {
                    return Err("--prelude must not be negative".to_string());
                }
                options.prelude = Some(prelude);
            }
            "-d" | "--dynamic" => {
                options.dynamic = true;
            }
            "-n" | "--no-applause" => {
                options.no_applause = true;
            }
            "-q" | "--quiet" => {
                options.quiet = true;
            }
            "-v" | "--verbose" => {
                options.verbose = options.verbose.saturating_add(1);
            }
            "-vv" => {
                options.verbose = options.verbose.saturating_add(2);
            }
            "--json" => {
                options.json = true;
            }
            path if !path.starts_with('-') => {
                if input.is_some() {
                    return Err(format!("Unexpected extra argument: {path}\n\n{}", help_text()));
                }
                input = Some(PathBuf::from(path));
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    if options.quiet && options.verbose > 0 {
        return Err("--quiet and --verbose cannot be combined".to_string());
    }
    let Some(input) = input else {
        return Err(format!("Missing input file\n\n{}", help_text()));
    };
    options.input = input;
    Ok(Some(options))
}

fn parse_pair(args: &[String], idx: &mut usize, flag: &str) -> Result<(f64, f64), String> {
    let mut pair = [0.0; 2];
    for slot in &mut pair {
        *idx += 1;
        let value = args
            .get(*idx)
            .ok_or_else(|| format!("{flag} requires two values"))?;
        *slot = value
            .parse::<f64>()
            .map_err(|_| format!("Invalid {flag} value: {value}"))?;
        if *slot < 0.0 {
            return Err(format!("{flag} values must not be negative"));
        }
    }
    Ok((pair[0], pair[1]))
}

fn help_text() -> String {
    [
        "tracksnip",
        "",
        "Pick the most representative excerpt of a WAV file and render it.",
        "",
        "Usage:",
        "  tracksnip [options] <input.wav>",
        "",
        "Options:",
        "  -o, --output <path>      Output file (default: input stem + configured suffix).",
        "  -f, --fade <in> <out>    Fade-in and fade-out times in seconds.",
        "  -c, --crop <in> <out>    Seconds to crop from the start and end before analysis.",
        "  -l, --length <seconds>   Thumbnail length in seconds.",
        "  -p, --prelude <seconds>  Lead-in before the chosen segment's start.",
        "  -d, --dynamic            Rank segments by dynamic range instead of mean loudness.",
        "  -n, --no-applause        Skip applause avoidance.",
        "  -q, --quiet              Only print errors.",
        "  -v, --verbose            Raise log verbosity (repeatable).",
        "      --json               Print the chosen excerpt as JSON on stdout.",
        "      --version            Print the version and exit.",
        "  -h, --help               Show this help.",
        "",
        "Unset options fall back to the config file in the .tracksnip directory.",
    ]
    .join("\n")
}

fn default_log_directive(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn build_policy(settings: &Settings, options: &Options) -> ThumbnailPolicy {
    let (crop_start, crop_end) = options
        .crop
        .unwrap_or((settings.defaults.crop_start, settings.defaults.crop_end));
    ThumbnailPolicy {
        crop_start,
        crop_end,
        target_length: options.length.unwrap_or(settings.defaults.thumbnail_length),
        prelude: options.prelude.unwrap_or(settings.defaults.prelude),
        ranking: if options.dynamic {
            RankingMode::Dynamic
        } else {
            RankingMode::Loudest
        },
        avoid_applause: !options.no_applause,
        rms_window_size: settings.audio.rms_window_size,
    }
}

fn build_fade(settings: &Settings, options: &Options) -> Fade {
    let (fade_in, fade_out) = options
        .fade
        .unwrap_or((settings.defaults.fade_in, settings.defaults.fade_out));
    Fade { fade_in, fade_out }
}

/// Inserts `append` between the input's stem and extension.
fn derive_output_path(input: &Path, append: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}{append}");
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    input.with_file_name(name)
}
