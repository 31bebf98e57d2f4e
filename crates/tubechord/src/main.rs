//! tubechord - extract piano chords from a song and save them as MIDI
//!
//! Subcommands:
//! - `tubechord extract <SOURCE>` - URL, WAV or MIDI → chord MIDI (+ JSON, sheet music)
//! - `tubechord sheet <MIDI>` - render a MIDI file as sheet music
//! - `tubechord config` - print the effective configuration

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chord_analysis::{ChordDetector, DetectorConfig, Voicing, MAX_GRADE};
use chord_midi::ExportOptions;
use clap::{Parser, Subcommand};
use sheet::SheetFormat;
use tracing::debug;
use tubeconf::TubechordConfig;

use tubechord::audio::ChromaOptions;
use tubechord::fetch::{Source, YtDlp};
use tubechord::pipeline::{
    detect, duration_bar, export_midi, load_source, needs_title, output_filename, render_sheet,
    resolve_title, sheet_path_for, ChordReport,
};

#[derive(Parser)]
#[command(name = "tubechord")]
#[command(about = "Extract beginner piano chords from a song and save them as MIDI")]
#[command(version)]
struct Cli {
    /// Config file to load instead of ./tubechord.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect chords and write them as a two-hand MIDI file
    Extract {
        /// http(s) URL (downloaded with yt-dlp), .wav file or .mid file
        source: String,

        /// Piano grade (1: right-hand triads, 2+: triads over a bass root)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=MAX_GRADE as i64))]
        grade: u8,

        /// Destination MIDI file. Defaults to <title>.mid
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Playback tempo in BPM
        #[arg(long, value_parser = clap::value_parser!(u32).range(20..=300))]
        tempo: Option<u32>,

        /// Minimum chord duration in seconds; raise it for noisy audio
        #[arg(long, value_name = "SECS")]
        min_duration: Option<f64>,

        /// Smoothing window in frames
        #[arg(long, value_name = "FRAMES")]
        smoothing: Option<usize>,

        /// Also write the detected chords as JSON
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,

        /// Also render sheet music next to the MIDI file (html, md-vexflow, abc).
        /// html and md-vexflow load their engraving script from cdn.jsdelivr.net
        /// when opened, so viewing them needs network access. abc is offline
        #[arg(long, value_name = "FORMAT")]
        sheet: Option<SheetFormat>,
    },

    /// Render a MIDI file as sheet music (html and md-vexflow need network access to view)
    Sheet {
        /// MIDI file to engrave
        midi: PathBuf,

        /// Output format (html, md-vexflow, abc). html and md-vexflow load
        /// their engraving script from cdn.jsdelivr.net when opened, so viewing
        /// them needs network access. abc is offline
        #[arg(short, long, default_value_t = SheetFormat::Html)]
        format: SheetFormat,

        /// Destination file. Defaults to the MIDI path with the format's extension
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Score title. Defaults to the MIDI file name
        #[arg(long)]
        title: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match TubechordConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.telemetry.log_level);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("  ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, config: &TubechordConfig) -> Result<ExitCode> {
    match command {
        Commands::Extract {
            source,
            grade,
            output,
            tempo,
            min_duration,
            smoothing,
            json,
            sheet,
        } => extract(
            ExtractArgs {
                source,
                grade,
                output,
                tempo,
                min_duration,
                smoothing,
                json,
                sheet,
            },
            config,
        ),
        Commands::Sheet {
            midi,
            format,
            output,
            title,
        } => {
            let output = output.unwrap_or_else(|| sheet_path_for(&midi, format));
            let title = title
                .or_else(|| {
                    midi.file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                })
                .unwrap_or_default();
            render_sheet(&midi, &output, &title, format)?;
            println!("Wrote {} sheet music to '{}'", format, output.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

struct ExtractArgs {
    source: String,
    grade: u8,
    output: Option<PathBuf>,
    tempo: Option<u32>,
    min_duration: Option<f64>,
    smoothing: Option<usize>,
    json: Option<PathBuf>,
    sheet: Option<SheetFormat>,
}

fn extract(args: ExtractArgs, config: &TubechordConfig) -> Result<ExitCode> {
    // Flags win over config files and environment
    let detector = ChordDetector::new(DetectorConfig {
        min_chord_duration: args
            .min_duration
            .unwrap_or(config.analysis.min_chord_duration),
        smoothing_window: args.smoothing.unwrap_or(config.analysis.smoothing_window),
    });
    detector.config().validate()?;

    let export = ExportOptions {
        tempo_bpm: args.tempo.unwrap_or(config.export.tempo),
        velocity: config.export.velocity,
        bass_velocity: config.export.bass_velocity,
        ..ExportOptions::default()
    };
    export.validate()?;

    let chroma = ChromaOptions {
        hop_length: config.audio.hop_length,
        n_fft: config.audio.n_fft,
    };
    chroma.validate()?;

    let voicing = Voicing::for_grade(args.grade)?;
    let source = Source::parse(&args.source)?;
    let ytdlp = YtDlp::new(&config.audio.yt_dlp);
    debug!(?source, ?detector, ?export, "extract");

    println!("tubechord v{}", env!("CARGO_PKG_VERSION"));
    println!("  Source : {}", args.source);
    println!("  Grade  : {}  |  Tempo: {} BPM", args.grade, export.tempo_bpm);
    println!();

    let title = if needs_title(args.output.as_deref(), args.json.is_some(), args.sheet.is_some()) {
        println!("[0/4] Resolving title...");
        resolve_title(&source, &ytdlp)
    } else {
        String::new()
    };
    let output = match args.output {
        Some(path) => path,
        None => {
            let path = output_filename(&title)?;
            println!("      Output   : {}", path.display());
            println!();
            path
        }
    };

    println!("[1/4] Loading audio...");
    let loaded = load_source(&source, &chroma, &ytdlp)?;
    println!(
        "      Chroma shape : {} frames  ({:.1} s)",
        loaded.matrix.n_frames(),
        loaded.duration_seconds()
    );

    println!("[2/4] Analysing chord sequence...");
    let events = detect(&loaded, &detector)?;
    if events.is_empty() {
        eprintln!(
            "  WARNING: No chords detected. Try lowering --min-duration or checking the audio source."
        );
        return Ok(ExitCode::FAILURE);
    }

    println!("      Detected {} chord(s):", events.len());
    for event in &events {
        println!(
            "        {:7.2}s  {:<4}  {}",
            event.start_time,
            event.name(),
            duration_bar(event.duration)
        );
    }

    println!("[3/4] Applying Grade {} voicing: {}...", args.grade, voicing.describe());
    let chords = voicing.voice_all(&events);

    println!("[4/4] Writing MIDI file to '{}'...", output.display());
    export_midi(&output, &chords, &export)?;

    if let Some(path) = &args.json {
        ChordReport::new(&title, voicing, loaded.hop_duration, &chords, &export).write(path)?;
        println!("      Chord report : {}", path.display());
    }

    if let Some(format) = args.sheet {
        let path = sheet_path_for(&output, format);
        render_sheet(&output, &path, &title, format)?;
        println!("      Sheet music  : {}", path.display());
    }

    println!();
    println!(
        "Done!  Open '{}' in GarageBand, MuseScore, or any MIDI player.",
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}
