//! End-to-end tests of the tubechord binary.
//!
//! Every run is isolated in a temporary directory with its own config home,
//! so a developer's `~/.config/tubechord` or `TUBECHORD_*` variables do not
//! leak in.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chord_analysis::{ChordEvent, ChordQuality, PitchClass, Voicing};
use chord_midi::{voiced_chords_to_midi, ExportOptions};
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "TUBECHORD_MIN_DURATION",
    "TUBECHORD_SMOOTHING_WINDOW",
    "TUBECHORD_TEMPO",
    "TUBECHORD_VELOCITY",
    "TUBECHORD_HOP_LENGTH",
    "TUBECHORD_N_FFT",
    "TUBECHORD_YT_DLP",
    "TUBECHORD_LOG_LEVEL",
    "RUST_LOG",
];

fn tubechord(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tubechord").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("HOME", dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// C major (C5, E5, G5) with the root loudest, 16-bit mono at 22.05 kHz.
fn write_c_major_wav(path: &Path, seconds: f64) {
    let sample_rate = 22050;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let partials = [(523.25, 0.45), (659.26, 0.27), (783.99, 0.22)];

    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (seconds * sample_rate as f64) as usize;
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        let value: f64 = partials
            .iter()
            .map(|(f, a)| a * (2.0 * std::f64::consts::PI * f * t).sin())
            .sum();
        writer.write_sample((value * i16::MAX as f64) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// C, Am, G at 100 BPM, written by the chord exporter.
fn write_progression_midi(path: &Path) {
    let event = |root, quality, start_time, duration| ChordEvent {
        root: PitchClass::new(root).unwrap(),
        quality,
        start_time,
        duration,
    };
    let chords = Voicing::Grade2.voice_all(&[
        event(0, ChordQuality::Major, 0.0, 1.5),
        event(9, ChordQuality::Minor, 1.5, 1.5),
        event(7, ChordQuality::Major, 3.0, 1.0),
    ]);
    let options = ExportOptions {
        tempo_bpm: 100,
        ..Default::default()
    };
    std::fs::write(path, voiced_chords_to_midi(&chords, &options).unwrap()).unwrap();
}

fn read_json(path: PathBuf) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn rejects_out_of_range_grade() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .args(["extract", "song.wav", "--grade", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--grade"));

    tubechord(&dir)
        .args(["extract", "song.wav", "--grade", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--grade"));
}

#[test]
fn rejects_out_of_range_tempo() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .args(["extract", "song.wav", "--tempo", "301"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tempo"));
}

#[test]
fn rejects_unsupported_source() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .args(["extract", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported source"));
}

#[test]
fn config_prints_defaults() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[analysis]"))
        .stdout(predicate::str::contains("smoothing_window = 9"))
        .stdout(predicate::str::contains("tempo = 80"));
}

#[test]
fn config_layers_file_then_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[export]\ntempo = 96\nvelocity = 70\n").unwrap();

    tubechord(&dir)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .env("TUBECHORD_VELOCITY", "99")
        .assert()
        .success()
        .stdout(predicate::str::contains("tempo = 96"))
        .stdout(predicate::str::contains("velocity = 99"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .args(["--config", "absent.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn extracts_chords_from_wav() {
    let dir = TempDir::new().unwrap();
    write_c_major_wav(&dir.path().join("Sine Chord.wav"), 3.0);

    tubechord(&dir)
        .args([
            "extract",
            "Sine Chord.wav",
            "--grade",
            "2",
            "--json",
            "chords.json",
            "--sheet",
            "abc",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sine_Chord.mid"))
        .stdout(predicate::str::contains("Detected 1 chord(s)"));

    assert!(dir.path().join("Sine_Chord.mid").exists());

    let report = read_json(dir.path().join("chords.json"));
    assert_eq!(report["title"], "Sine Chord");
    assert_eq!(report["grade"], 2);
    assert_eq!(report["chords"][0]["name"], "C");
    assert_eq!(report["chords"][0]["primary_notes"], serde_json::json!([60, 64, 67]));
    assert_eq!(report["chords"][0]["secondary_notes"], serde_json::json!([48]));

    let abc = std::fs::read_to_string(dir.path().join("Sine_Chord.abc")).unwrap();
    assert!(abc.contains("T:Sine Chord"));
    assert!(abc.contains("V:2 clef=bass"));
}

#[test]
fn extracts_chords_from_midi() {
    let dir = TempDir::new().unwrap();
    write_progression_midi(&dir.path().join("progression.mid"));

    tubechord(&dir)
        .args([
            "extract",
            "progression.mid",
            "-o",
            "chart.mid",
            "--json",
            "chart.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Detected 3 chord(s)"));

    let report = read_json(dir.path().join("chart.json"));
    let names: Vec<_> = report["chords"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["C", "Am", "G"]);
    // Grade 1 by default
    assert_eq!(report["chords"][1]["secondary_notes"], serde_json::json!([]));
    assert!(dir.path().join("chart.mid").exists());
}

#[test]
fn warns_when_nothing_survives() {
    let dir = TempDir::new().unwrap();
    write_c_major_wav(&dir.path().join("short.wav"), 1.0);

    tubechord(&dir)
        .args(["extract", "short.wav", "--min-duration", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No chords detected"));

    assert!(!dir.path().join("short.mid").exists());
}

#[test]
fn renders_sheet_from_midi() {
    let dir = TempDir::new().unwrap();
    write_progression_midi(&dir.path().join("progression.mid"));

    tubechord(&dir)
        .args(["sheet", "progression.mid", "-f", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("progression.abc"));

    let abc = std::fs::read_to_string(dir.path().join("progression.abc")).unwrap();
    assert!(abc.starts_with("X:1\nT:progression\n"));

    tubechord(&dir)
        .args(["sheet", "progression.mid", "--title", "Three <Chords>", "-o", "score.html"])
        .assert()
        .success();

    let html = std::fs::read_to_string(dir.path().join("score.html")).unwrap();
    assert!(html.contains("Three &lt;Chords&gt;"));
}

#[test]
fn sheet_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .args(["sheet", "progression.mid", "-f", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf"));
}

#[test]
fn help_says_which_sheet_formats_need_network() {
    let dir = TempDir::new().unwrap();
    tubechord(&dir)
        .args(["sheet", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cdn.jsdelivr.net"))
        .stdout(predicate::str::contains("abc is offline"));

    tubechord(&dir)
        .args(["extract", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cdn.jsdelivr.net"));
}
