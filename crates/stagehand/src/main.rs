use std::path::PathBuf;

use clap::Parser;
use stagehand_midi::Config;

/// Reconstructs Standard MIDI Files from a multitrack-recorder project bundle.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the project bundle directory.
    bundle_dir: PathBuf,

    /// Optional JSON config file; CLI flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Produce cut-up permutation files for multi-take tracks.
    #[arg(long)]
    enable_cut_up: bool,

    /// Cap on cut-up permutations per track (-1 = unlimited).
    #[arg(long)]
    max_perms: Option<i32>,

    /// Produce filtered/delta section files.
    #[arg(long)]
    filter_notes: bool,

    #[arg(long)]
    velocity_min: Option<u8>,

    #[arg(long)]
    velocity_max: Option<u8>,

    /// Note-filter duration floor, in milliseconds.
    #[arg(long)]
    duration_min: Option<u32>,

    /// Copy audio assets (Media/, sampled files, freeze files) to the output.
    #[arg(long)]
    extract_audio: bool,

    /// Zip-archive copied audio directories.
    #[arg(long)]
    compress_audio: Option<bool>,

    /// Multiply decoded pitch-bend values.
    #[arg(long)]
    override_pitch_bend: bool,

    #[arg(long)]
    pitch_bend_multiplier: Option<i32>,

    /// Stem track cap, 1..128.
    #[arg(long)]
    track_limit: Option<u16>,

    /// Use the drum-kit track map as stem track names instead of note numbers.
    #[arg(long)]
    rename_tracks: Option<bool>,

    /// Force debug-level logging and print the run summary on exit.
    #[arg(long)]
    debug: bool,
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if args.enable_cut_up {
        config.enable_cut_up = true;
    }
    if let Some(v) = args.max_perms {
        config.max_perms = v;
    }
    if args.filter_notes {
        config.filter_notes = true;
    }
    if let Some(v) = args.velocity_min {
        config.velocity_min = v;
    }
    if let Some(v) = args.velocity_max {
        config.velocity_max = v;
    }
    if let Some(v) = args.duration_min {
        config.duration_min = v;
    }
    if args.extract_audio {
        config.extract_audio = true;
    }
    if let Some(v) = args.compress_audio {
        config.compress_audio = v;
    }
    if args.override_pitch_bend {
        config.override_pitch_bend = true;
    }
    if let Some(v) = args.pitch_bend_multiplier {
        config.pitch_bend_multiplier = v;
    }
    if let Some(v) = args.track_limit {
        config.track_limit = v;
    }
    if let Some(v) = args.rename_tracks {
        config.rename_tracks = v;
    }
    if args.debug {
        config.debug = true;
    }
    config
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let config = apply_overrides(config, args);

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let output_dir = stagehand_midi::bundle::output_dir_name(&args.bundle_dir, &timestamp);

    let report = stagehand_midi::pipeline::run(&args.bundle_dir, &output_dir, &config)?;

    if config.debug {
        eprintln!(
            "wrote {} files, {} warnings",
            report.files_written,
            report.warnings.len()
        );
        for warning in &report.warnings {
            eprintln!("  warning: {warning}");
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(err) = run(&args) {
        println!("{err}");
        std::process::exit(1);
    }
}
