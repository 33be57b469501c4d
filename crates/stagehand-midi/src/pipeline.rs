use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::bundle;
use crate::config::Config;
use crate::context::ParseContext;
use crate::emit::modes;
use crate::error::Result;
use crate::event::EventDecodeOptions;
use crate::linker;
use crate::offsets;
use crate::record;
use crate::song::SongMeta;

/// Diagnostic summary of one run, printed with `--debug`; never mutated
/// after the emitter returns.
#[derive(Debug, Default)]
pub struct RunReport {
    pub files_written: usize,
    pub warnings: Vec<String>,
}

/// Runs the whole pipeline: read bundle, decode, link, emit, optionally
/// copy audio. `output_dir` must already exist or be creatable.
pub fn run(bundle_dir: &Path, output_dir: &Path, config: &Config) -> Result<RunReport> {
    let buffer = bundle::read_project_buffer(bundle_dir)?;

    if config.dump_file {
        let preview = &buffer[..buffer.len().min(256)];
        log::debug!("raw buffer preview:\n{}", pretty_hex::pretty_hex(&preview.to_vec()));
    }

    let song = SongMeta::read(&buffer)?;
    let offset_list = offsets::scan(&buffer);

    let mut ctx = ParseContext::new();
    let options = EventDecodeOptions {
        override_pitch_bend: config.override_pitch_bend,
        pitch_bend_multiplier: config.pitch_bend_multiplier,
    };
    record::decode_all(&buffer, &offset_list, &mut ctx, options)?;
    linker::link(&mut ctx);

    fs::create_dir_all(output_dir).map_err(|source| crate::error::BundleError::OutputDir { source })?;

    let mut outputs = Vec::new();
    outputs.extend(modes::dump_tracks(&ctx.root, &song));
    outputs.extend(modes::dump_track_stems(&ctx.root, &song, config));
    outputs.extend(modes::dump_sections(&ctx.root, &song, config));
    outputs.extend(modes::dump_section_stems(&ctx.root, &song, config));
    if config.filter_notes {
        outputs.extend(modes::dump_sections_filtered(&ctx.root, &song, config));
    }

    let project_name = bundle_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    outputs.push(modes::dump_song(&ctx.root, &song, &project_name));

    if config.enable_cut_up {
        outputs.extend(modes::dump_cut_ups(&ctx.root, &song, config.max_perms));
    }

    let files_written = outputs.len();
    for output in outputs {
        write_output(output_dir, output)?;
    }

    if config.extract_audio {
        bundle::copy_audio_assets(bundle_dir, output_dir, config.compress_audio)?;
    }

    Ok(RunReport {
        files_written,
        warnings: ctx.warnings,
    })
}

fn write_output(output_dir: &Path, output: modes::EmitOutput) -> Result<()> {
    let full_path: PathBuf = output_dir.join(&output.path);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).map_err(|source| crate::error::BundleError::OutputDir { source })?;
    }
    let file = fs::File::create(&full_path).map_err(|source| crate::error::BundleError::Io { source })?;
    let mut writer = BufWriter::new(file);
    output
        .midi
        .write_to(&mut writer)
        .map_err(|source| crate::error::BundleError::Io { source })?;
    Ok(())
}
