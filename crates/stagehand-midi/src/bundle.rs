use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{BundleError, Result};

/// Reads `projectData` out of a bundle directory and decodes its embedded
/// `NS.data` payload into the raw container buffer.
pub fn read_project_buffer(bundle_dir: &Path) -> Result<Vec<u8>> {
    if !bundle_dir.is_dir() {
        return Err(BundleError::MissingBundle {
            path: bundle_dir.display().to_string(),
        }
        .into());
    }

    let project_data_path = bundle_dir.join("projectData");
    if !project_data_path.is_file() {
        return Err(BundleError::MissingProjectData.into());
    }
    let xml = fs::read_to_string(&project_data_path).map_err(|source| BundleError::Io { source })?;
    let base64_text = extract_ns_data(&xml)?;

    let cleaned: String = base64_text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|source| BundleError::Base64 { source }.into())
}

/// Walks the XML document looking for a `key` element whose text is
/// `NS.data`, then returns the text of the `data` element that follows it.
fn extract_ns_data(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut saw_ns_data_key = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(|source| BundleError::Xml { source })? {
            Event::Eof => break,
            Event::Start(tag) | Event::Empty(tag) => {
                let name = tag.name();
                let local = name.as_ref();
                if local == b"key" {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut Vec::new()) {
                        if text.unescape().map(|t| t == "NS.data").unwrap_or(false) {
                            saw_ns_data_key = true;
                        }
                    }
                } else if local == b"data" && saw_ns_data_key {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut Vec::new()) {
                        return Ok(text.unescape().map_err(|source| BundleError::Xml { source })?.into_owned());
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Err(BundleError::MissingNsData.into())
}

/// Optional audio subtrees, copied into `audio/{media,sampled,frozen}` when
/// `extractAudio` is set. Each is skipped silently if absent from the bundle.
const AUDIO_SOURCES: [(&str, &str); 3] = [
    ("Media", "media"),
    ("Media/Sampler/Sampler Files", "sampled"),
    ("Freeze Files.nosync", "frozen"),
];

/// Copies the optional audio asset subtrees into `output_dir/audio/...`,
/// zipping and removing the uncompressed copy when `compress` is set.
pub fn copy_audio_assets(bundle_dir: &Path, output_dir: &Path, compress: bool) -> Result<()> {
    for (source_name, dest_name) in AUDIO_SOURCES {
        let source = bundle_dir.join(source_name);
        if !source.is_dir() {
            continue;
        }
        let dest = output_dir.join("audio").join(dest_name);
        copy_dir_recursive(&source, &dest).map_err(|source| BundleError::Io { source })?;

        if compress {
            zip_directory(&dest).map_err(|source| BundleError::Io { source })?;
            fs::remove_dir_all(&dest).map_err(|source| BundleError::Io { source })?;
        }
    }
    Ok(())
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in walkdir::WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(source).unwrap();
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn zip_directory(dir: &Path) -> std::io::Result<()> {
    let zip_path = dir.with_extension("zip");
    let file = fs::File::create(&zip_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options: zip::write::FileOptions<()> =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(dir).unwrap();
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let bytes = fs::read(entry.path())?;
            std::io::Write::write_all(&mut writer, &bytes)?;
        }
    }
    writer.finish()?;
    Ok(())
}

/// Builds the timestamped output directory path for a run, e.g.
/// `20260727-153000_MySong`.
pub fn output_dir_name(bundle_dir: &Path, timestamp: &str) -> PathBuf {
    let project_name = bundle_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    PathBuf::from(format!("{timestamp}_{project_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ns_data_text() {
        let xml = r#"<plist><dict><key>NS.data</key><data>aGVsbG8=</data></dict></plist>"#;
        let text = extract_ns_data(xml).unwrap();
        assert_eq!(text, "aGVsbG8=");
    }

    #[test]
    fn missing_ns_data_is_an_error() {
        let xml = r#"<plist><dict><key>other</key><data>xxxx</data></dict></plist>"#;
        assert!(extract_ns_data(xml).is_err());
    }

    #[test]
    fn output_dir_name_joins_timestamp_and_project() {
        let dir = output_dir_name(Path::new("/tmp/MySong.bundle"), "20260727-153000");
        assert_eq!(dir, PathBuf::from("20260727-153000_MySong.bundle"));
    }
}
