use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Runtime options, deserializable from an optional `--config` JSON file and
/// overridable by CLI flags (CLI wins). Field names and defaults follow the
/// option table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enable_cut_up: bool,
    /// `-1` means unlimited.
    pub max_perms: i32,
    pub filter_notes: bool,
    pub velocity_min: u8,
    pub velocity_max: u8,
    /// Milliseconds; converted to ticks via the song tempo before filtering.
    pub duration_min: u32,
    pub extract_audio: bool,
    pub compress_audio: bool,
    pub override_pitch_bend: bool,
    pub pitch_bend_multiplier: i32,
    pub track_limit: u16,
    pub rename_tracks: bool,
    pub track_map: HashMap<u8, String>,
    pub debug: bool,
    pub dump_file: bool,
    pub write_to_file: bool,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enable_cut_up: false,
            max_perms: -1,
            filter_notes: false,
            velocity_min: 20,
            velocity_max: 127,
            duration_min: 40,
            extract_audio: false,
            compress_audio: true,
            override_pitch_bend: false,
            pitch_bend_multiplier: 24,
            track_limit: 16,
            rename_tracks: true,
            track_map: default_track_map(),
            debug: false,
            dump_file: false,
            write_to_file: false,
            config_path: None,
        }
    }
}

impl Config {
    /// Loads a JSON config file and layers it over the defaults. Returns the
    /// defaults unchanged if `path` is `None`.
    pub fn load(path: Option<&std::path::Path>) -> std::io::Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Config {
            config_path: Some(path.to_path_buf()),
            ..config
        })
    }

    pub fn track_limit(&self) -> u16 {
        self.track_limit.clamp(1, 128)
    }
}

/// The note -> drum name mapping used by `--rename-tracks` when splitting
/// a percussion track into per-note stems.
fn default_track_map() -> HashMap<u8, String> {
    let entries: &[(u8, &str)] = &[
        (35, "Kick"),
        (36, "Kick2"),
        (37, "Sidestick"),
        (38, "Snare"),
        (39, "Clap"),
        (32, "RimShot"),
        (40, "Rimshot"),
        (41, "TomFloorLo"),
        (42, "HiHatClosed"),
        (43, "TomFloorHi"),
        (31, "PedalHiHat"),
        (33, "PedalHiHat"),
        (44, "PedalHiHat"),
        (45, "TomLo"),
        (46, "HiHatOpen"),
        (47, "TomLoMid"),
        (48, "TomHiMid"),
        (49, "Crash"),
        (50, "TomHi"),
        (51, "Ride"),
        (52, "RideChina"),
        (53, "RideBell"),
        (54, "Tambourine"),
        (55, "Splash"),
        (56, "Cowbell"),
        (57, "Crash2"),
        (58, "Vibraslap"),
        (59, "Ride2"),
        (60, "BongoHi"),
        (61, "BongoLo"),
        (62, "CongaMuteHi"),
        (63, "CongaOpenHi"),
        (64, "CongaLo"),
        (65, "TimbaleHi"),
        (66, "TimbaleLo"),
        (67, "AgogoHi"),
        (68, "AgogoLo"),
        (69, "Cabasa"),
        (70, "Maracas"),
        (71, "WhistleShort"),
        (72, "WhistleLong"),
        (73, "GuiroShort"),
        (74, "GuiroLong"),
        (75, "Claves"),
        (76, "WoodBlockHi"),
        (77, "WoodBlockLo"),
        (78, "CuicaMute"),
        (79, "CuicaOpen"),
        (80, "TriangleMute"),
        (81, "TriangleOpen"),
    ];
    entries.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_table() {
        let config = Config::default();
        assert_eq!(config.max_perms, -1);
        assert_eq!(config.track_limit(), 16);
        assert_eq!(config.track_map.get(&38), Some(&"Snare".to_string()));
    }

    #[test]
    fn track_limit_clamps_to_valid_range() {
        let mut config = Config::default();
        config.track_limit = 0;
        assert_eq!(config.track_limit(), 1);
        config.track_limit = 200;
        assert_eq!(config.track_limit(), 128);
    }
}
