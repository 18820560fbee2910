//! Channel naming utilities: detector systems and the rawid map.

use std::collections::BTreeMap;

use tp_core::{PassError, Result};

/// One detector system and the waveform field its browser shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorSystem {
    /// System name as found in the tier files (e.g. "geds", "spms").
    pub name: &'static str,
    /// Default waveform field to display for this system.
    pub default_display_wf_name: &'static str,
}

/// Map a channel name to its detector system by naming convention:
/// `S*` are SiPMs, `B*`/`V*`/`P*` are germanium detectors.
pub fn detector_system_for_channel(channel: &str) -> DetectorSystem {
    match channel.chars().next() {
        Some('S') => DetectorSystem { name: "spms", default_display_wf_name: "waveform_bit_drop" },
        Some('B') | Some('V') | Some('P') => {
            DetectorSystem { name: "geds", default_display_wf_name: "waveform_presummed" }
        }
        _ => DetectorSystem { name: "none", default_display_wf_name: "NO_WAVEFORM" },
    }
}

/// Mapping from channel key (detector name) to DAQ rawid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    channels: BTreeMap<String, u32>,
}

impl ChannelMap {
    /// Build a channel map from `(key, rawid)` pairs.
    pub fn new<K>(channels: impl IntoIterator<Item = (K, u32)>) -> Self
    where
        K: Into<String>,
    {
        ChannelMap { channels: channels.into_iter().map(|(k, r)| (k.into(), r)).collect() }
    }

    /// Rawid of `key`, if known.
    pub fn rawid(&self, key: &str) -> Option<u32> {
        self.channels.get(key).copied()
    }

    /// Channel key for a rawid; unknown rawids are an error.
    pub fn key_for_rawid(&self, rawid: u32) -> Result<&str> {
        self.channels
            .iter()
            .find(|(_, r)| **r == rawid)
            .map(|(k, _)| k.as_str())
            .ok_or(PassError::UnknownChannel(rawid))
    }

    /// All channel keys belonging to one detector system.
    pub fn keys_in_system(&self, system: &str) -> Vec<&str> {
        self.channels
            .keys()
            .filter(|k| detector_system_for_channel(k).name == system)
            .map(String::as_str)
            .collect()
    }

    /// Channel keys of one system restricted to a rawid allow-list.
    pub fn filtered_keys_in_system(&self, system: &str, rawids: &[u32]) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|(k, r)| {
                detector_system_for_channel(k).name == system && rawids.contains(r)
            })
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channelmap() -> ChannelMap {
        ChannelMap::new([("V01234A", 1104000), ("B00012B", 1104001), ("S002", 1057600)])
    }

    #[test]
    fn prefix_maps_to_system() {
        assert_eq!(detector_system_for_channel("S002").name, "spms");
        assert_eq!(detector_system_for_channel("V01234A").name, "geds");
        assert_eq!(detector_system_for_channel("P00664C").name, "geds");
        assert_eq!(detector_system_for_channel("X123").name, "none");
    }

    #[test]
    fn rawid_round_trip() {
        let map = channelmap();
        assert_eq!(map.rawid("V01234A"), Some(1104000));
        assert_eq!(map.key_for_rawid(1057600).unwrap(), "S002");
        let err = map.key_for_rawid(999).unwrap_err();
        assert!(matches!(err, PassError::UnknownChannel(999)));
    }

    #[test]
    fn keys_by_system() {
        let map = channelmap();
        assert_eq!(map.keys_in_system("geds"), ["B00012B", "V01234A"]);
        assert_eq!(map.filtered_keys_in_system("geds", &[1104000]), ["V01234A"]);
    }
}
