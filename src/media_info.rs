use crate::{
    codec,
    error::{Error, Result},
    track::{Track, TrackKind},
};

use hashbrown::HashSet;
use serde::de::{Deserialize, Deserializer};
use serde_derive::Deserialize;

/// The container family that mkvmerge must report for an input to be accepted.
const MATROSKA_CONTAINER: &str = "matroska";

/// The parsed output of `mkvmerge -J`.
#[derive(Debug, Deserialize)]
pub struct MkvInfo {
    #[serde(default)]
    pub container: MkvContainer,

    /// The tracks in container order.
    #[serde(default)]
    pub tracks: Vec<MkvTrack>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MkvContainer {
    #[serde(rename = "type", default)]
    pub container_type: String,
}

#[derive(Debug, Deserialize)]
pub struct MkvTrack {
    /// The query-local index of the track.
    pub id: u32,

    #[serde(rename = "type", default)]
    pub kind: TrackKind,

    #[serde(default)]
    pub properties: MkvTrackProperties,
}

/// Only the fields used for track selection and naming are read; everything
/// else mkvmerge reports (encoding, duration, UID...) is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct MkvTrackProperties {
    #[serde(default, deserialize_with = "null_to_default")]
    pub codec_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub track_name: Option<String>,

    #[serde(default, deserialize_with = "null_to_default")]
    pub language: String,

    #[serde(default)]
    pub number: u32,

    #[serde(rename = "forced_track", default, deserialize_with = "null_to_default")]
    pub forced: bool,

    #[serde(rename = "default_track", default, deserialize_with = "null_to_default")]
    pub default_track: bool,
}

/// Summary statistics for the subtitle tracks of one file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubtitleSummary {
    pub track_count: usize,
    pub languages: Vec<String>,
    pub formats: Vec<String>,
}

impl MkvInfo {
    /// Parse and validate the JSON document produced by `mkvmerge -J`.
    ///
    /// # Arguments
    ///
    /// * `json` - The raw JSON output.
    pub fn parse_json(json: &str) -> Result<Self> {
        let info = serde_json::from_str::<MkvInfo>(json)?;
        info.validate()?;

        Ok(info)
    }

    fn validate(&self) -> Result<()> {
        let container_type = self.container.container_type.trim();
        if !container_type.eq_ignore_ascii_case(MATROSKA_CONTAINER) {
            return Err(Error::NotMatroska(container_type.to_string()));
        }

        Ok(())
    }

    /// Every track in the file, converted into the internal track model.
    pub fn all_tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(Track::from).collect()
    }

    /// The subtitle tracks of the file, in container order.
    pub fn subtitle_tracks(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Subtitles)
            .map(Track::from)
            .collect()
    }

    /// The track numbers of every subtitle track.
    pub fn subtitle_track_numbers(&self) -> Vec<u32> {
        self.subtitle_tracks().iter().map(|t| t.number).collect()
    }

    /// Count the subtitle tracks, and their distinct languages and formats.
    ///
    /// Languages and formats are listed in order of first appearance. Tracks
    /// with an unrecognised codec do not contribute a format.
    pub fn summary(&self) -> SubtitleSummary {
        let mut summary = SubtitleSummary::default();
        let mut seen_languages = HashSet::new();
        let mut seen_formats = HashSet::new();

        for track in self.subtitle_tracks() {
            summary.track_count += 1;

            if !track.language.is_empty() && seen_languages.insert(track.language.clone()) {
                summary.languages.push(track.language.clone());
            }

            if track.codec().is_known() {
                let ext = codec::extension_for_codec(&track.codec_id);
                if seen_formats.insert(ext) {
                    summary.formats.push(ext.to_string());
                }
            }
        }

        summary
    }
}

impl From<&MkvTrack> for Track {
    fn from(t: &MkvTrack) -> Self {
        Track {
            id: t.id,
            number: t.properties.number,
            codec_id: t.properties.codec_id.clone(),
            language: t.properties.language.clone(),
            track_name: t.properties.track_name.clone(),
            forced: t.properties.forced,
            default_track: t.properties.default_track,
            kind: t.kind,
        }
    }
}

fn null_to_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let value = Option::<T>::deserialize(deserializer)?;

    Ok(value.unwrap_or_default())
}
