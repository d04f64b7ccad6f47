use crate::{codec::SubtitleCodec, language};

use core::fmt;
use serde_derive::Deserialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Buttons,
    Subtitles,
    Video,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Buttons => write!(f, "buttons"),
            TrackKind::Subtitles => write!(f, "subtitles"),
            TrackKind::Video => write!(f, "video"),
            TrackKind::Other => write!(f, "other"),
        }
    }
}

/// A single stream inside a Matroska container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    /// The zero-based stream index assigned by mkvmerge for this query.
    ///
    /// `Note:` this is not stable across re-muxing, use [`Track::number`] for anything user facing.
    pub id: u32,

    /// The 1-based track number stored in the container.
    pub number: u32,

    /// The Matroska codec ID, e.g. `S_TEXT/UTF8`.
    pub codec_id: String,

    /// The language code stored in the container. May be empty.
    pub language: String,

    pub track_name: Option<String>,

    pub forced: bool,

    pub default_track: bool,

    pub kind: TrackKind,
}

impl Track {
    pub fn is_subtitle(&self) -> bool {
        self.kind == TrackKind::Subtitles
    }

    pub fn codec(&self) -> SubtitleCodec {
        SubtitleCodec::from_codec_id(&self.codec_id)
    }

    /// The track name, if it is present and not blank.
    pub fn name(&self) -> Option<&str> {
        self.track_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// A one line description, e.g. `Track 3 (eng) - Signs [ASS, forced]`.
    pub fn describe(&self) -> String {
        let mut s = format!("Track {} ({})", self.number, self.language_or_und());
        if let Some(name) = self.name() {
            s.push_str(&format!(" - {name}"));
        }

        let mut attributes = vec![self.codec().to_string()];
        if self.forced {
            attributes.push("forced".to_string());
        }
        if self.default_track {
            attributes.push("default".to_string());
        }

        s.push_str(&format!(" [{}]", attributes.join(", ")));
        s
    }

    /// The English language name, for display.
    pub fn language_name(&self) -> String {
        language::display_name(self.language_or_und())
    }

    fn language_or_und(&self) -> &str {
        if self.language.is_empty() {
            "und"
        } else {
            &self.language
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_attributes() {
        let track = Track {
            id: 4,
            number: 5,
            codec_id: "S_TEXT/ASS".to_string(),
            language: "eng".to_string(),
            track_name: Some("Signs & Songs".to_string()),
            forced: true,
            default_track: false,
            kind: TrackKind::Subtitles,
        };

        assert_eq!(track.describe(), "Track 5 (eng) - Signs & Songs [ASS, forced]");
        assert_eq!(track.language_name(), "English");
    }

    #[test]
    fn blank_names_are_absent() {
        let track = Track {
            track_name: Some("   ".to_string()),
            ..Default::default()
        };

        assert_eq!(track.name(), None);
        assert_eq!(track.describe(), "Track 0 (und) [Unknown]");
    }
}
