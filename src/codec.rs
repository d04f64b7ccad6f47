use core::fmt;
use std::path::{Path, PathBuf};

/// The extension used when a codec ID is not recognised.
pub const DEFAULT_EXTENSION: &str = "srt";

/// The VobSub index file written alongside the `.sub` payload.
pub const VOBSUB_INDEX_EXTENSION: &str = "idx";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubtitleCodec {
    AdvancedSsa,
    DvbSubtitle,
    Hdmv,
    HdmvText,
    Kate,
    SubStationAlpha,
    SubTextUtf8,
    #[default]
    Unknown,
    UniversalSubtitle,
    VobSub,
    WebVtt,
}

impl SubtitleCodec {
    /// Map a Matroska codec ID onto a subtitle codec.
    ///
    /// # Arguments
    ///
    /// * `codec_id` - The codec ID, as reported by mkvmerge (e.g. `S_TEXT/UTF8`).
    pub fn from_codec_id(codec_id: &str) -> Self {
        match codec_id.trim().to_uppercase().as_str() {
            "S_TEXT/UTF8" | "S_TEXT/ASCII" => SubtitleCodec::SubTextUtf8,
            "S_TEXT/SSA" | "S_SSA" => SubtitleCodec::SubStationAlpha,
            "S_TEXT/ASS" | "S_ASS" => SubtitleCodec::AdvancedSsa,
            "S_TEXT/USF" => SubtitleCodec::UniversalSubtitle,
            "S_TEXT/WEBVTT" => SubtitleCodec::WebVtt,
            "S_VOBSUB" => SubtitleCodec::VobSub,
            "S_HDMV/PGS" => SubtitleCodec::Hdmv,
            "S_HDMV/TEXTST" => SubtitleCodec::HdmvText,
            "S_DVBSUB" => SubtitleCodec::DvbSubtitle,
            "S_KATE" => SubtitleCodec::Kate,
            _ => SubtitleCodec::Unknown,
        }
    }

    /// Get the file extension that mkvextract writes for this codec.
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleCodec::AdvancedSsa => "ass",
            SubtitleCodec::DvbSubtitle => "dvbsub",
            SubtitleCodec::Hdmv => "sup",
            SubtitleCodec::HdmvText => "textst",
            SubtitleCodec::Kate => "ogg",
            SubtitleCodec::SubStationAlpha => "ssa",
            SubtitleCodec::SubTextUtf8 => "srt",
            SubtitleCodec::Unknown => DEFAULT_EXTENSION,
            SubtitleCodec::UniversalSubtitle => "usf",
            // mkvextract writes the .idx index next to this payload.
            SubtitleCodec::VobSub => "sub",
            SubtitleCodec::WebVtt => "vtt",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != SubtitleCodec::Unknown
    }
}

impl fmt::Display for SubtitleCodec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}", self.extension().to_uppercase())
        } else {
            write!(f, "Unknown")
        }
    }
}

const KNOWN_CODECS: [SubtitleCodec; 10] = [
    SubtitleCodec::AdvancedSsa,
    SubtitleCodec::DvbSubtitle,
    SubtitleCodec::Hdmv,
    SubtitleCodec::HdmvText,
    SubtitleCodec::Kate,
    SubtitleCodec::SubStationAlpha,
    SubtitleCodec::SubTextUtf8,
    SubtitleCodec::UniversalSubtitle,
    SubtitleCodec::VobSub,
    SubtitleCodec::WebVtt,
];

/// Get the canonical file extension for a codec ID, falling back to `srt`.
pub fn extension_for_codec(codec_id: &str) -> &'static str {
    SubtitleCodec::from_codec_id(codec_id).extension()
}

/// Check whether a codec ID produces files of the given format.
pub fn format_matches(codec_id: &str, token: &str) -> bool {
    extension_for_codec(codec_id).eq_ignore_ascii_case(token)
}

/// Return a boolean value indicating whether a token is a known subtitle extension.
pub fn is_format_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    KNOWN_CODECS.iter().any(|c| c.extension() == lower)
}

/// List every file that extracting a track to `destination` will produce.
///
/// VobSub tracks produce an `.idx` index next to the `.sub` payload; every
/// other codec produces exactly the destination file.
///
/// # Arguments
///
/// * `destination` - The path handed to mkvextract.
/// * `codec_id` - The codec ID of the track being extracted.
pub fn output_files(destination: &Path, codec_id: &str) -> Vec<PathBuf> {
    if SubtitleCodec::from_codec_id(codec_id) != SubtitleCodec::VobSub {
        return vec![destination.to_path_buf()];
    }

    vec![
        destination.with_extension(VOBSUB_INDEX_EXTENSION),
        destination.with_extension(SubtitleCodec::VobSub.extension()),
    ]
}
