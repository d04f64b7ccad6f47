use crate::{
    codec, language,
    selection::{Selection, TrackFilter},
    track::Track,
};

/// Decide whether a track belongs to the selection.
///
/// Exclusions always win. An empty inclusion filter selects every track
/// that was not excluded.
///
/// # Arguments
///
/// * `track` - The track to be tested.
/// * `selection` - The inclusion filter and its exclusions.
pub fn matches(track: &Track, selection: &Selection) -> bool {
    if exclusion_matches(track, &selection.exclusions) {
        return false;
    }

    selection.filter.is_empty() || any_criterion(track, &selection.filter)
}

/// Return a boolean value indicating whether an exclusion filter vetoes a track.
///
/// An empty exclusion filter excludes nothing.
pub fn exclusion_matches(track: &Track, exclusion: &TrackFilter) -> bool {
    !exclusion.is_empty() && any_criterion(track, exclusion)
}

/// Filter a list of tracks down to those that belong to the selection,
/// preserving their order.
pub fn select<'a>(tracks: &'a [Track], selection: &Selection) -> Vec<&'a Track> {
    tracks.iter().filter(|t| matches(t, selection)).collect()
}

fn any_criterion(track: &Track, filter: &TrackFilter) -> bool {
    filter
        .track_numbers
        .iter()
        .any(|&n| n == i64::from(track.number))
        || filter
            .language_codes
            .iter()
            .any(|code| language::language_matches(&track.language, code))
        || filter
            .format_filters
            .iter()
            .any(|ext| codec::format_matches(&track.codec_id, ext))
}
