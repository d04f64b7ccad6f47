use hashbrown::HashMap;
use lazy_static::lazy_static;

/// ISO 639-1 code, ISO 639-2/B code (the form mkvmerge reports) and English name.
const LANGUAGES: [(&str, &str, &str); 46] = [
    ("en", "eng", "English"),
    ("es", "spa", "Spanish"),
    ("fr", "fre", "French"),
    ("de", "ger", "German"),
    ("it", "ita", "Italian"),
    ("pt", "por", "Portuguese"),
    ("ru", "rus", "Russian"),
    ("ja", "jpn", "Japanese"),
    ("ko", "kor", "Korean"),
    ("zh", "chi", "Chinese"),
    ("ar", "ara", "Arabic"),
    ("hi", "hin", "Hindi"),
    ("nl", "dut", "Dutch"),
    ("sv", "swe", "Swedish"),
    ("no", "nor", "Norwegian"),
    ("da", "dan", "Danish"),
    ("fi", "fin", "Finnish"),
    ("pl", "pol", "Polish"),
    ("cs", "cze", "Czech"),
    ("hu", "hun", "Hungarian"),
    ("tr", "tur", "Turkish"),
    ("he", "heb", "Hebrew"),
    ("th", "tha", "Thai"),
    ("vi", "vie", "Vietnamese"),
    ("el", "gre", "Greek"),
    ("ro", "rum", "Romanian"),
    ("uk", "ukr", "Ukrainian"),
    ("bg", "bul", "Bulgarian"),
    ("hr", "hrv", "Croatian"),
    ("sr", "srp", "Serbian"),
    ("sk", "slo", "Slovak"),
    ("sl", "slv", "Slovenian"),
    ("et", "est", "Estonian"),
    ("lv", "lav", "Latvian"),
    ("lt", "lit", "Lithuanian"),
    ("id", "ind", "Indonesian"),
    ("ms", "may", "Malay"),
    ("fa", "per", "Persian"),
    ("ta", "tam", "Tamil"),
    ("te", "tel", "Telugu"),
    ("bn", "ben", "Bengali"),
    ("is", "ice", "Icelandic"),
    ("ca", "cat", "Catalan"),
    ("eu", "baq", "Basque"),
    ("gl", "glg", "Galician"),
    ("tl", "tgl", "Tagalog"),
];

lazy_static! {
    static ref TWO_TO_THREE: HashMap<&'static str, &'static str> =
        LANGUAGES.iter().map(|(two, three, _)| (*two, *three)).collect();

    /// Built once from the forward table. When two 2-letter codes share a
    /// 3-letter code, the first one in table order is kept.
    static ref THREE_TO_TWO: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::with_capacity(LANGUAGES.len());
        for (two, three, _) in LANGUAGES.iter() {
            map.entry(*three).or_insert(*two);
        }
        map
    };

    static ref NAMES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::with_capacity(LANGUAGES.len() * 2);
        for (two, three, name) in LANGUAGES.iter() {
            map.insert(*two, *name);
            map.insert(*three, *name);
        }
        map
    };
}

/// Convert a 2-letter language code into its 3-letter form.
///
/// # Arguments
///
/// * `code` - The 2-letter code, in any case.
pub fn to_three_letter(code: &str) -> Option<&'static str> {
    TWO_TO_THREE.get(code.to_lowercase().as_str()).copied()
}

/// Convert a 3-letter language code into its 2-letter form.
///
/// # Arguments
///
/// * `code` - The 3-letter code, in any case.
pub fn to_two_letter(code: &str) -> Option<&'static str> {
    THREE_TO_TWO.get(code.to_lowercase().as_str()).copied()
}

/// Get the English name of a language, or the code itself when it is unknown.
pub fn display_name(code: &str) -> String {
    match NAMES.get(code.to_lowercase().as_str()) {
        Some(name) => name.to_string(),
        None => code.to_string(),
    }
}

/// Return a boolean value indicating whether a token names a known language.
///
/// Two letter tokens must be a known 2-letter code, three letter tokens a
/// known 3-letter code. Anything else is not a language token.
pub fn is_language_token(token: &str) -> bool {
    match token.len() {
        2 => to_three_letter(token).is_some(),
        3 => to_two_letter(token).is_some(),
        _ => false,
    }
}

/// Check whether the language of a track satisfies a language filter token.
///
/// # Arguments
///
/// * `track_language` - The language code stored in the container.
/// * `filter` - The 2 or 3 letter code supplied by the user.
pub fn language_matches(track_language: &str, filter: &str) -> bool {
    // An empty filter places no constraint on the language.
    if filter.is_empty() {
        return true;
    }

    if track_language.eq_ignore_ascii_case(filter) {
        return true;
    }

    let mapped = match filter.len() {
        2 => to_three_letter(filter),
        3 => to_two_letter(filter),
        _ => None,
    };

    mapped.is_some_and(|code| track_language.eq_ignore_ascii_case(code))
}
