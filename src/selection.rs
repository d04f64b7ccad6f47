use crate::{codec, language};

use log::warn;

/// A single comma separated item of a selection expression, classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A track number, as stored in the container.
    Number(i64),
    /// A 2 or 3 letter language code, verbatim.
    Language(String),
    /// A subtitle format, lowercased.
    Format(String),
    /// Anything that could not be recognised.
    Invalid(String),
}

impl Token {
    /// Classify a trimmed, non-empty token.
    ///
    /// Numbers take precedence over languages, which take precedence over
    /// formats. When `available` is supplied, a number that is not in the
    /// list is reported as invalid instead of being accepted.
    ///
    /// # Arguments
    ///
    /// * `item` - The token to be classified.
    /// * `available` - The track numbers present in the file(s), if numbers should be validated.
    pub fn classify(item: &str, available: Option<&[u32]>) -> Token {
        if let Ok(n) = item.parse::<i64>() {
            return match available {
                Some(numbers) if !numbers.iter().any(|&a| i64::from(a) == n) => {
                    Token::Invalid(item.to_string())
                }
                _ => Token::Number(n),
            };
        }

        if language::is_language_token(item) {
            Token::Language(item.to_string())
        } else if codec::is_format_token(item) {
            Token::Format(item.to_lowercase())
        } else {
            Token::Invalid(item.to_string())
        }
    }
}

/// Split an expression into its trimmed, non-empty items.
pub fn tokenize(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// A set of languages, track numbers and formats.
///
/// The same shape is used both to select tracks and to exclude them. An
/// empty filter selects everything, or excludes nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub language_codes: Vec<String>,
    pub track_numbers: Vec<i64>,
    pub format_filters: Vec<String>,
}

impl TrackFilter {
    pub fn is_empty(&self) -> bool {
        self.language_codes.is_empty()
            && self.track_numbers.is_empty()
            && self.format_filters.is_empty()
    }

    /// Add a classified token to the filter. Invalid tokens are returned
    /// back to the caller, duplicates are dropped.
    fn push(&mut self, token: Token) -> Option<String> {
        match token {
            Token::Number(n) => {
                if !self.track_numbers.contains(&n) {
                    self.track_numbers.push(n);
                }
            }
            Token::Language(code) => {
                if !self
                    .language_codes
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&code))
                {
                    self.language_codes.push(code);
                }
            }
            Token::Format(ext) => {
                if !self.format_filters.contains(&ext) {
                    self.format_filters.push(ext);
                }
            }
            Token::Invalid(item) => return Some(item),
        }

        None
    }

    /// Render the filter back into an expression that parses to the same filter.
    pub fn to_expression(&self) -> String {
        let mut parts: Vec<String> = self.language_codes.clone();
        parts.extend(self.track_numbers.iter().map(|n| n.to_string()));
        parts.extend(self.format_filters.iter().cloned());

        parts.join(",")
    }

    /// A human readable description, e.g. `languages: eng,spa, track IDs: [14 16]`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        if !self.language_codes.is_empty() {
            parts.push(format!("languages: {}", self.language_codes.join(",")));
        }

        if !self.track_numbers.is_empty() {
            let numbers: Vec<String> = self.track_numbers.iter().map(|n| n.to_string()).collect();
            parts.push(format!("track IDs: [{}]", numbers.join(" ")));
        }

        if !self.format_filters.is_empty() {
            parts.push(format!("formats: {}", self.format_filters.join(",")));
        }

        parts.join(", ")
    }
}

/// The user's intent for one run: what to include, and what to veto.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub filter: TrackFilter,
    pub exclusions: TrackFilter,
}

impl Selection {
    pub fn new(filter: TrackFilter, exclusions: TrackFilter) -> Self {
        Self { filter, exclusions }
    }

    /// A one line summary of what this selection will extract.
    pub fn message(&self) -> String {
        match (self.filter.is_empty(), self.exclusions.is_empty()) {
            (true, true) => "Extracting all subtitle tracks...".to_string(),
            (true, false) => format!(
                "Extracting all tracks except {}",
                self.exclusions.describe()
            ),
            (false, true) => format!("Extracting tracks for {}", self.filter.describe()),
            (false, false) => format!(
                "Extracting tracks for {}, excluding {}",
                self.filter.describe(),
                self.exclusions.describe()
            ),
        }
    }
}

fn parse(input: &str, available: Option<&[u32]>, purpose: &str) -> (TrackFilter, Vec<String>) {
    let mut filter = TrackFilter::default();
    let mut invalid = Vec::new();

    for item in tokenize(input) {
        if let Some(bad) = filter.push(Token::classify(item, available)) {
            warn!(
                "Skipping {purpose} item '{bad}': unknown language code, format, or invalid track ID"
            );
            invalid.push(bad);
        }
    }

    (filter, invalid)
}

/// Parse a selection expression. Any integer is accepted as a track number.
///
/// # Arguments
///
/// * `input` - A comma separated list of language codes, track numbers and formats.
///
/// # Returns
///
/// The filter, and the tokens that could not be recognised.
pub fn parse_selection(input: &str) -> (TrackFilter, Vec<String>) {
    parse(input, None, "selection")
}

/// Parse an exclusion expression. Any integer is accepted as a track number.
pub fn parse_exclusion(input: &str) -> (TrackFilter, Vec<String>) {
    parse(input, None, "exclusion")
}

/// Parse a selection expression, rejecting track numbers that are not available.
///
/// # Arguments
///
/// * `input` - A comma separated list of language codes, track numbers and formats.
/// * `available` - The track numbers that may be selected.
pub fn parse_selection_validated(input: &str, available: &[u32]) -> (TrackFilter, Vec<String>) {
    parse(input, Some(available), "selection")
}

/// Parse an exclusion expression, rejecting track numbers that are not available.
pub fn parse_exclusion_validated(input: &str, available: &[u32]) -> (TrackFilter, Vec<String>) {
    parse(input, Some(available), "exclusion")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_always_win() {
        for item in ["15", "007", "123", "-3", "+4"] {
            assert!(matches!(Token::classify(item, None), Token::Number(_)), "{item}");
        }

        let (filter, invalid) = parse_selection("15,007,123");
        assert_eq!(filter.track_numbers, vec![15, 7, 123]);
        assert!(filter.language_codes.is_empty());
        assert!(filter.format_filters.is_empty());
        assert!(invalid.is_empty());
    }

    #[test]
    fn mixed_expression() {
        let (filter, invalid) = parse_selection(" eng , 14,SRT,, fr ");
        assert_eq!(filter.language_codes, vec!["eng", "fr"]);
        assert_eq!(filter.track_numbers, vec![14]);
        assert_eq!(filter.format_filters, vec!["srt"]);
        assert!(invalid.is_empty());
    }

    #[test]
    fn invalid_tokens_do_not_stop_parsing() {
        let (filter, invalid) = parse_selection("xyz123abc,eng,english,sup");
        assert_eq!(invalid, vec!["xyz123abc", "english"]);
        assert_eq!(filter.language_codes, vec!["eng"]);
        assert_eq!(filter.format_filters, vec!["sup"]);
        assert!(filter.track_numbers.is_empty());
    }

    #[test]
    fn empty_input_is_empty_filter() {
        for input in ["", " ", ",,", " , "] {
            let (filter, invalid) = parse_selection(input);
            assert!(filter.is_empty());
            assert!(invalid.is_empty());

            let (filter, _) = parse_exclusion(input);
            assert!(filter.is_empty());
        }
    }

    #[test]
    fn validated_numbers_must_be_available() {
        let (filter, invalid) = parse_selection_validated("3,4,99,eng", &[3, 4, 5]);
        assert_eq!(filter.track_numbers, vec![3, 4]);
        assert_eq!(filter.language_codes, vec!["eng"]);
        assert_eq!(invalid, vec!["99"]);

        // The validating variant never reinterprets a number as something else.
        let (filter, invalid) = parse_exclusion_validated("12", &[]);
        assert!(filter.is_empty());
        assert_eq!(invalid, vec!["12"]);
    }

    #[test]
    fn duplicates_are_dropped() {
        let (filter, _) = parse_selection("eng,ENG,3,3,srt,SRT");
        assert_eq!(filter.language_codes, vec!["eng"]);
        assert_eq!(filter.track_numbers, vec![3]);
        assert_eq!(filter.format_filters, vec!["srt"]);
    }

    #[test]
    fn expression_round_trip() {
        let (filter, _) = parse_selection("spa,eng,14,16,ass");
        assert_eq!(filter.to_expression(), "spa,eng,14,16,ass");
        assert_eq!(parse_selection(&filter.to_expression()).0, filter);
    }

    #[test]
    fn messages() {
        let (include, _) = parse_selection("eng,14");
        let (exclude, _) = parse_exclusion("sup");

        assert_eq!(
            Selection::default().message(),
            "Extracting all subtitle tracks..."
        );
        assert_eq!(
            Selection::new(TrackFilter::default(), exclude.clone()).message(),
            "Extracting all tracks except formats: sup"
        );
        assert_eq!(
            Selection::new(include, exclude).message(),
            "Extracting tracks for languages: eng, track IDs: [14], excluding formats: sup"
        );

        let (numbers, _) = parse_selection("14,16");
        assert_eq!(numbers.describe(), "track IDs: [14 16]");
    }
}
