//! Turning loosely formatted "Artist - Title" strings into canonical keys.
//!
//! Station playlists spell the same song in many ways: `Artist - Title`,
//! `artist,Title`, en-dash separators, stray whitespace, and featuring or
//! remix annotations appended to the title. [`normalize`] folds those into a
//! [`CanonicalTrack`] comparison key while keeping the original casing for
//! display, and reports how confident the split was through [`ParseOutcome`].
//!
//! Danish letters (æ, ø, å) are kept as they are; case folding uses Unicode
//! lower-casing so `Æ` and `æ` compare equal.

use crate::track::{CanonicalTrack, RawTrackRecord, UNKNOWN};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Separators tried in priority order. Dashes win over the comma so that
/// comma-joined artist lists ("A, B - Title") stay on the artist side.
pub const SEPARATORS: [&str; 3] = [" - ", " \u{2013} ", ","];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Annotations removed from titles: featuring credits and edit/version tags,
/// in round or square brackets, matched case-insensitively.
static TITLE_ANNOTATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\s*[\(\[]\s*(?:feat\.?|ft\.?|featuring|with|prod\.?)\s[^\)\]]*[\)\]]")
            .expect("valid regex"),
        Regex::new(
            r"(?i)\s*[\(\[][^\)\]]*\b(?:remix|edit|version|mix|remaster(?:ed)?|live|acoustic|extended|instrumental|original)\b[^\)\]]*[\)\]]",
        )
        .expect("valid regex"),
    ]
});

/// How much of the input could be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOutcome {
    /// Separator found, artist and title both present
    Parsed,
    /// Missing separator or one empty side; "Unknown" stands in
    FallbackUsed,
    /// Nothing usable at all; both fields are "Unknown"
    Unparseable,
}

impl ParseOutcome {
    pub fn needs_review(self) -> bool {
        !matches!(self, ParseOutcome::Parsed)
    }

    fn combine(self, other: ParseOutcome) -> ParseOutcome {
        match (self, other) {
            (ParseOutcome::Unparseable, _) | (_, ParseOutcome::Unparseable) => {
                ParseOutcome::Unparseable
            }
            (ParseOutcome::FallbackUsed, _) | (_, ParseOutcome::FallbackUsed) => {
                ParseOutcome::FallbackUsed
            }
            _ => ParseOutcome::Parsed,
        }
    }
}

/// Result of normalizing one raw string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTrack {
    pub canonical: CanonicalTrack,
    /// Artist in its original casing
    pub artist: String,
    /// Title in its original casing, annotations removed
    pub title: String,
    pub outcome: ParseOutcome,
}

impl NormalizedTrack {
    pub fn display(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    pub fn needs_review(&self) -> bool {
        self.outcome.needs_review()
    }
}

/// Normalize a raw "Artist - Title" / "Artist,Title" string. Never fails.
pub fn normalize(raw: &str) -> NormalizedTrack {
    let cleaned = collapse_whitespace(raw);

    if !has_content(&cleaned) {
        log::debug!("Unparseable track text '{raw}', using Unknown/Unknown");
        return unknown_track();
    }

    for separator in SEPARATORS {
        if let Some((artist, title)) = cleaned.split_once(separator) {
            return normalize_fields(artist, title);
        }
    }

    log::trace!("No separator in '{cleaned}', treating it as a title");
    let mut track = normalize_fields(UNKNOWN, &cleaned);
    track.outcome = ParseOutcome::FallbackUsed;
    track
}

/// Normalize an artist/title pair that arrived already split
pub fn normalize_fields(artist: &str, title: &str) -> NormalizedTrack {
    let (artist, artist_outcome) = clean_field(artist);
    let (title, title_outcome) = clean_field(title);

    if artist_outcome == ParseOutcome::FallbackUsed && title_outcome == ParseOutcome::FallbackUsed
    {
        return unknown_track();
    }

    let title = if title_outcome == ParseOutcome::Parsed {
        strip_annotations(&title)
    } else {
        title
    };

    NormalizedTrack {
        canonical: CanonicalTrack::new(artist.to_lowercase(), title.to_lowercase()),
        artist,
        title,
        outcome: artist_outcome.combine(title_outcome),
    }
}

/// Normalize a playlist record, using its split columns when it has them
pub fn normalize_record(record: &RawTrackRecord) -> NormalizedTrack {
    match &record.fields {
        Some(fields) => normalize_fields(&fields.artist, &fields.title),
        None => normalize(&record.raw_text),
    }
}

/// Display form ("Artist - Title") of a raw string
pub fn normalize_display(raw: &str) -> String {
    normalize(raw).display()
}

/// Remove featuring and edit annotations from a title. Repeats until nothing
/// else matches; returns the original if stripping would leave it empty.
pub fn strip_annotations(title: &str) -> String {
    let mut current = title.to_string();
    loop {
        let mut next = current.clone();
        for pattern in TITLE_ANNOTATIONS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        let next = collapse_whitespace(&next);
        if next == current {
            break;
        }
        current = next;
    }

    if has_content(&current) {
        current
    } else {
        collapse_whitespace(title)
    }
}

pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

fn clean_field(field: &str) -> (String, ParseOutcome) {
    let cleaned = collapse_whitespace(field);
    if has_content(&cleaned) {
        (cleaned, ParseOutcome::Parsed)
    } else {
        (UNKNOWN.to_string(), ParseOutcome::FallbackUsed)
    }
}

fn has_content(input: &str) -> bool {
    input.chars().any(char::is_alphanumeric)
}

fn unknown_track() -> NormalizedTrack {
    NormalizedTrack {
        canonical: CanonicalTrack::new(UNKNOWN.to_lowercase(), UNKNOWN.to_lowercase()),
        artist: UNKNOWN.to_string(),
        title: UNKNOWN.to_string(),
        outcome: ParseOutcome::Unparseable,
    }
}
