use crate::normalize::normalize_record;
use crate::track::{AggregatedTrack, CanonicalTrack, RawTrackRecord};
use std::collections::HashMap;

/// Tracks grouped by canonical key, with counters for what was seen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupResult {
    pub tracks: HashMap<CanonicalTrack, AggregatedTrack>,
    pub records_processed: usize,
    /// Records whose text could only be interpreted best-effort
    pub flagged_for_review: usize,
}

#[derive(Debug)]
struct DisplayVote {
    artist: String,
    title: String,
    count: usize,
}

#[derive(Debug, Default)]
struct Group {
    /// In first-seen order, so ties resolve to the earliest spelling
    votes: Vec<DisplayVote>,
    plays: Vec<(String, u64)>,
}

impl Group {
    fn vote(&mut self, artist: &str, title: &str) {
        match self
            .votes
            .iter_mut()
            .find(|vote| vote.artist == artist && vote.title == title)
        {
            Some(vote) => vote.count += 1,
            None => self.votes.push(DisplayVote {
                artist: artist.to_string(),
                title: title.to_string(),
                count: 1,
            }),
        }
    }

    fn winning_display(&self) -> Option<&DisplayVote> {
        // max_by_key keeps the last maximum, so walk the votes by hand to keep the first
        let mut best: Option<&DisplayVote> = None;
        for vote in &self.votes {
            if best.map_or(true, |current| vote.count > current.count) {
                best = Some(vote);
            }
        }
        best
    }
}

/// Collapse records that normalize to the same canonical track.
///
/// Play counts are summed, distinct stations collected, and the display form
/// is the spelling seen on the most records (first seen wins a tie).
/// Malformed text is normalized best-effort and counted in
/// `flagged_for_review`; no record is dropped.
pub fn deduplicate<'a, I>(records: I) -> DedupResult
where
    I: IntoIterator<Item = &'a RawTrackRecord>,
{
    let mut groups: HashMap<CanonicalTrack, Group> = HashMap::new();
    let mut records_processed = 0;
    let mut flagged_for_review = 0;

    for record in records {
        records_processed += 1;
        let normalized = normalize_record(record);
        if normalized.needs_review() {
            flagged_for_review += 1;
            log::warn!(
                "Flagged '{}' from {} for review ({:?})",
                record.raw_text,
                record.station,
                normalized.outcome
            );
        }

        let group = groups.entry(normalized.canonical).or_default();
        group.vote(&normalized.artist, &normalized.title);
        group
            .plays
            .push((record.station.clone(), record.effective_plays()));
    }

    let tracks = groups
        .into_iter()
        .filter_map(|(canonical, group)| {
            let display = group.winning_display()?;
            let mut track = AggregatedTrack::new(
                canonical.clone(),
                display.artist.clone(),
                display.title.clone(),
            );
            for (station, plays) in &group.plays {
                track.add_plays(station, *plays);
            }
            Some((canonical, track))
        })
        .collect::<HashMap<_, _>>();

    log::debug!(
        "Deduplicated {records_processed} records into {} tracks ({flagged_for_review} flagged)",
        tracks.len()
    );

    DedupResult {
        tracks,
        records_processed,
        flagged_for_review,
    }
}
