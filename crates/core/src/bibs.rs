//! Bib-number candidate filtering.
//!
//! OCR engines return raw text lines with confidences; this module turns
//! them into the clean set of bib numbers recorded against a photo. Digit
//! runs are extracted, implausible lengths dropped, candidates restricted
//! to the event's start list when one exists, and duplicates collapsed
//! keeping the best confidence.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bib numbers shorter or longer than this are treated as OCR noise
/// (timestamps, sponsor phone numbers, distance markers).
pub const MIN_BIB_LEN: usize = 1;
pub const MAX_BIB_LEN: usize = 6;

const DIGIT_RUN_PATTERN: &str = r"\d+";

static DIGIT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DIGIT_RUN_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A bib number accepted for a photo, with the engine's confidence for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BibCandidate {
    pub number: String,
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Whether a digit string is a plausible bib number.
pub fn is_plausible_bib(s: &str) -> bool {
    (MIN_BIB_LEN..=MAX_BIB_LEN).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}

/// Normalise an event's start list into the OCR hint set: digit runs
/// extracted from each entry, deduped, sorted. An empty result means the
/// event gives the OCR stage no restriction.
pub fn hint_set(start_numbers: &[String]) -> Vec<String> {
    let mut hints: Vec<String> = start_numbers
        .iter()
        .flat_map(|entry| DIGIT_RUN_RE.find_iter(entry))
        .map(|m| m.as_str().to_string())
        .filter(|run| is_plausible_bib(run))
        .collect();
    hints.sort_by(compare_numbers);
    hints.dedup();
    hints
}

/// Reduce raw OCR lines to the accepted bib candidates for one photo.
///
/// `hints` restricts candidates to the start list when non-empty. Each
/// number is kept once with the highest confidence seen for it; the result
/// is sorted in numeric order so repeated runs insert rows identically.
pub fn filter_candidates(
    raw: impl IntoIterator<Item = (String, f32)>,
    hints: &[String],
) -> Vec<BibCandidate> {
    let mut best: HashMap<String, f32> = HashMap::new();

    for (text, confidence) in raw {
        for run in DIGIT_RUN_RE.find_iter(&text) {
            let number = run.as_str();
            if !is_plausible_bib(number) {
                continue;
            }
            if !hints.is_empty() && !hints.iter().any(|h| h == number) {
                continue;
            }
            let entry = best.entry(number.to_string()).or_insert(confidence);
            if confidence > *entry {
                *entry = confidence;
            }
        }
    }

    let mut candidates: Vec<BibCandidate> = best
        .into_iter()
        .map(|(number, confidence)| BibCandidate { number, confidence })
        .collect();
    candidates.sort_by(|a, b| compare_numbers(&a.number, &b.number));
    candidates
}

/// Highest per-candidate confidence, or 0.0 when nothing was accepted.
pub fn aggregate_confidence(candidates: &[BibCandidate]) -> f32 {
    candidates
        .iter()
        .map(|c| c.confidence)
        .fold(0.0f32, f32::max)
}

/// Numeric-aware ordering for digit strings: shorter first, then
/// lexicographic, which sorts "9" before "10" and keeps leading-zero
/// variants stable.
fn compare_numbers(a: &String, b: &String) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
