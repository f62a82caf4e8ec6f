use once_cell::sync::Lazy;
use regex::Regex;

// Leading 7-digit postal token plus the whitespace that follows it. An
// eighth digit means the run is something else, checked in `strip_postal`.
static LEADING_POSTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{7}\s*").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Longest prefix ending in a 2-5 segment numeric hyphen chain (block-lot-unit
// style numbering). Greedy `.*` keeps the rightmost such chain.
static NUMERIC_CHAIN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*\d+(?:-\d+){1,4})").unwrap());

// Fallback: prefix ending in a <number>番<number>号 block/house number.
static BAN_GO_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?\d+番\d+号)").unwrap());

const HYPHEN_VARIANTS: &[char] = &[
    '\u{2010}', // hyphen
    '\u{2011}', // non-breaking hyphen
    '\u{2012}', // figure dash
    '\u{2013}', // en dash
    '\u{2014}', // em dash
    '\u{2015}', // horizontal bar
    '\u{2212}', // minus sign
    '\u{30FC}', // katakana prolonged sound mark
    '\u{FF0D}', // fullwidth hyphen-minus
    '\u{FF70}', // halfwidth katakana prolonged sound mark
];

/// Canonicalizes a raw postal address into a geocoding query.
///
/// Applied in order: trim, strip a leading 7-digit postal token, unify
/// hyphen-like characters to ASCII `-`, convert full-width spaces, collapse
/// whitespace runs. Total function; empty input stays empty.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_postal = strip_postal(trimmed);
    let unified: String = without_postal
        .chars()
        .map(|c| {
            if HYPHEN_VARIANTS.contains(&c) {
                '-'
            } else if c == '\u{3000}' {
                ' '
            } else {
                c
            }
        })
        .collect();
    WHITESPACE_RUN.replace_all(&unified, " ").into_owned()
}

fn strip_postal(input: &str) -> &str {
    match LEADING_POSTAL.find(input) {
        Some(m) if !input[m.end()..].starts_with(|c: char| c.is_ascii_digit()) => {
            &input[m.end()..]
        }
        _ => input,
    }
}

/// Normalizes, then drops trailing building/room/floor text after the
/// block/house number. Addresses that match neither pattern pass through
/// unchanged, so the result is never longer than `normalize`'s output.
pub fn simplify(raw: &str) -> String {
    let normalized = normalize(raw);
    if let Some(caps) = NUMERIC_CHAIN_PREFIX.captures(&normalized) {
        return caps[1].to_string();
    }
    if let Some(caps) = BAN_GO_PREFIX.captures(&normalized) {
        return caps[1].to_string();
    }
    normalized
}

/// Ordered, deduplicated, non-empty geocoding queries for one full address:
/// the normalized form first, the simplified form as the fallback.
pub fn query_candidates(full_address: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(2);
    for candidate in [normalize(full_address), simplify(full_address)] {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
