use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::models::location::is_zero;
use crate::services::geocode::{GeocodeError, GeocodeResponse, Geocoder};

/// German umlauts and sharp s with their two-letter transliterations.
/// No source glyph appears in any replacement, so the order does not matter.
const UMLAUTS: [(char, &str); 7] = [
    ('Ä', "Ae"),
    ('Ü', "Ue"),
    ('Ö', "Oe"),
    ('ä', "ae"),
    ('ü', "ue"),
    ('ö', "oe"),
    ('ß', "ss"),
];

fn non_letters() -> &'static Regex {
    static NON_LETTERS: OnceLock<Regex> = OnceLock::new();
    NON_LETTERS.get_or_init(|| Regex::new(r"\P{L}+").expect("static pattern is valid"))
}

/// Outcome of deriving place info for a coordinate pair
#[derive(Debug)]
pub enum Enrichment {
    /// The coordinate was the zero sentinel; nothing was looked up
    Unset,
    Resolved(String),
    Unavailable(Unavailable),
}

/// Why no place info could be derived
#[derive(Debug, thiserror::Error)]
pub enum Unavailable {
    #[error(transparent)]
    Transport(#[from] GeocodeError),

    #[error("geocode status {0:?}")]
    Status(String),

    #[error("geocode returned no results")]
    NoResults,

    #[error("formatted address has only {0} part(s)")]
    ShortAddress(usize),
}

impl Enrichment {
    /// The `info` string stored on the location; empty unless resolved
    pub fn into_info(self) -> String {
        match self {
            Self::Resolved(info) => info,
            Self::Unset | Self::Unavailable(_) => String::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Replace umlauts and ß by their ASCII transliterations
pub fn replace_umlauts(word: &str) -> String {
    let mut replaced = String::with_capacity(word.len());
    for c in word.chars() {
        match UMLAUTS.iter().find(|(umlaut, _)| *umlaut == c) {
            Some((_, replacement)) => replaced.push_str(replacement),
            None => replaced.push(c),
        }
    }
    replaced
}

/// Trim, drop everything that is not a letter, then transliterate umlauts
pub fn normalize_city(token: &str) -> String {
    replace_umlauts(&non_letters().replace_all(token.trim(), ""))
}

/// Build "<city>, <country>" from the last two parts of a formatted address.
pub fn info_from_address(formatted_address: &str) -> Result<String, Unavailable> {
    let mut parts: Vec<&str> = formatted_address.split(',').collect();
    // trailing separators do not count as parts
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }

    let count = parts.len();
    if count < 3 {
        return Err(Unavailable::ShortAddress(count));
    }

    let city = normalize_city(parts[count - 2]);
    let country = parts[count - 1].trim();

    Ok(format!("{}, {}", city, country))
}

pub fn info_from_response(response: &GeocodeResponse) -> Result<String, Unavailable> {
    if !response.is_ok() {
        return Err(Unavailable::Status(response.status.clone()));
    }

    let first = response.results.first().ok_or(Unavailable::NoResults)?;
    info_from_address(&first.formatted_address)
}

/// Derives the `info` text of a location from reverse geocoding
#[derive(Clone)]
pub struct EnrichmentPolicy {
    geocoder: Arc<dyn Geocoder>,
}

impl EnrichmentPolicy {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Look up place info for a coordinate pair. Never fails: a geocoder
    /// error or an unusable answer comes back as `Enrichment::Unavailable`.
    pub async fn enrich(&self, latitude: f64, longitude: f64) -> Enrichment {
        if is_zero(latitude, longitude) {
            return Enrichment::Unset;
        }

        let outcome = match self.geocoder.reverse_geocode(latitude, longitude).await {
            Ok(response) => info_from_response(&response),
            Err(e) => Err(Unavailable::from(e)),
        };

        match outcome {
            Ok(info) => {
                debug!("Resolved ({}, {}) to {}", latitude, longitude, info);
                Enrichment::Resolved(info)
            }
            Err(Unavailable::Transport(e)) => {
                warn!("Geocoding ({}, {}) failed: {}", latitude, longitude, e);
                Enrichment::Unavailable(Unavailable::Transport(e))
            }
            Err(reason) => {
                debug!("No place info for ({}, {}): {}", latitude, longitude, reason);
                Enrichment::Unavailable(reason)
            }
        }
    }

    pub async fn info_for(&self, latitude: f64, longitude: f64) -> String {
        self.enrich(latitude, longitude).await.into_info()
    }
}
