//! Minigame catalog, round ordering, and starting-round resolution.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundId {
    TapWhenWhite,
    FollowTheFade,
    FocusExercise,
}

/// Order used when no starting round is requested, and the order the
/// relaxation round funnels back into.
pub const CANONICAL_ORDER: [RoundId; 3] = [
    RoundId::TapWhenWhite,
    RoundId::FollowTheFade,
    RoundId::FocusExercise,
];

pub const DEFAULT_STARTING_ROUND: RoundId = RoundId::TapWhenWhite;

impl RoundId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundId::TapWhenWhite => "tapWhenWhite",
            RoundId::FollowTheFade => "followTheFade",
            RoundId::FocusExercise => "focusExercise",
        }
    }

    /// Accepts canonical ids and loose spellings such as `follow-the-fade`,
    /// `Follow_The_Fade` or `follow the fade`.
    pub fn normalize(raw: &str) -> Option<RoundId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        for id in CANONICAL_ORDER {
            if trimmed == id.as_str() {
                return Some(id);
            }
        }

        let normalized: String = trimmed
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .replace('_', "-");

        match normalized.as_str() {
            "tap-when-white" => Some(RoundId::TapWhenWhite),
            "follow-the-fade" => Some(RoundId::FollowTheFade),
            "focus-exercise" => Some(RoundId::FocusExercise),
            _ => None,
        }
    }

    /// The relaxation-category round: its completion is never final and it
    /// funnels a non-canonical order back to [`CANONICAL_ORDER`].
    pub fn is_relaxation(&self) -> bool {
        matches!(self, RoundId::FocusExercise)
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round order for a requested starting round.
pub fn round_order(start: RoundId) -> Vec<RoundId> {
    match start {
        RoundId::TapWhenWhite => CANONICAL_ORDER.to_vec(),
        RoundId::FollowTheFade => vec![
            RoundId::FollowTheFade,
            RoundId::FocusExercise,
            RoundId::TapWhenWhite,
        ],
        RoundId::FocusExercise => vec![RoundId::FocusExercise],
    }
}

pub fn is_canonical(order: &[RoundId]) -> bool {
    order == CANONICAL_ORDER.as_slice()
}

/// Read the `game` parameter from a deep link.
///
/// Accepts a full URL whose fragment carries a query
/// (`https://host/app#induction-arcade?game=follow-the-fade`), a bare
/// fragment (`#induction-arcade?game=...`) or a bare query (`game=...`).
pub fn starting_round_from_link(link: &str) -> Option<RoundId> {
    let link = link.trim();
    let fragment = match Url::parse(link) {
        Ok(url) => url.fragment().map(str::to_string).or_else(|| url.query().map(str::to_string))?,
        Err(_) => link.trim_start_matches('#').to_string(),
    };
    let query = match fragment.split_once('?') {
        Some((_, q)) => q,
        None => fragment.as_str(),
    };
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "game")
        .and_then(|(_, value)| RoundId::normalize(&value))
}

/// Deep link first, then the configured fallback, then the default.
pub fn resolve_starting_round(deep_link: Option<&str>, configured: Option<&str>) -> RoundId {
    deep_link
        .and_then(starting_round_from_link)
        .or_else(|| configured.and_then(RoundId::normalize))
        .unwrap_or(DEFAULT_STARTING_ROUND)
}
