//! Depth-bucketed content pools and randomised selection.
//!
//! Three pools with three different unlock rules:
//! - survey statements accumulate: bucket `n` sees every statement tagged `<= n`
//! - affirmations are exact per bucket, falling back to bucket 0
//! - interjection scripts are replaced per bucket: the greatest defined bucket
//!   `<= n` wins, else the smallest defined bucket

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::logging::{log, obj, Domain, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeCategory {
    Success,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterjectionKind {
    Focus,
    Relaxation,
}

impl InterjectionKind {
    pub fn flip(self) -> Self {
        match self {
            InterjectionKind::Focus => InterjectionKind::Relaxation,
            InterjectionKind::Relaxation => InterjectionKind::Focus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterjectionKind::Focus => "focus",
            InterjectionKind::Relaxation => "relaxation",
        }
    }
}

/// One sampled survey statement, with an id for UI binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyItem {
    pub id: String,
    pub text: String,
}

/// Raw content tables keyed by depth bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentLibrary {
    #[serde(default)]
    pub survey: BTreeMap<u32, Vec<String>>,
    #[serde(default)]
    pub affirmations: BTreeMap<OutcomeCategory, BTreeMap<u32, Vec<String>>>,
    #[serde(default)]
    pub interjections: BTreeMap<InterjectionKind, BTreeMap<u32, Vec<String>>>,
}

fn bank(rows: &[(u32, &[&str])]) -> BTreeMap<u32, Vec<String>> {
    rows.iter()
        .map(|(bucket, lines)| (*bucket, lines.iter().map(|s| s.to_string()).collect()))
        .collect()
}

impl ContentLibrary {
    pub fn builtin() -> Self {
        let survey = bank(&[
            (0, &[
                "I can follow directions easily.",
                "Staying focused feels good.",
                "I like having a clear task.",
                "I want to do this well.",
                "Doing well matters to me.",
                "I can keep my attention steady.",
            ]),
            (1, &[
                "I settle in when the steps are clear.",
                "I relax when I know what comes next.",
                "I enjoy short, simple prompts.",
                "I notice my breathing slowing down.",
                "I feel comfortable with this pace.",
                "Clear instructions help me focus.",
            ]),
            (2, &[
                "My attention narrows easily now.",
                "Following along feels natural.",
                "The rhythm helps me concentrate.",
                "I feel calm and unhurried.",
                "Distractions fade quickly.",
                "I focus best with a steady beat.",
            ]),
            (3, &[
                "I feel deeply settled.",
                "Each cue lands without effort.",
                "My mind feels quiet and clear.",
                "I could stay in this rhythm for a while.",
                "Focusing feels effortless now.",
                "I am fully absorbed in the task.",
            ]),
        ]);

        let mut affirmations = BTreeMap::new();
        affirmations.insert(
            OutcomeCategory::Success,
            bank(&[
                (0, &["Good work.", "Cleanly done.", "Nice focus.", "That landed well."]),
                (1, &["Very steady.", "Right on time.", "Nice and smooth.", "You are in sync."]),
                (2, &["Right on cue.", "Smooth and easy.", "Keep riding the rhythm.", "Beautifully timed."]),
                (3, &["Effortless.", "Perfectly settled.", "Completely in flow.", "Exactly right."]),
            ]),
        );
        affirmations.insert(
            OutcomeCategory::Neutral,
            bank(&[
                (0, &["Keep going.", "Stay with it.", "Next one coming.", "Hold your focus."]),
                (1, &["Stay easy.", "Follow the prompt.", "Stay receptive.", "Keep following along."]),
                (2, &["Let the rhythm carry you.", "Stay soft and steady.", "Just the next cue.", "Easy does it."]),
                (3, &["Nothing to push.", "Let it be simple.", "Stay in the quiet.", "Just breathe and continue."]),
            ]),
        );

        let mut interjections = BTreeMap::new();
        interjections.insert(
            InterjectionKind::Focus,
            bank(&[
                (0, &["Take a slow breath.", "Notice the center of the screen.", "Let curiosity hold your gaze."]),
                (1, &["Breathe in and let the last round settle.", "Feel your attention narrow.", "Get ready for the next cue."]),
                (2, &["Exhale and let stray thoughts pass.", "Rest your eyes on a single point.", "Let focus feel automatic."]),
                (3, &["Release every stray thought.", "Hold one point in view.", "Notice how still your attention is."]),
            ]),
        );
        interjections.insert(
            InterjectionKind::Relaxation,
            bank(&[
                (0, &["Loosen your shoulders.", "Let your breath slow down.", "Stay here and soft."]),
                (1, &["Feel weightless for a moment.", "Let the tones carry you.", "Sink into the calm."]),
                (2, &["Settle a little deeper.", "Let each breath lengthen.", "Rest in the quiet."]),
                (3, &["Drop all remaining tension.", "Float in the stillness.", "Enjoy how calm this feels."]),
            ]),
        );

        Self { survey, affirmations, interjections }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing content library")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading content library {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

/// Samples from a [`ContentLibrary`] with an injectable random source.
pub struct ContentSelector {
    library: ContentLibrary,
    rng: Box<dyn RngCore + Send>,
}

impl ContentSelector {
    pub fn new(library: ContentLibrary) -> Self {
        Self::with_rng(library, Box::new(StdRng::from_entropy()))
    }

    pub fn seeded(library: ContentLibrary, seed: u64) -> Self {
        Self::with_rng(library, Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn with_rng(library: ContentLibrary, rng: Box<dyn RngCore + Send>) -> Self {
        Self { library, rng }
    }

    pub fn library(&self) -> &ContentLibrary {
        &self.library
    }

    /// Every statement unlocked at `bucket`, deduplicated, in bucket order.
    pub fn eligible_survey_pool(&self, bucket: u32) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.library
            .survey
            .range(..=bucket)
            .flat_map(|(_, lines)| lines.iter())
            .map(String::as_str)
            .filter(|line| seen.insert(*line))
            .collect()
    }

    pub fn select_survey_items(&mut self, bucket: u32, count: usize) -> Vec<SurveyItem> {
        let mut pool: Vec<String> = self
            .eligible_survey_pool(bucket)
            .into_iter()
            .map(str::to_string)
            .collect();
        let pool_size = pool.len();
        let take = count.min(pool_size);
        let (picked, _) = pool.partial_shuffle(&mut *self.rng, take);

        let items: Vec<SurveyItem> = picked
            .iter()
            .enumerate()
            .map(|(index, text)| SurveyItem {
                id: format!("survey-{}-{}", index, self.rng.gen_range(0..100_000u32)),
                text: text.clone(),
            })
            .collect();

        log(
            Level::Debug,
            Domain::Content,
            "survey_sampled",
            obj(&[
                ("bucket", json!(bucket)),
                ("pool_size", json!(pool_size)),
                ("count", json!(items.len())),
            ]),
        );
        items
    }

    pub fn select_affirmation(&mut self, bucket: u32, outcome: OutcomeCategory) -> String {
        let Some(banks) = self.library.affirmations.get(&outcome) else {
            return String::new();
        };
        let bank = banks
            .get(&bucket)
            .filter(|lines| !lines.is_empty())
            .or_else(|| banks.get(&0));
        bank.and_then(|lines| lines.choose(&mut *self.rng))
            .cloned()
            .unwrap_or_default()
    }

    pub fn select_interjection_steps(&self, bucket: u32, kind: InterjectionKind) -> Vec<String> {
        let Some(banks) = self.library.interjections.get(&kind) else {
            return Vec::new();
        };
        banks
            .range(..=bucket)
            .next_back()
            .or_else(|| banks.iter().next())
            .map(|(_, steps)| steps.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ContentSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSelector")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}
