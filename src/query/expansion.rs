//! Query expansion: prompt templates, synonyms and use-case mappings.
//!
//! Short free-text queries embed poorly on their own. Expansion enriches
//! them three ways before embedding:
//!
//! - whole-word synonym additions ("storm" also brings "thunder"),
//! - use-case to music-style mapping for song queries ("wedding" becomes
//!   actual music characteristics),
//! - prompt template variants per content type, whose embeddings are
//!   averaged into one query vector.
//!
//! Templates need a known content type, so they apply only when the
//! caller searches with an explicit type. In auto-detect mode only the
//! synonym-expanded text is embedded, keeping detection and ranking on
//! one shared embedding.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::ContentType;
use crate::vector::normalize_in_place;

/// Prompt templates applied to song queries. The plain query comes first
/// so the average stays anchored on the user's wording.
const SONG_TEMPLATES: [&str; 4] = [
    "{query}",
    "music: {query}",
    "background music for {query}",
    "instrumental music {query}",
];

/// Prompt templates applied to sound-effect queries.
const SFX_TEMPLATES: [&str; 4] = [
    "sound of {query}",
    "sound effect: {query}",
    "{query} audio",
    "{query} sound",
];

/// Maps contextual song queries to concrete music characteristics.
/// Longer phrases are tried first so "award ceremony" wins over "award".
const USE_CASE_MAPPINGS: [(&str, &str); 16] = [
    (
        "award ceremony",
        "triumphant orchestral fanfare victory celebration music",
    ),
    ("award", "triumphant orchestral fanfare celebration music"),
    ("victory", "triumphant epic orchestral celebration fanfare"),
    ("celebration", "upbeat celebratory happy joyful festive music"),
    (
        "car advertisement",
        "energetic modern driving electronic powerful beat music",
    ),
    ("advertisement", "catchy upbeat modern energetic commercial music"),
    (
        "new year",
        "festive celebratory happy traditional joyful holiday music",
    ),
    ("christmas", "festive warm holiday traditional christmas joyful music"),
    ("corporate", "professional inspiring motivational confident business music"),
    ("wedding", "romantic elegant beautiful emotional tender love music"),
    ("funeral", "sad somber emotional melancholic peaceful gentle music"),
    ("workout", "energetic high tempo powerful motivational beat music"),
    ("trailer", "epic cinematic dramatic intense powerful orchestral music"),
    ("horror", "dark tense eerie suspenseful creepy scary atmospheric music"),
    ("meditation", "calm peaceful ambient meditative spiritual gentle music"),
    ("gaming", "energetic electronic intense dynamic exciting game music"),
];

/// Synonym additions keyed by whole-word query terms. One synonym is
/// appended per matched term.
const SYNONYMS: [(&str, &str); 14] = [
    ("rap", "hip hop"),
    ("hip hop", "rap"),
    ("edm", "electronic dance music"),
    ("lofi", "lo-fi chillhop relaxing"),
    ("storm", "thunderstorm heavy rain wind"),
    ("thunder", "thunderstorm lightning"),
    ("rain", "rainfall rainy weather"),
    ("scary", "creepy eerie horror"),
    ("happy", "joyful cheerful upbeat"),
    ("sad", "melancholic sorrowful emotional"),
    ("epic", "cinematic grand orchestral"),
    ("chill", "relaxing mellow laid-back"),
    ("guitar", "acoustic guitar melody"),
    ("fast", "upbeat high tempo energetic"),
];

/// Result of expanding one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    /// Query text after use-case mapping and synonym additions.
    pub expanded: String,
    /// Prompt variants to embed. Always contains at least `expanded`.
    pub variants: Vec<String>,
    /// Human-readable record of what was applied, for logging.
    pub applied: Vec<String>,
}

fn word_pattern(term: &str) -> Regex {
    // Escaped static terms always compile.
    Regex::new(&format!(r"\b{}\b", regex::escape(term))).expect("static word pattern")
}

fn synonym_patterns() -> &'static Vec<(Regex, &'static str, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SYNONYMS
            .iter()
            .map(|(term, additions)| (word_pattern(term), *term, *additions))
            .collect()
    })
}

/// Expands a (already translated) query for embedding.
#[derive(Debug)]
pub struct QueryExpander {
    /// Disables template variants; synonym expansion still applies.
    pub templates_enabled: bool,
    /// Disables synonym additions.
    pub synonyms_enabled: bool,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryExpander {
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates_enabled: true,
            synonyms_enabled: true,
        }
    }

    /// Expands `query`. `content_type` is `Some` only when the caller
    /// searches one explicit index; template variants require it.
    #[must_use]
    pub fn expand(&self, query: &str, content_type: Option<ContentType>) -> ExpandedQuery {
        let original = query.trim();
        let mut expanded = original.to_string();
        let mut applied = Vec::new();

        if content_type == Some(ContentType::Song) {
            if let Some((mapped, use_case)) = apply_use_case_mapping(&expanded) {
                applied.push(format!("use-case:{use_case}"));
                expanded = mapped;
            }
        }

        if self.synonyms_enabled {
            let (with_synonyms, synonyms_applied) = expand_synonyms(&expanded);
            expanded = with_synonyms;
            applied.extend(synonyms_applied);
        }

        let mut variants = Vec::new();
        if self.templates_enabled {
            if let Some(ct) = content_type {
                let templates: &[&str] = match ct {
                    ContentType::Song => &SONG_TEMPLATES,
                    ContentType::Sfx => &SFX_TEMPLATES,
                };
                for template in templates {
                    variants.push(template.replace("{query}", &expanded));
                }
            }
        }
        if !variants.contains(&expanded) {
            variants.insert(0, expanded.clone());
        }

        ExpandedQuery {
            expanded,
            variants,
            applied,
        }
    }
}

fn apply_use_case_mapping(query: &str) -> Option<(String, &'static str)> {
    let lower = query.to_lowercase();

    let mut sorted: Vec<&(&str, &str)> = USE_CASE_MAPPINGS.iter().collect();
    sorted.sort_by_key(|(use_case, _)| std::cmp::Reverse(use_case.len()));

    for &(use_case, style) in sorted {
        if lower.contains(use_case) {
            // Keep descriptors from the original query, minus fillers.
            let mut remaining = lower.replace(use_case, " ");
            for filler in ["music for", "song for", "music", "song", "for", "the", "a", "an"] {
                remaining = word_pattern(filler).replace_all(&remaining, " ").to_string();
            }
            let remaining = remaining.split_whitespace().collect::<Vec<_>>().join(" ");

            let expanded = if remaining.is_empty() {
                style.to_string()
            } else {
                format!("{style} {remaining}")
            };
            return Some((expanded, use_case));
        }
    }
    None
}

fn expand_synonyms(query: &str) -> (String, Vec<String>) {
    let lower = query.to_lowercase();
    let mut additions = Vec::new();
    let mut applied = Vec::new();

    for (pattern, term, synonym) in synonym_patterns() {
        if pattern.is_match(&lower) && !lower.contains(&synonym.to_lowercase()) {
            additions.push(*synonym);
            applied.push(format!("{term} -> {synonym}"));
        }
    }

    if additions.is_empty() {
        (query.to_string(), applied)
    } else {
        (format!("{query} {}", additions.join(" ")), applied)
    }
}

/// Averages multiple prompt-variant embeddings into one unit vector.
///
/// Returns `None` for an empty input. A single embedding is passed
/// through unchanged.
#[must_use]
pub fn average_embeddings(embeddings: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = embeddings.first()?;
    if embeddings.len() == 1 {
        return Some(first.clone());
    }

    let dim = first.len();
    let mut averaged = vec![0.0f32; dim];
    for embedding in embeddings {
        for (acc, value) in averaged.iter_mut().zip(embedding.iter()) {
            *acc += value;
        }
    }
    let n = embeddings.len() as f32;
    for value in &mut averaged {
        *value /= n;
    }
    normalize_in_place(&mut averaged);
    Some(averaged)
}
