//! Example prompts and search tips surfaced to the UI.
//!
//! Prompts can be overridden by a JSON file; the built-in set is the
//! fallback. Translation into a requested language is best effort: any
//! provider failure keeps the English text.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::query::TranslationProvider;
use crate::types::ContentType;

const BUILTIN_PROMPTS: [(ContentType, &str); 8] = [
    (ContentType::Song, "upbeat music for a celebration"),
    (ContentType::Song, "calm piano for studying"),
    (ContentType::Song, "epic orchestral trailer music"),
    (ContentType::Song, "romantic acoustic guitar"),
    (ContentType::Sfx, "gentle rain on a window"),
    (ContentType::Sfx, "crowd cheering in a stadium"),
    (ContentType::Sfx, "footsteps on gravel"),
    (ContentType::Sfx, "thunder rolling in the distance"),
];

const BUILTIN_TIPS: [(&str, &str); 3] = [
    (
        "Describe the scene",
        "Say what is happening, not just a genre: 'rain on a tin roof' beats 'rain'.",
    ),
    (
        "Name the mood",
        "Words like calm, tense or joyful steer the ranking toward the right clips.",
    ),
    (
        "Any language works",
        "Queries are translated to English automatically before searching.",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub category: ContentType,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTip {
    pub title: String,
    pub text: String,
}

/// Starter prompts plus usage tips, served by `/api/example-prompts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamplePrompts {
    pub prompts: Vec<Prompt>,
    pub search_tips: Vec<SearchTip>,
}

impl ExamplePrompts {
    /// The built-in English set.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            prompts: BUILTIN_PROMPTS
                .iter()
                .map(|&(category, text)| Prompt {
                    category,
                    text: text.to_string(),
                })
                .collect(),
            search_tips: BUILTIN_TIPS
                .iter()
                .map(|&(title, text)| SearchTip {
                    title: title.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    /// Loads prompts from a JSON file, falling back to the built-in set
    /// when the file is absent or malformed.
    #[must_use]
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(prompts) => prompts,
                Err(e) => {
                    warn!(path = %path.display(), "malformed prompts file, using built-ins: {e}");
                    Self::builtin()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), "prompts file unreadable, using built-ins: {e}");
                Self::builtin()
            }
        }
    }

    /// Returns this set translated into `lang`, keeping any text whose
    /// translation fails in English.
    pub async fn translated(&self, provider: &dyn TranslationProvider, lang: &str) -> Self {
        let mut prompts = Vec::with_capacity(self.prompts.len());
        for prompt in &self.prompts {
            prompts.push(Prompt {
                category: prompt.category,
                text: translate_or_keep(provider, &prompt.text, lang).await,
            });
        }

        let mut search_tips = Vec::with_capacity(self.search_tips.len());
        for tip in &self.search_tips {
            search_tips.push(SearchTip {
                title: translate_or_keep(provider, &tip.title, lang).await,
                text: translate_or_keep(provider, &tip.text, lang).await,
            });
        }

        Self {
            prompts,
            search_tips,
        }
    }
}

async fn translate_or_keep(provider: &dyn TranslationProvider, text: &str, lang: &str) -> String {
    match provider.translate(text, "en", lang).await {
        Ok(translated) => translated,
        Err(e) => {
            warn!(lang, "prompt translation failed, keeping English: {e}");
            text.to_string()
        }
    }
}
