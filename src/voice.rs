//! Spoken input normalisation
//!
//! Recognition happens elsewhere; this module only turns a transcript into
//! either a selection among the options on screen or cleaned-up ingredient
//! text. Both end up as ordinary field completions.

use crate::state_machine::{FieldName, Offer};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::LazyLock;

static COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(select|choose|add|pick)\b").expect("valid command pattern"));

static SPOKEN_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(comma|and)\b").expect("valid delimiter pattern"));

/// What a transcript amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceResolution {
    /// Offered option labels the speaker named, in the order spoken
    Selected { field: FieldName, labels: Vec<String> },
    /// Comma-delimited ingredient text
    FreeText(String),
    NotUnderstood,
}

#[derive(Debug, Clone)]
pub struct VoiceInputBridge {
    aliases: HashMap<String, String>,
}

impl Default for VoiceInputBridge {
    fn default() -> Self {
        let aliases = [
            ("tomatoes", "tomato"),
            ("potatoes", "potato"),
            ("onions", "onion"),
            ("peppers", "pepper"),
            ("carrots", "carrot"),
            ("mushrooms", "mushroom"),
            ("chickens", "chicken"),
            ("eggs", "egg"),
            ("noodles", "pasta"),
            ("tommato", "tomato"),
            ("tomatoe", "tomato"),
            ("potatoe", "potato"),
            ("onoin", "onion"),
        ]
        .into_iter()
        .map(|(heard, meant)| (heard.to_string(), meant.to_string()))
        .collect();
        Self { aliases }
    }
}

impl VoiceInputBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Teach the bridge that `heard` should be read as `meant`
    #[must_use]
    pub fn with_alias(mut self, heard: &str, meant: &str) -> Self {
        self.aliases
            .insert(heard.to_lowercase(), meant.to_lowercase());
        self
    }

    /// Interpret a transcript against the options currently on screen.
    ///
    /// `accepts_ingredients` says whether free ingredient text is a valid
    /// answer right now.
    pub fn resolve(
        &self,
        transcript: &str,
        offer: Option<&Offer>,
        accepts_ingredients: bool,
    ) -> VoiceResolution {
        let text = transcript.trim().to_lowercase();
        if text.is_empty() {
            return VoiceResolution::NotUnderstood;
        }

        // "please add chicken and rice" only looks at what follows the command
        let command_end = COMMAND.find_iter(&text).last().map(|m| m.end());
        let scoped = match command_end {
            Some(end) => text.get(end..).unwrap_or_default().trim(),
            None => text.as_str(),
        };

        if let Some(offer) = offer {
            let labels = self.match_labels(scoped, &offer.options);
            if !labels.is_empty() {
                return VoiceResolution::Selected {
                    field: offer.field,
                    labels,
                };
            }
            if command_end.is_some() {
                return VoiceResolution::NotUnderstood;
            }
        }

        if accepts_ingredients {
            let cleaned = self.clean_ingredients(scoped);
            if !cleaned.is_empty() {
                return VoiceResolution::FreeText(cleaned);
            }
        }
        VoiceResolution::NotUnderstood
    }

    /// Turn spoken delimiters into commas and normalise each ingredient
    pub fn clean_ingredients(&self, spoken: &str) -> String {
        let lowered = spoken.to_lowercase();
        let delimited = SPOKEN_DELIMITER.replace_all(&lowered, ",");
        delimited
            .split(',')
            .map(|segment| {
                segment
                    .split_whitespace()
                    .map(|word| self.normalise(word))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn normalise<'a>(&'a self, word: &'a str) -> &'a str {
        self.aliases.get(word).map_or(word, String::as_str)
    }

    /// Spellings of one label word a speaker might use: itself plus naive
    /// singular/plural forms
    fn word_forms(word: &str) -> Vec<String> {
        let mut forms = vec![word.to_string(), format!("{word}s"), format!("{word}es")];
        for suffix in ["es", "s"] {
            if let Some(stem) = word.strip_suffix(suffix).filter(|stem| !stem.is_empty()) {
                forms.push(stem.to_string());
            }
        }
        forms
    }

    /// Labels named in `scoped`, in the order they were spoken. Longer
    /// labels win where they overlap, so "sweet potato" is not also "potato".
    fn match_labels(&self, scoped: &str, options: &[String]) -> Vec<String> {
        let words: Vec<&str> = scoped
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .collect();
        let mut labels: Vec<(&String, Vec<Vec<String>>)> = options
            .iter()
            .map(|label| {
                let forms: Vec<Vec<String>> = label
                    .to_lowercase()
                    .split_whitespace()
                    .map(Self::word_forms)
                    .collect();
                (label, forms)
            })
            .filter(|(_, forms)| !forms.is_empty())
            .collect();
        labels.sort_by_key(|(_, forms)| Reverse(forms.len()));

        let heard = |spoken: &str, forms: &[String]| {
            let normalised = self.normalise(spoken);
            forms.iter().any(|f| f == spoken || f == normalised)
        };

        let mut matched: Vec<String> = Vec::new();
        let mut i = 0;
        while i < words.len() {
            let hit = labels.iter().find(|(_, forms)| {
                words.get(i..i + forms.len()).is_some_and(|spoken| {
                    spoken
                        .iter()
                        .zip(forms)
                        .all(|(&word, forms)| heard(word, forms))
                })
            });
            match hit {
                Some((label, forms)) => {
                    if !matched.contains(label) {
                        matched.push((*label).clone());
                    }
                    i += forms.len();
                }
                None => i += 1,
            }
        }
        matched
    }
}
