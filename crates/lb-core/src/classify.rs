//! Window-title classification.
//!
//! Titles are matched case-insensitively against two keyword lists. Work
//! keywords are checked before distraction keywords, so a title matching both
//! (e.g. "Chrome - YouTube") counts as work.

use serde::{Deserialize, Serialize};

use crate::types::Category;

/// Keyword lists used by [`Classifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Substrings that mark a title as work.
    pub work_keywords: Vec<String>,
    /// Substrings that mark a title as a distraction.
    pub distraction_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let to_vec = |items: &[&str]| items.iter().map(ToString::to_string).collect();
        Self {
            work_keywords: to_vec(&[
                "Chrome",
                "Visual Studio Code",
                "VS Code",
                "Code",
                "Terminal",
                "Word",
                "Excel",
                "PowerPoint",
                "ChatGPT",
                "Jupyter",
                "IntelliJ",
                "PyCharm",
                "Sublime",
                "Notion",
            ]),
            distraction_keywords: to_vec(&[
                "YouTube", "Netflix", "Spotify", "Discord", "Safari", "Photos", "Messages",
                "Reddit", "Twitter",
            ]),
        }
    }
}

/// Maps window titles to a [`Category`].
///
/// Keywords are lower-cased once at construction. Empty keywords are dropped
/// since they would match every title.
#[derive(Debug, Clone)]
pub struct Classifier {
    work: Vec<String>,
    distraction: Vec<String>,
}

impl Classifier {
    /// Builds a classifier from configured keyword lists.
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            work: normalize_keywords(&config.work_keywords),
            distraction: normalize_keywords(&config.distraction_keywords),
        }
    }

    /// Classifies a window title. Empty titles are neutral.
    pub fn classify(&self, title: &str) -> Category {
        let title = title.trim();
        if title.is_empty() {
            return Category::Neutral;
        }
        let title = title.to_lowercase();
        if matches_any(&title, &self.work) {
            Category::Work
        } else if matches_any(&title, &self.distraction) {
            Category::Distraction
        } else {
            Category::Neutral
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn matches_any(title: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| title.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("visual studio code"), Category::Work);
        assert_eq!(classifier.classify("NETFLIX"), Category::Distraction);
    }

    #[test]
    fn classify_checks_work_before_distraction() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("YouTube - Google Chrome"), Category::Work);
    }

    #[test]
    fn classify_unmatched_is_neutral() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Finder"), Category::Neutral);
        assert_eq!(classifier.classify(""), Category::Neutral);
        assert_eq!(classifier.classify("   "), Category::Neutral);
    }

    #[test]
    fn classify_uses_configured_lists() {
        let classifier = Classifier::new(&ClassifierConfig {
            work_keywords: vec!["emacs".to_string()],
            distraction_keywords: vec!["Chrome".to_string(), String::new()],
        });
        assert_eq!(classifier.classify("GNU Emacs"), Category::Work);
        assert_eq!(classifier.classify("Google Chrome"), Category::Distraction);
        assert_eq!(classifier.classify("Terminal"), Category::Neutral);
    }

    #[test]
    fn config_deserializes_partial_override() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"work_keywords":["Zed"]}"#).unwrap();
        assert_eq!(config.work_keywords, vec!["Zed"]);
        assert_eq!(
            config.distraction_keywords,
            ClassifierConfig::default().distraction_keywords
        );
    }
}
