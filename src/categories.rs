//! Keyword taxonomy and the category filter.
//!
//! An item matches a category when any of the category's keywords occurs in
//! the item's title or body, compared case-insensitively as a plain substring.
//! The filter keeps an item when at least one matched category is active; with
//! no active categories it keeps everything and records nothing.

use crate::error::ConfigError;
use crate::models::{CandidateItem, CategoryRule};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default taxonomy. Order matters: matches are recorded in this order.
const BUILTIN_TAXONOMY: &[(&str, &[&str])] = &[
    (
        "rl_verification",
        &[
            "reinforcement learning verification",
            "verify reinforcement learning",
            "formal verification rl",
            "safe rl",
            "rl safety",
        ],
    ),
    (
        "alignment",
        &[
            "alignment",
            "constitutional ai",
            "ai safety",
            "reward hacking",
            "rlhf",
            "reward model",
            "value learning",
        ],
    ),
    (
        "ai4math",
        &[
            "ai for mathematics",
            "mathematical reasoning",
            "theorem proving",
            "math",
            "formal math",
            "automated theorem proving",
        ],
    ),
    (
        "auto_formalization",
        &[
            "auto-formalization",
            "auto formalization",
            "formalization",
            "informal to formal",
            "proof synthesis",
            "formal methods",
        ],
    ),
    (
        "reasoning",
        &[
            "reasoning",
            "logic",
            "deductive reasoning",
            "inductive reasoning",
            "chain of thought",
        ],
    ),
    (
        "llm",
        &["large language model", "llm", "transformer", "gpt", "language model"],
    ),
    (
        "reinforcement_learning",
        &[
            "reinforcement learning",
            "rl",
            "policy gradient",
            "q-learning",
            "actor critic",
        ],
    ),
    (
        "computer_vision",
        &["vision", "image", "video", "convolutional", "segmentation", "detection"],
    ),
    (
        "multimodal",
        &["multimodal", "vision-language", "clip", "visual-language"],
    ),
    ("generative", &["diffusion", "gan", "generation", "generative"]),
    (
        "agents",
        &["agent", "autonomous", "planning", "decision making"],
    ),
];

/// The full, ordered set of category rules known to this run.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    rules: Vec<CategoryRule>,
}

impl Taxonomy {
    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN_TAXONOMY
                .iter()
                .map(|(name, keywords)| CategoryRule::new(name, keywords))
                .collect(),
        }
    }

    /// Parse a YAML list of `{ name, keywords }` mappings.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let rules: Vec<CategoryRule> = serde_yaml::from_str(yaml)?;
        Ok(Self { rules })
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let taxonomy = Self::from_yaml_str(&yaml).map_err(|source| ConfigError::CategoryFile {
            path: display,
            source,
        })?;
        info!(categories = taxonomy.rules.len(), "Loaded category taxonomy");
        Ok(taxonomy)
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Names of every rule with a keyword occurring in `text`, in taxonomy order.
pub fn matching_categories(rules: &[CategoryRule], text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    rules
        .iter()
        .filter(|rule| {
            rule.keywords
                .iter()
                .any(|kw| haystack.contains(&kw.to_lowercase()))
        })
        .map(|rule| rule.name.clone())
        .collect()
}

/// Topical filter built once per run.
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    rules: Vec<CategoryRule>,
    active: Vec<String>,
}

impl CategoryFilter {
    /// Build a filter for `active` category names. Every name must exist in the taxonomy.
    pub fn new(taxonomy: &Taxonomy, active: &[String]) -> Result<Self, ConfigError> {
        if let Some(unknown) = active.iter().find(|name| !taxonomy.contains(name)) {
            return Err(ConfigError::UnknownCategory(unknown.clone()));
        }
        Ok(Self {
            rules: taxonomy.rules().to_vec(),
            active: active.to_vec(),
        })
    }

    /// A filter that lets every item through untouched.
    pub fn disabled() -> Self {
        Self {
            rules: Vec::new(),
            active: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn active(&self) -> &[String] {
        &self.active
    }

    /// Categories matched by `item`, or `None` when the item should be dropped.
    pub fn classify(&self, item: &CandidateItem) -> Option<Vec<String>> {
        if !self.is_enabled() {
            return Some(Vec::new());
        }
        let matched = matching_categories(&self.rules, &item.searchable_text());
        if matched.iter().any(|name| self.active.contains(name)) {
            Some(matched)
        } else {
            None
        }
    }

    /// Keep items that match an active category and record their categories.
    ///
    /// # Arguments
    ///
    /// * `items` - Candidates of any source type
    ///
    /// # Returns
    ///
    /// Every item unchanged when the filter is disabled. Otherwise only items
    /// whose title or body contains a keyword of an active category, each with
    /// `matched_categories` filled in taxonomy order.
    #[instrument(level = "info", skip_all, fields(input = items.len()))]
    pub fn apply(&self, items: Vec<CandidateItem>) -> Vec<CandidateItem> {
        if !self.is_enabled() {
            return items;
        }
        let total = items.len();
        let kept: Vec<CandidateItem> = items
            .into_iter()
            .filter_map(|mut item| {
                let matched = self.classify(&item);
                match matched {
                    Some(categories) => {
                        item.matched_categories = categories;
                        Some(item)
                    }
                    None => {
                        debug!(title = %item.title, "No active category matched; dropping");
                        None
                    }
                }
            })
            .collect();
        info!(kept = kept.len(), dropped = total - kept.len(), "Applied category filter");
        kept
    }
}
