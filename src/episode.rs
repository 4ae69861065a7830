//! Episode-number extraction from free-text release titles.
//!
//! Extraction is an ordered cascade of [`Rule`]s. Each rule is a regular
//! expression whose first capture group is the candidate number, plus a list of
//! [`Validator`]s that may veto the candidate. Rules are evaluated in order and
//! the first candidate that parses and passes every validator wins.
//!
//! The validators are plain functions so both origin cascades can share them:
//!
//! - [`not_resolution_suffix`] rejects `1080` in `1080p`
//! - [`within_magnitude`] rejects values above [`MAX_EPISODE`] (years, ids)
//!
//! # Examples
//!
//! ```rust
//! use tansaku::episode::{self, Track};
//!
//! let found = episode::DMHY.extract("[Group][One Piece][1151][1080p]").unwrap();
//! assert_eq!(found.number, 1151);
//! assert_eq!(found.track, Track::Regular);
//!
//! assert!(episode::DMHY.extract("[Group] One Piece Movie 1080p").is_none());
//! ```

use once_cell::sync::Lazy;
use regex::{Match, Regex};

/// Largest value accepted by [`within_magnitude`].
pub const MAX_EPISODE: u32 = 10_000;

/// Pattern for the generic fallback: the last run of ASCII digits in the title.
///
/// Every pattern uses `[0-9]` rather than `\d`, which would also match
/// full-width digits that do not parse as `u32`.
const TRAILING_NUMBER: &str = r"([0-9]+)[^0-9]*$";

/// Veto check for a candidate: `(title, captured digits, parsed value) -> accept?`
pub type Validator = fn(&str, Match<'_>, u32) -> bool;

/// Rejects a candidate immediately followed by `p`/`P`, which marks a resolution.
pub fn not_resolution_suffix(title: &str, digits: Match<'_>, _value: u32) -> bool {
    !matches!(title[digits.end()..].chars().next(), Some('p' | 'P'))
}

/// Rejects values above [`MAX_EPISODE`].
pub fn within_magnitude(_title: &str, _digits: Match<'_>, value: u32) -> bool {
    value <= MAX_EPISODE
}

/// Which numbering a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    /// Regular episode numbering
    Regular,
    /// Specials (`SP1`, `SP2`), numbered independently of regular episodes
    Special,
}

/// A successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeMatch {
    pub number: u32,
    pub track: Track,
    /// Name of the rule that produced the match
    pub rule: &'static str,
}

/// One step of the cascade.
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    pattern: Regex,
    track: Track,
    validators: Vec<Validator>,
}

impl Rule {
    /// Creates a rule from a pattern whose first capture group is the number.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for invalid patterns.
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            track: Track::Regular,
            validators: Vec::new(),
        })
    }

    /// Marks matches of this rule as specials.
    pub fn special(mut self) -> Self {
        self.track = Track::Special;
        self
    }

    /// Adds a validator. All validators must accept a candidate.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// The generic trailing-number fallback with both standard validators.
    pub fn trailing_number() -> Self {
        Self::new("trailing-number", TRAILING_NUMBER)
            .expect("valid fallback pattern")
            .with_validator(not_resolution_suffix)
            .with_validator(within_magnitude)
    }

    fn apply(&self, title: &str) -> Option<EpisodeMatch> {
        let digits = self.pattern.captures(title)?.get(1)?;
        let number: u32 = digits.as_str().parse().ok()?;

        self.validators
            .iter()
            .all(|accept| accept(title, digits, number))
            .then_some(EpisodeMatch {
                number,
                track: self.track,
                rule: self.name,
            })
    }
}

/// An ordered cascade of rules with early exit.
#[derive(Debug, Clone)]
pub struct EpisodeExtractor {
    rules: Vec<Rule>,
}

impl EpisodeExtractor {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Runs the cascade. `None` means the episode is unknown.
    pub fn extract(&self, title: &str) -> Option<EpisodeMatch> {
        self.rules.iter().find_map(|rule| rule.apply(title))
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }
}

fn rule(name: &'static str, pattern: &str) -> Rule {
    Rule::new(name, pattern).expect("valid episode pattern")
}

/// Cascade for DMHY titles: `(N)`, `[N]`, `第N話`/`第N话`, then the trailing number.
pub static DMHY: Lazy<EpisodeExtractor> = Lazy::new(|| {
    EpisodeExtractor::new(vec![
        rule("parenthesized", r"\(([0-9]+)\)"),
        rule("bracketed", r"\[([0-9]+)\]"),
        rule("chinese-marker", r"第([0-9]+)[話话]"),
        Rule::trailing_number(),
    ])
});

/// Cascade for ACG.RIP titles: `- EP N`, `- SPN`, `- N (`, `- N`, then the trailing number.
pub static ACGRIP: Lazy<EpisodeExtractor> = Lazy::new(|| {
    EpisodeExtractor::new(vec![
        rule("dash-ep", r"(?i)-\s*EP\s*([0-9]+)"),
        rule("dash-special", r"(?i)-\s*SP\s*([0-9]+)").special(),
        rule("dash-number-paren", r"-\s*([0-9]+)\s*\("),
        rule("dash-number", r"-\s*([0-9]+)(?:\s|$)"),
        Rule::trailing_number(),
    ])
});
