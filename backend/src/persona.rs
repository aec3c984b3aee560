//! Demographic tag derived from the free-text brief.
//!
//! Both the streaming copy endpoint and the quote endpoint resolve the persona
//! through [`resolve`], so identical briefs always yield identical tags.

use serde::Serialize;

use crate::lexicon::Lexicon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Display label used inside prompts and quote tables.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "남성",
            Gender::Female => "여성",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaTag {
    pub gender: Gender,
    /// Decade numeral only, e.g. `"30"`.
    pub age: String,
    marker: String,
}

impl PersonaTag {
    /// Age with its unit, e.g. `"30대"`.
    pub fn age_label(&self) -> String {
        format!("{}{}", self.age, self.marker)
    }

    /// Short form used in prompts, e.g. `"30대 여성"`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.age_label(), self.gender.label())
    }
}

/// Resolve gender and age bucket from the brief's target and concern fields.
///
/// Matching is case-sensitive substring search. Any male token in either field
/// makes the persona male; the first decade numeral in `target`, then in
/// `concern`, sets the age. Never fails.
pub fn resolve(lexicon: &Lexicon, target: &str, concern: &str) -> PersonaTag {
    let is_male = lexicon
        .male_tokens()
        .iter()
        .filter(|t| !t.is_empty())
        .any(|t| target.contains(t.as_str()) || concern.contains(t.as_str()));

    let age = lexicon
        .find_decade(target)
        .or_else(|| lexicon.find_decade(concern))
        .unwrap_or(lexicon.default_age())
        .to_string();

    PersonaTag {
        gender: if is_male { Gender::Male } else { Gender::Female },
        age,
        marker: lexicon.decade_marker().to_string(),
    }
}
