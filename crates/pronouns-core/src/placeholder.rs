//! Text placeholders for the game front-end, e.g. `%pronouns_subjective%`.
//!
//! An identifier is a form name with an optional case modifier:
//! `subjective`, `subjective_upper`, `pronouns_capital`. Users without
//! pronouns render with the default set.

use pronouns_types::pronoun::{PronounSet, SEPARATOR, capitalise};

use crate::pronoun::PronounEntry;

/// Render a placeholder. `None` for an unknown identifier.
pub fn render(identifier: &str, entries: &[PronounEntry], default: &PronounSet) -> Option<String> {
    let (name, modifier) = match identifier.split_once('_') {
        Some((name, modifier)) => (name, Some(modifier)),
        None => (identifier, None),
    };

    let main = entries.iter().find_map(PronounEntry::as_set).unwrap_or(default);

    let text = match name.to_ascii_lowercase().as_str() {
        "pronouns" => display_name(entries, default),
        "all" => main.to_string(),
        "subjective" => main.subjective.clone(),
        "objective" => main.objective.clone(),
        "progressive" => main.progressive.clone(),
        "possessiveadj" => main.possessive_adjective.clone(),
        "possessivepro" => main.possessive_pronoun.clone(),
        "reflexive" => main.reflexive.clone(),
        _ => return None,
    };

    Some(match modifier.map(str::to_ascii_lowercase).as_deref() {
        Some("upper") => text.to_uppercase(),
        Some("lower") => text.to_lowercase(),
        Some("capital") => capitalise(&text),
        _ => text,
    })
}

fn display_name(entries: &[PronounEntry], default: &PronounSet) -> String {
    match entries {
        [] => default.formatted(),
        [single] => single.formatted(),
        many => many
            .iter()
            .map(|entry| match entry {
                PronounEntry::Set(set) => capitalise(&set.subjective),
                PronounEntry::Any => "Any".to_string(),
                PronounEntry::Ask => "Ask".to_string(),
            })
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string()),
    }
}
