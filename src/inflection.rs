//! Collection naming
//!
//! Record kinds are stored in collections named after the classified,
//! pluralized kind name: `book` and `Book` both live in `Books`,
//! `book_review` lives in `BookReviews`.

use convert_case::{Case, Casing};

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "fish",
    "information",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

/// (singular, plural)
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

/// Collection name for a record kind name.
pub fn collection_name(kind_name: &str) -> String {
    pluralize(&classify(kind_name))
}

/// Class name for a (possibly path-qualified, possibly plural) type name:
/// the last path segment, singularized and turned into PascalCase.
pub fn classify(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == ':' || c == '.')
        .next()
        .unwrap_or(name);
    let pascal = base.to_case(Case::Pascal);
    map_last_word(&pascal, singularize_word)
}

/// Plural form of the last word of a PascalCase or lowercase name.
pub fn pluralize(name: &str) -> String {
    map_last_word(name, pluralize_word)
}

fn map_last_word(name: &str, f: fn(&str) -> String) -> String {
    let split = name
        .char_indices()
        .filter(|(_, c)| c.is_uppercase())
        .map(|(idx, _)| idx)
        .last()
        .unwrap_or(0);
    let (head, last) = name.split_at(split);
    if last.is_empty() {
        return name.to_string();
    }

    let capitalized = last.chars().next().is_some_and(char::is_uppercase);
    let lowered = last.to_lowercase();
    let mut mapped = f(&lowered);
    if capitalized {
        mapped = capitalize(&mapped);
    }
    format!("{}{}", head, mapped)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pluralize_word(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == word) {
        return word.to_string();
    }

    if word.ends_with("ss")
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    format!("{}s", word)
}

fn singularize_word(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == word) {
        return singular.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "ches", "shes", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
