//! Naming-convention transforms applied to field wire names.

use core::fmt;

// -----------------------------------------------------------------------------
// NameRule

/// A record-level naming convention applied to every field's wire name,
/// unless a per-field rename overrides it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameRule {
    /// Keep the declared name.
    #[default]
    Preserve,
    Lower,
    Upper,
    Camel,
    Pascal,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl NameRule {
    /// Parses the conventional spelling used in attributes
    /// (`"camelCase"`, `"kebab-case"`, ...).
    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "camelCase" => Self::Camel,
            "PascalCase" => Self::Pascal,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    /// Applies the convention to a declared field name.
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Preserve => name.to_owned(),
            Self::Lower => name.to_lowercase().replace(['-', '_'], ""),
            Self::Upper => name.to_uppercase().replace(['-', '_'], ""),
            Self::Camel => {
                let pascal = Self::Pascal.apply(name);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => pascal,
                }
            }
            Self::Pascal => words(name)
                .map(|w| {
                    let mut chars = w.chars();
                    match chars.next() {
                        Some(first) => first
                            .to_uppercase()
                            .chain(chars.flat_map(char::to_lowercase))
                            .collect(),
                        None => String::new(),
                    }
                })
                .collect(),
            Self::Snake => join(words(name), "_", false),
            Self::ScreamingSnake => join(words(name), "_", true),
            Self::Kebab => join(words(name), "-", false),
            Self::ScreamingKebab => join(words(name), "-", true),
        }
    }
}

impl fmt::Display for NameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Preserve => "preserve",
            Self::Lower => "lowercase",
            Self::Upper => "UPPERCASE",
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Snake => "snake_case",
            Self::ScreamingSnake => "SCREAMING_SNAKE_CASE",
            Self::Kebab => "kebab-case",
            Self::ScreamingKebab => "SCREAMING-KEBAB-CASE",
        };
        f.pad(text)
    }
}

/// Splits an identifier into words at `_`/`-` separators and lower-to-upper
/// case boundaries.
fn words(name: &str) -> impl Iterator<Item = String> + '_ {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                out.push(core::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(core::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out.into_iter()
}

fn join(words: impl Iterator<Item = String>, sep: &str, upper: bool) -> String {
    let mut out = String::new();
    for (i, w) in words.enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        if upper {
            out.push_str(&w.to_uppercase());
        } else {
            out.push_str(&w.to_lowercase());
        }
    }
    out
}
