//! Title normalization for matching and id derivation

/// Normalizes a title for comparison
///
/// Lowercases, turns punctuation into whitespace, drops a naive plural `s`,
/// folds a few synonyms (`season` → `s`, `episode` → `ep`, `part` → `p`,
/// `volume` → `v`) and collapses whitespace. Applying it twice gives the same
/// result as applying it once.
///
/// # Examples
///
/// ```
/// use sumi_harvest::title::normalize;
///
/// assert_eq!(normalize(" The Show "), normalize("the-show"));
/// assert_eq!(normalize("Seasons & Episodes"), "s ep");
/// ```
pub fn normalize(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    spaced
        .split_whitespace()
        .map(|word| canonical_word(depluralize(word)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized form with hyphens instead of spaces, used for record ids
///
/// ```
/// use sumi_harvest::title::normalize_id;
///
/// assert_eq!(normalize_id("Cooku With Comali (2025) S06"), "cooku-with-comali-2025-s06");
/// ```
pub fn normalize_id(text: &str) -> String {
    normalize(text)
        .replace(' ', "-")
        .trim_matches('-')
        .to_string()
}

fn depluralize(word: &str) -> &str {
    if word.chars().count() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

fn canonical_word(word: &str) -> &str {
    match word {
        "season" => "s",
        "episode" => "ep",
        "part" => "p",
        "volume" => "v",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_and_punctuation_are_equivalent() {
        assert_eq!(normalize(" The Show "), "the show");
        assert_eq!(normalize("the-show"), "the show");
        assert_eq!(normalize("THE...SHOW!!"), "the show");
    }

    #[test]
    fn test_synonyms() {
        assert_eq!(normalize("Season 2 Episode 4"), "s 2 ep 4");
        assert_eq!(normalize("Part 1 Volume 3"), "p 1 v 3");
    }

    #[test]
    fn test_depluralize() {
        assert_eq!(normalize("Heroes"), "heroe");
        assert_eq!(normalize("Boss"), "boss");
        assert_eq!(normalize("Bus"), "bus");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "Cooku With Comali (2025) S06",
            "Seasons of Love",
            "Mercy For None",
            "Glasses & Classes",
            "  --  ",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input}");
            assert_eq!(normalize(input), once);
        }
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(" -- Mercy For None -- "), "mercy-for-none");
        assert_eq!(normalize_id(""), "");
    }
}
