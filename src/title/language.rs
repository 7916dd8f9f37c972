//! Language name to ISO-639-1 code table

/// Full language names, matched anywhere in a title
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("tamil", "ta"),
    ("telugu", "te"),
    ("hindi", "hi"),
    ("malayalam", "ml"),
    ("kannada", "kn"),
    ("english", "en"),
    ("bengali", "bn"),
    ("bangla", "bn"),
    ("marathi", "mr"),
    ("punjabi", "pa"),
    ("gujarati", "gu"),
    ("odia", "or"),
    ("oriya", "or"),
    ("urdu", "ur"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("chinese", "zh"),
    ("mandarin", "zh"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("italian", "it"),
    ("russian", "ru"),
    ("portuguese", "pt"),
    ("arabic", "ar"),
    ("thai", "th"),
    ("turkish", "tr"),
    ("indonesian", "id"),
];

/// Abbreviations, only trusted inside a bracketed language list
const LANGUAGE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("tam", "ta"),
    ("tel", "te"),
    ("hin", "hi"),
    ("mal", "ml"),
    ("kan", "kn"),
    ("eng", "en"),
    ("ben", "bn"),
    ("mar", "mr"),
    ("guj", "gu"),
    ("jap", "ja"),
    ("jpn", "ja"),
    ("kor", "ko"),
    ("chi", "zh"),
    ("spa", "es"),
    ("fre", "fr"),
    ("fra", "fr"),
    ("ger", "de"),
    ("ita", "it"),
    ("rus", "ru"),
    ("por", "pt"),
    ("ara", "ar"),
    ("tur", "tr"),
];

/// Short bracket tokens that are release jargon, not languages
const NOT_LANGUAGES: &[&str] = &[
    "org", "aud", "dub", "hq", "hd", "web", "rip", "sub", "esub", "the", "and", "of", "ddp", "aac",
    "kb", "mb", "gb", "tb", "ep", "new", "avc", "dts", "fhd", "uhd", "cam", "v", "x", "s", "e",
    "dd", "ac", "mp", "ts", "tc", "hc", "pre", "mix", "day", "vol", "ver", "end", "fin", "all",
    "com", "net", "in", "to", "tv", "ott", "bd", "dv", "hdr", "nf", "uc", "eps", "sp", "ova",
    "top", "big", "box", "set", "pt", "no", "on", "at", "by",
];

/// Maps a full language name (case-insensitive) to its code
pub fn lookup_name(word: &str) -> Option<&'static str> {
    let lowered = word.to_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, code)| *code)
}

/// Maps a full name or abbreviation to its code
pub fn lookup_any(word: &str) -> Option<&'static str> {
    lookup_name(word).or_else(|| {
        let lowered = word.to_lowercase();
        LANGUAGE_ABBREVIATIONS
            .iter()
            .find(|(abbr, _)| *abbr == lowered)
            .map(|(_, code)| *code)
    })
}

/// Whether an unmapped token inside a language list should be kept verbatim
pub fn is_unmapped_language_token(word: &str) -> bool {
    let lowered = word.to_lowercase();
    (2..=3).contains(&lowered.chars().count())
        && lowered.chars().all(|c| c.is_ascii_alphabetic())
        && !NOT_LANGUAGES.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_names_are_case_insensitive() {
        assert_eq!(lookup_name("Tamil"), Some("ta"));
        assert_eq!(lookup_name("MALAYALAM"), Some("ml"));
        assert_eq!(lookup_name("tam"), None);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(lookup_any("Tel"), Some("te"));
        assert_eq!(lookup_any("HIN"), Some("hi"));
        assert_eq!(lookup_any("xyz"), None);
    }

    #[test]
    fn test_unmapped_tokens() {
        assert!(is_unmapped_language_token("Sin"));
        assert!(!is_unmapped_language_token("GB"));
        assert!(!is_unmapped_language_token("Org"));
        assert!(!is_unmapped_language_token("Audio"));
        assert!(!is_unmapped_language_token("h2"));
        assert!(!is_unmapped_language_token("Day"));
        assert!(!is_unmapped_language_token("Vol"));
    }
}
