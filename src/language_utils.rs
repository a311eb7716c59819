use std::path::Path;
use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Container tracks usually carry ISO 639-2/B tags (`jpn`, `fre`, `ger`),
/// configuration and file names more often use ISO 639-1 (`ja`, `fr`).
/// Everything is compared in ISO 639-2/T form.

/// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn bibliographic_to_terminologic(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminologic)| *terminologic)
}

fn lookup(code: &str) -> Option<Language> {
    let normalized_code = code.trim().to_lowercase();
    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code),
        3 => {
            let part2t = bibliographic_to_terminologic(&normalized_code).unwrap_or(&normalized_code);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Check that a code is a known ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))
}

/// File name segments that flag a subtitle variant, not a language
const VARIANT_SUFFIXES: [&str; 7] = ["hi", "sdh", "cc", "forced", "default", "full", "signs"];

/// Language tag embedded in a subtitle file name (`episode01.ja.srt`,
/// `episode01.jpn.forced.srt`)
///
/// Only codes of languages with an ISO 639-1 code are accepted, so English
/// words that happen to be ISO 639-3 codes (`the`, `end`) are not tags.
pub fn language_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let segments: Vec<&str> = stem.split('.').skip(1).collect();

    let tag = segments
        .iter()
        .rev()
        .find(|segment| !VARIANT_SUFFIXES.contains(&segment.to_lowercase().as_str()))?;
    lookup(tag)
        .filter(|lang| lang.to_639_1().is_some())
        .map(|lang| lang.to_639_3().to_string())
}
