//! Built-in heuristics.
//!
//! Every function here is pure: the same input and configuration always give
//! the same answer.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::settings::HeuristicConfig;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'y'];

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?://|www\.|\.(com|net|org|info|biz|ru|xyz|top|io|co|online|site|shop)\b)")
        .expect("url regex should compile")
});

fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c.to_ascii_lowercase())
}

/// More than `uppercase_ratio` of the letters are capitals, once the value
/// holds at least `uppercase_min_letters` letters.
pub fn excessive_uppercase(value: &str, config: &HeuristicConfig) -> bool {
    let letters: Vec<char> = value.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < config.uppercase_min_letters.max(1) {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    (upper as f64) / (letters.len() as f64) > config.uppercase_ratio
}

/// Three or more Latin letters without a single vowel. Values with non-Latin
/// letters are left alone.
pub fn no_vowels(value: &str) -> bool {
    if value.chars().any(|c| c.is_alphabetic() && !c.is_ascii_alphabetic()) {
        return false;
    }
    let letters: Vec<char> = value.chars().filter(char::is_ascii_alphabetic).collect();
    letters.len() >= 3 && !letters.iter().copied().any(is_vowel)
}

/// A run of `consonant_run` or more Latin consonants.
pub fn consonant_cluster(value: &str, config: &HeuristicConfig) -> bool {
    let threshold = config.consonant_run.max(1);
    let mut run = 0usize;
    for c in value.chars() {
        if c.is_ascii_alphabetic() && !is_vowel(c) {
            run += 1;
            if run >= threshold {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

pub fn numbers(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

/// Anything that is neither alphanumeric nor allowed name punctuation.
pub fn special_characters(value: &str, config: &HeuristicConfig) -> bool {
    value
        .chars()
        .any(|c| !c.is_alphanumeric() && !config.allowed_name_punctuation.contains(c))
}

pub fn spam_words(value: &str, config: &HeuristicConfig) -> bool {
    let haystack = value.to_lowercase();
    config
        .spam_words
        .iter()
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .any(|word| haystack.contains(&word))
}

/// Malformed addresses and addresses on blocked domains.
pub fn invalid_email_domain(email: &str, config: &HeuristicConfig) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return true;
    };
    if local.is_empty() || domain.is_empty() {
        return true;
    }
    let domain = domain.to_ascii_lowercase();
    if !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
        || domain.chars().any(|c| !(c.is_alphanumeric() || c == '.' || c == '-'))
    {
        return true;
    }
    config.blocked_email_domains.iter().any(|blocked| {
        let blocked = blocked.trim().to_ascii_lowercase();
        !blocked.is_empty()
            && (domain == blocked || domain.ends_with(&format!(".{blocked}")))
    })
}

/// Local part holds more periods than `max_email_local_periods`.
pub fn excessive_periods_email(email: &str, config: &HeuristicConfig) -> bool {
    let local = email.trim().rsplit_once('@').map_or(email, |(local, _)| local);
    local.matches('.').count() > config.max_email_local_periods
}

pub fn url_in_username(username: &str) -> bool {
    URL_PATTERN.is_match(username)
}
