//! Inclusion and exclusion criteria evaluated against hosted repositories.
//!
//! Patterns are shell globs. An empty inclusion list accepts everything; an
//! empty exclusion list rejects nothing. Patterns are tried in order and a
//! malformed one ends the search with no match, so a typo in a list can only
//! narrow what it selects.

use canopy_core::Criteria;
use canopy_github::Repo;
use glob::Pattern;

/// `true` when `word` matches one of `patterns`, or `patterns` is empty.
pub fn matches_any(word: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    for pattern in patterns {
        match Pattern::new(pattern) {
            Ok(p) if p.matches(word) => return true,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "invalid glob pattern");
                return false;
            }
        }
    }
    false
}

/// `true` when any of `words` matches any of `patterns`, or `patterns` is empty.
pub fn any_word_matches_any(words: &[String], patterns: &[String]) -> bool {
    patterns.is_empty() || words.iter().any(|w| matches_any(w, patterns))
}

/// Why `repo` is not wanted, or `None` when it passes every check.
///
/// Inclusion checks run in a fixed order and stop at the first failure:
/// name, topics, language, archived, fork, template, private. Exclusions are
/// checked only once every inclusion check passed.
pub fn rejection_reason(repo: &Repo, include: &Criteria, exclude: Option<&Criteria>) -> Option<String> {
    let language = repo.language.as_deref().unwrap_or("");

    if !matches_any(&repo.name, &include.names) {
        return Some(format!(
            "{} doesn't match any name in {:?}",
            repo.name, include.names
        ));
    }
    if !any_word_matches_any(&repo.topics, &include.topics) {
        return Some(format!(
            "none of the repo topics {:?} match any config topic {:?}",
            repo.topics, include.topics
        ));
    }
    if !matches_any(language, &include.languages) {
        return Some(format!(
            "{language} doesn't match any language in {:?}",
            include.languages
        ));
    }

    let flags = [
        (include.archived, repo.archived, "archived"),
        (include.fork, repo.fork, "a fork"),
        (include.is_template, repo.is_template, "a template"),
        (include.private, repo.private, "private"),
    ];
    for (wanted, actual, what) in flags {
        if wanted.is_some_and(|w| w != actual) {
            return Some(format!("repo {} {what}", is_or_is_not(actual)));
        }
    }

    exclude.and_then(|ex| exclusion_reason(repo, language, ex))
}

fn exclusion_reason(repo: &Repo, language: &str, ex: &Criteria) -> Option<String> {
    if !ex.names.is_empty() && matches_any(&repo.name, &ex.names) {
        return Some(format!(
            "{} matches an excluded name in {:?}",
            repo.name, ex.names
        ));
    }
    if !ex.topics.is_empty() && any_word_matches_any(&repo.topics, &ex.topics) {
        return Some(format!(
            "one of the repo topics {:?} matches an excluded topic in {:?}",
            repo.topics, ex.topics
        ));
    }
    if !ex.languages.is_empty() && matches_any(language, &ex.languages) {
        return Some(format!(
            "{language} matches an excluded language in {:?}",
            ex.languages
        ));
    }

    let flags = [
        (ex.archived, repo.archived, "archived"),
        (ex.fork, repo.fork, "a fork"),
        (ex.is_template, repo.is_template, "a template"),
        (ex.private, repo.private, "private"),
    ];
    flags
        .into_iter()
        .find(|(excluded, actual, _)| *excluded == Some(*actual))
        .map(|(_, actual, what)| format!("excluded because repo {} {what}", is_or_is_not(actual)))
}

fn is_or_is_not(flag: bool) -> &'static str {
    if flag {
        "is"
    } else {
        "is not"
    }
}
