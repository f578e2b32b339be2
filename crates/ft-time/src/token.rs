//! Shared token-mask substitution.
//!
//! Both formatting grammars (calendar masks on `Instant`, duration masks on
//! `Duration`) map a fixed token vocabulary to rendered substrings and
//! substitute every occurrence in a caller-supplied mask. Longer tokens must
//! win over their prefixes (`YYYY` over `YY`, `ms` over `m` and `s`), which
//! the alternation states directly by listing tokens longest-first.

use regex::Regex;

/// Build an alternation pattern from a fixed token vocabulary.
///
/// Tokens are sorted longest-first so the regex engine's leftmost-alternative
/// preference implements longest-token matching.
pub(crate) fn alternation(tokens: &[&str]) -> String {
    let mut sorted: Vec<&str> = tokens.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    sorted.join("|")
}

/// Substitute every token match in `mask`, resolving each through `render`.
///
/// Characters that match no token pass through verbatim. Literal text that
/// happens to spell a token is substituted too; callers own that trade-off.
pub(crate) fn substitute(re: &Regex, mask: &str, render: impl Fn(&str) -> String) -> String {
    re.replace_all(mask, |caps: &regex::Captures<'_>| render(&caps[0]))
        .into_owned()
}
