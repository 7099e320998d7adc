//! Tokenization shared by the content matchers

use std::collections::HashSet;

/// Common English words that carry no ranking signal
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from",
    "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "our", "so", "that", "the",
    "their", "this", "to", "was", "we", "what", "when", "where", "which", "who", "why", "will",
    "with", "you", "your",
];

/// Lowercase `text` and split it on anything that is not alphanumeric
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Tokens of `text` with stop words removed
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

/// Distinct tokens of `text`
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Split text into sentences at `.`, `!` or `?` followed by whitespace
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// The sentence sharing the most words with the query; the first one wins ties
pub fn best_sentence<'a>(text: &'a str, query_tokens: &HashSet<String>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for sentence in sentences(text) {
        let overlap = token_set(sentence).intersection(query_tokens).count();
        if best.is_none_or(|(_, score)| overlap > score) {
            best = Some((sentence, overlap));
        }
    }
    best.map(|(sentence, _)| sentence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Who founded Give-Me-Trees, in 1978?"),
            vec!["who", "founded", "give", "me", "trees", "in", "1978"]
        );
        assert_eq!(content_tokens("What is the mission?"), vec!["mission"]);
    }

    #[test]
    fn test_sentences() {
        assert_eq!(
            sentences("We plant trees. Join us! Version 2.0 is out? yes"),
            vec!["We plant trees.", "Join us!", "Version 2.0 is out?", "yes"]
        );
        assert!(sentences("   ").is_empty());
    }

    #[test]
    fn test_best_sentence_prefers_overlap_then_order() {
        let query = token_set("how do I volunteer");
        let text = "We plant trees. Volunteer with us today. Volunteers are welcome.";
        assert_eq!(best_sentence(text, &query), Some("Volunteer with us today."));

        let query = token_set("unrelated");
        assert_eq!(best_sentence(text, &query), Some("We plant trees."));
        assert_eq!(best_sentence("", &query), None);
    }
}
