//! On-disk knowledge base layouts

use indexmap::IndexMap;
use serde::Deserialize;

/// The JSON layouts a knowledge base file may use
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum KnowledgeFile {
    /// `{"faqs": {"intents": [...]}}`
    Intents { faqs: IntentList },
    /// `{"faqs": [...]}`
    Faqs { faqs: Vec<RawFaq> },
    /// `{"question": "answer", ...}`, kept in file order
    Flat(IndexMap<String, String>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntentList {
    #[serde(default)]
    pub intents: Vec<RawIntent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFaq {
    pub question: String,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIntent {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default)]
    pub follow_up: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_are_distinguished() {
        let faqs: KnowledgeFile =
            serde_json::from_str(r#"{"faqs": [{"question": "Q", "responses": ["A"]}]}"#).unwrap();
        assert!(matches!(faqs, KnowledgeFile::Faqs { .. }));

        let intents: KnowledgeFile = serde_json::from_str(
            r#"{"faqs": {"intents": [{"tag": "t", "patterns": ["p"], "responses": ["r"]}]}}"#,
        )
        .unwrap();
        assert!(matches!(intents, KnowledgeFile::Intents { .. }));

        let flat: KnowledgeFile = serde_json::from_str(r#"{"Who are you?": "A bot"}"#).unwrap();
        assert!(matches!(flat, KnowledgeFile::Flat(_)));
    }
}
