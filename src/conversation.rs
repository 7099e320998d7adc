//! # Conversation Module
//!
//! Turns a raw answer into a conversational reply: LLM output cleanup,
//! follow-up drivers and repeated-question handling.

pub mod drivers;

pub use drivers::{DriverSet, TopicRule};

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::history::Turn;
use crate::llm::{CompletionRequest, SharedCompletion};

/// Prefix used when the user repeats one of their recent questions
pub const REPEAT_PREFIX: &str = "Returning to your question, ";

/// Number of recent user messages checked for repeats
const REPEAT_WINDOW: usize = 3;

/// Prior turns after which every reply must end with a question
const KEEP_MOVING_AFTER: usize = 3;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").unwrap());

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Answer:|Follow-up question:)").unwrap());

/// Strip prompt scaffolding and formatting artifacts from generated text
///
/// Text before `[/handling_instruction]` and after `Response template:` is
/// dropped, `[...]` tags and `Answer:`/`Follow-up question:` labels are
/// removed, whitespace is collapsed and the first letter is capitalised.
pub fn clean_response(response: &str) -> String {
    let text = response
        .rsplit("[/handling_instruction]")
        .next()
        .unwrap_or(response);
    let text = text.split("Response template:").next().unwrap_or(text);
    let text = TAG_RE.replace_all(text, "");
    let text = LABEL_RE.replace_all(&text, "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ends_with_any(text: &str, endings: &[char]) -> bool {
    text.trim_end()
        .chars()
        .last()
        .is_some_and(|c| endings.contains(&c))
}

/// Finishes replies before they are shown and recorded
#[derive(Clone, Default)]
pub struct Polisher {
    drivers: DriverSet,
    llm: Option<SharedCompletion>,
}

impl Polisher {
    pub fn new(drivers: DriverSet) -> Self {
        Self { drivers, llm: None }
    }

    /// Rewrite replies with a completion backend before drivers are added
    pub fn with_llm(mut self, llm: SharedCompletion) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn drivers(&self) -> &DriverSet {
        &self.drivers
    }

    async fn rewrite(&self, input: &str, response: &str) -> String {
        let Some(llm) = &self.llm else {
            return response.to_string();
        };

        let request = CompletionRequest::new(format!(
            "Rewrite this reply so it reads as a friendly, natural answer to the user. \
             Keep every fact and do not add new ones. Reply with the rewritten text only.\n\n\
             User: {}\nReply: {}",
            input, response
        ))
        .with_max_tokens(200);

        match llm.complete(&request).await {
            Ok(rewritten) => {
                let cleaned = clean_response(&rewritten);
                if cleaned.is_empty() {
                    response.to_string()
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!("Reply rewrite failed, keeping original: {}", e);
                response.to_string()
            }
        }
    }

    /// Reply to record for this turn
    ///
    /// `history` is the conversation before the current turn.
    #[instrument(skip(self, response, history), fields(turns = history.len()))]
    pub async fn finalize(&self, input: &str, response: &str, history: &[Turn]) -> String {
        let mut reply = self.rewrite(input, response).await;

        if !ends_with_any(&reply, &['?', '!']) {
            if let Some(driver) = self.drivers.select(history) {
                debug!(driver = %driver, "Appending conversation driver");
                reply = format!("{} {}", reply, driver);
            }
        }

        let input_lower = input.to_lowercase();
        let repeated = history
            .iter()
            .rev()
            .take(REPEAT_WINDOW)
            .any(|turn| turn.user.to_lowercase() == input_lower);
        if repeated {
            reply = format!("{}{}", REPEAT_PREFIX, reply.to_lowercase());
        }

        reply
    }

    /// Reply shown to the user after the turn has been recorded
    ///
    /// Long conversations always end on a question so the user has somewhere
    /// to go next.
    pub fn keep_moving(&self, reply: &str, history: &[Turn]) -> String {
        if history.len() > KEEP_MOVING_AFTER && !reply.trim_end().ends_with('?') {
            if let Some(driver) = self.drivers.mid_driver() {
                return format!("{} {}", reply, driver);
            }
        }
        reply.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletion;
    use std::sync::Arc;

    fn turns(n: usize) -> Vec<Turn> {
        (0..n).map(|i| Turn::new(format!("question {}", i), "ok.")).collect()
    }

    #[test]
    fn test_clean_response() {
        let raw = "[INST] ignore [/handling_instruction] answer:   we build   [tag]AI tools. \
                   Follow-up question: want more? Response template: junk";
        assert_eq!(clean_response(raw), "We build AI tools. want more?");
        assert_eq!(clean_response("   "), "");
        assert_eq!(clean_response("plain"), "Plain");
    }

    #[tokio::test]
    async fn test_finalize_appends_driver() {
        let polisher = Polisher::new(DriverSet::gmtt());
        let reply = polisher.finalize("hi", "We plant trees.", &[]).await;
        assert!(reply.starts_with("We plant trees. "));
        assert!(DriverSet::gmtt().intro.iter().any(|d| reply.ends_with(d.as_str())));

        let reply = polisher.finalize("hi", "Want to join?", &[]).await;
        assert_eq!(reply, "Want to join?");
    }

    #[tokio::test]
    async fn test_finalize_marks_repeated_questions() {
        let polisher = Polisher::new(DriverSet::default());
        let history = vec![Turn::new("What Do You Do?", "We plant trees.")];
        let reply = polisher
            .finalize("what do you do?", "We Plant Trees!", &history)
            .await;
        assert_eq!(reply, "Returning to your question, we plant trees!");

        let history: Vec<Turn> = std::iter::once(Turn::new("what do you do?", "x"))
            .chain(turns(3))
            .collect();
        let reply = polisher.finalize("what do you do?", "Fine!", &history).await;
        assert_eq!(reply, "Fine!");
    }

    #[tokio::test]
    async fn test_finalize_with_llm_rewrite() {
        let llm = Arc::new(MockCompletion::new().reply("Answer: sure, we plant Peepal trees!"));
        let polisher = Polisher::new(DriverSet::default()).with_llm(llm.clone());
        let reply = polisher.finalize("trees?", "We plant trees.", &[]).await;
        assert_eq!(reply, "Sure, we plant Peepal trees!");
        assert!(llm.prompts()[0].contains("We plant trees."));

        let failing = Arc::new(MockCompletion::new().fail("down"));
        let polisher = Polisher::new(DriverSet::default()).with_llm(failing);
        let reply = polisher.finalize("trees?", "We plant trees!", &[]).await;
        assert_eq!(reply, "We plant trees!");
    }

    #[test]
    fn test_keep_moving() {
        let polisher = Polisher::new(DriverSet::indeed());
        assert_eq!(polisher.keep_moving("Done.", &turns(3)), "Done.");
        assert_eq!(polisher.keep_moving("Shall we?", &turns(4)), "Shall we?");

        let reply = polisher.keep_moving("Done.", &turns(4));
        assert!(reply.starts_with("Done. "));
        assert!(DriverSet::indeed().mid.iter().any(|d| reply.ends_with(d.as_str())));
    }
}
