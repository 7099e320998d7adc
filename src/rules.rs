//! # Rules Module
//!
//! Deterministic handlers for small talk, identity questions, greetings,
//! dates and contact requests. Every function is pure: the clock and the
//! organisation profile are passed in.

mod clock;
mod contact;

pub use clock::{date_query, time_greeting};
pub use contact::{
    ContactDetails, PENDING_DETAILS_MARKER, contact_request_reply, extract_details,
    info_statement_reply, info_submission_reply, is_contact_request, is_info_request,
};

use rand::seq::SliceRandom;

use crate::bots::BotProfile;
use crate::matcher::tokenize::tokenize;

/// Reply to empty input
pub const INVALID_INPUT_REPLY: &str = "Please provide a valid input.";

const GREETING_WORDS: &[&str] = &["hi", "hello", "hey", "hii"];

const IDENTITY_PHRASES: &[&str] = &["who are you", "what do you do", "your role"];

const NAME_PHRASES: &[&str] = &["what is your name", "your name"];

const META_PHRASES: &[&str] = &[
    "what can i ask you",
    "suggest me some topics",
    "what topics can i ask",
    "how can you help",
    "what do you know",
    "what services do you provide",
    "what questions can i ask",
];

fn pick(options: &[&str]) -> String {
    options
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}

pub fn is_valid_input(input: &str) -> bool {
    !input.trim().is_empty()
}

/// Greetings, "how are you", thanks and goodbyes
pub fn small_talk(input: &str, assistant_name: &str) -> Option<String> {
    let msg = input.trim().to_lowercase();

    if tokenize(&msg)
        .iter()
        .any(|word| GREETING_WORDS.contains(&word.as_str()))
    {
        return Some(format!(
            "Hello! I'm {}. How can I help you today?",
            assistant_name
        ));
    }
    if msg.contains("how are you") {
        return Some(pick(&[
            "I'm doing great, thanks for asking!",
            "I'm good! How about you?",
        ]));
    }
    if ["great", "good", "awesome"].contains(&msg.as_str()) {
        return Some(pick(&["Glad to hear that!", "That's wonderful!"]));
    }
    if msg.contains("thank you") || msg.contains("thanks") {
        return Some(pick(&["You're welcome!", "Happy to help!"]));
    }
    if msg.contains("bye") || msg.contains("exit") {
        return Some("Goodbye! Have a great day!".to_string());
    }
    None
}

/// "What is your name?" and "who are you?"
pub fn identity(input: &str, profile: &BotProfile) -> Option<String> {
    let msg = input.to_lowercase();

    if NAME_PHRASES.iter().any(|p| msg.contains(p)) {
        return Some(format!(
            "My name is {}. What would you like to know about {} today?",
            profile.assistant_name, profile.org_name
        ));
    }
    if IDENTITY_PHRASES.iter().any(|p| msg.contains(p)) {
        return Some(format!(
            "I'm {}, the digital assistant for {}. I can tell you about our work in {}.",
            profile.assistant_name,
            profile.org_name,
            profile.services.join(", ")
        ));
    }
    None
}

/// Questions about what the assistant can help with
pub fn meta_question(input: &str, profile: &BotProfile) -> Option<String> {
    let msg = input.to_lowercase();
    if !META_PHRASES.iter().any(|p| msg.contains(p)) {
        return None;
    }

    let org = &profile.org_name;
    let options = [
        format!("I'm here to assist you with anything related to {}. Ask away!", org),
        format!(
            "You can ask me about our work, services, training, or anything else about the {}.",
            profile.org_type
        ),
        format!("Happy to help with queries about {}. What would you like to know?", org),
        "Feel free to explore topics like our expertise, projects, or team. How can I assist?"
            .to_string(),
    ];
    options.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input() {
        assert!(is_valid_input("hello"));
        assert!(!is_valid_input("   \n"));
    }

    #[test]
    fn test_greeting_matches_whole_words() {
        assert_eq!(
            small_talk("Hey there", "Infi").unwrap(),
            "Hello! I'm Infi. How can I help you today?"
        );
        assert!(small_talk("this is a question about history", "Infi").is_none());
    }

    #[test]
    fn test_small_talk_variants() {
        let reply = small_talk("how are you doing?", "Infi").unwrap();
        assert!(reply.starts_with("I'm"));

        assert!(small_talk("Awesome", "Infi").is_some());
        assert!(small_talk("awesome work", "Infi").is_none());

        let reply = small_talk("thanks a lot", "Infi").unwrap();
        assert!(reply == "You're welcome!" || reply == "Happy to help!");

        assert_eq!(
            small_talk("ok bye", "Infi").unwrap(),
            "Goodbye! Have a great day!"
        );
    }

    #[test]
    fn test_identity() {
        let profile = BotProfile::indeed();
        assert_eq!(
            identity("What is your name?", &profile).unwrap(),
            "My name is Infi. What would you like to know about Indeed Inspiring Infotech today?"
        );
        assert_eq!(
            identity("who are you", &profile).unwrap(),
            "I'm Infi, the digital assistant for Indeed Inspiring Infotech. I can tell you about \
             our work in AI solutions, web development, digital transformation."
        );
        assert!(identity("where are you located", &profile).is_none());
    }

    #[test]
    fn test_meta_question() {
        let profile = BotProfile::gmtt();
        assert!(meta_question("What can I ask you?", &profile).is_some());
        assert!(meta_question("How do trees grow?", &profile).is_none());
    }
}
