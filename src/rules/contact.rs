//! Contact requests and contact-detail submissions

use std::sync::LazyLock;

use regex::Regex;

/// Phrase in the contact reply that marks a pending request for details
pub const PENDING_DETAILS_MARKER: &str = "please tell me your name";

const CONTACT_KEYWORDS: &[&str] = &[
    "contact",
    "connect",
    "reach out",
    "talk to someone",
    "email",
    "phone",
    "number",
    "speak with",
];

const INFO_KEYWORDS: &[&str] = &[
    "my name is",
    "i am",
    "email is",
    "contact is",
    "you can reach me at",
    "my number is",
];

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:my name is|i am|name is)\s+([A-Za-z ]+)").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap());

/// Whether the user wants to get in touch
pub fn is_contact_request(input: &str) -> bool {
    let msg = input.to_lowercase();
    CONTACT_KEYWORDS.iter().any(|k| msg.contains(k))
}

/// Whether the user is sharing their own details
pub fn is_info_request(input: &str) -> bool {
    let msg = input.to_lowercase();
    INFO_KEYWORDS.iter().any(|k| msg.contains(k))
}

pub fn contact_request_reply(contact_email: &str) -> String {
    format!(
        "Please share your query/feedback/message with me and I'll forward it to our team at {}. \
         Could you please tell me your name and email address?",
        contact_email
    )
}

pub fn info_statement_reply(contact_email: &str) -> String {
    format!(
        "Thank you for sharing your details! I've noted your information and will share it \
         with our team at {}. Is there anything specific you'd like us to know?",
        contact_email
    )
}

/// Details extracted from a contact submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub fn extract_details(input: &str) -> ContactDetails {
    let name = NAME_RE
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty());
    let email = EMAIL_RE
        .find(&input.to_lowercase())
        .map(|m| m.as_str().to_string());
    ContactDetails { name, email }
}

/// Acknowledge the details a user sent after being asked for them
pub fn info_submission_reply(input: &str, contact_email: &str) -> String {
    let details = extract_details(input);
    let mut parts = Vec::new();

    if let Some(name) = &details.name {
        parts.push(format!("Thank you {}!", name));
    }
    if details.email.is_some() {
        parts.push("I've noted your email address.".to_string());
    }
    if parts.is_empty() {
        parts.push("Thank you for sharing your details!".to_string());
    }
    parts.push(format!(
        "I'll share your information with our team at {}. We'll get back to you soon. \
         Is there anything else I can help with?",
        contact_email
    ));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_and_info_detection() {
        assert!(is_contact_request("How can I CONTACT your team?"));
        assert!(is_contact_request("I want to speak with someone"));
        assert!(!is_contact_request("What do you do?"));

        assert!(is_info_request("My name is Asha"));
        assert!(is_info_request("you can reach me at a@b.com"));
        assert!(!is_info_request("Tell me about trees"));
    }

    #[test]
    fn test_contact_reply_asks_for_details() {
        let reply = contact_request_reply("team@example.org");
        assert!(reply.contains("team@example.org"));
        assert!(reply.to_lowercase().contains(PENDING_DETAILS_MARKER));
    }

    #[test]
    fn test_extract_details() {
        let details = extract_details("Hi, my name is Asha Rao, Asha@Example.com");
        assert_eq!(details.name.as_deref(), Some("Asha Rao"));
        assert_eq!(details.email.as_deref(), Some("asha@example.com"));

        assert_eq!(extract_details("nothing here"), ContactDetails::default());
    }

    #[test]
    fn test_info_submission_reply() {
        let reply = info_submission_reply("I am Ravi, ravi@example.com", "team@example.org");
        assert!(reply.starts_with("Thank you Ravi! I've noted your email address. "));
        assert!(reply.ends_with("Is there anything else I can help with?"));

        let reply = info_submission_reply("123", "team@example.org");
        assert!(reply.starts_with("Thank you for sharing your details! I'll share"));
    }
}
