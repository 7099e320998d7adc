//! Conversation drivers: follow-up prompts that keep a conversation going

use rand::seq::SliceRandom;

use crate::history::Turn;

/// Words in the last user message that signal the conversation is ending
const CLOSING_CUES: &[&str] = &["thank", "bye", "enough"];

/// Follow-up templates used when the last user message mentions a topic
///
/// `{topic}` in a template is replaced by the rule's label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRule {
    pub label: String,
    pub keywords: Vec<String>,
    pub templates: Vec<String>,
}

impl TopicRule {
    pub fn new(label: &str, keywords: &[&str], templates: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            templates: templates.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn matches(&self, message: &str) -> bool {
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }

    fn render(&self) -> Option<String> {
        self.templates
            .choose(&mut rand::thread_rng())
            .map(|t| t.replace("{topic}", &self.label))
    }
}

/// Driver prompts for one assistant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverSet {
    pub intro: Vec<String>,
    pub mid: Vec<String>,
    pub closing: Vec<String>,
    pub topics: Vec<TopicRule>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn pick(options: &[String]) -> Option<String> {
    options.choose(&mut rand::thread_rng()).cloned()
}

impl DriverSet {
    pub fn gmtt() -> Self {
        let topics = ["plant", "tree", "volunteer", "donat", "project"]
            .iter()
            .map(|kw| {
                TopicRule::new(
                    kw,
                    &[kw],
                    &["Would you like more details about our {topic} programs?"],
                )
            })
            .collect();

        Self {
            intro: strings(&[
                "Would you like to know about our current plantation projects?",
                "I can tell you about our volunteer opportunities if you're interested?",
                "Shall I share some success stories from our recent initiatives?",
            ]),
            mid: strings(&[
                "What aspect interests you most: our methodology, impact, or how to get involved?",
                "Would you like details about any specific region we work in?",
                "I could also share some interesting facts about Peepal trees if you'd like?",
            ]),
            closing: strings(&[
                "Before we wrap up, is there anything else you'd like to know?",
                "Would you like me to send you more information via email?",
                "Shall I connect you with our volunteer coordinator?",
            ]),
            topics,
        }
    }

    pub fn indeed() -> Self {
        let tech_focus = [
            "Would you like more details about our {topic} implementations?",
            "I can share some case studies of our {topic} projects if you're interested?",
            "Our {topic} expertise is particularly strong. Would you like to know more?",
        ];

        Self {
            intro: strings(&[
                "Would you like to know about our IT services and solutions?",
                "I can tell you about our technology expertise if you're interested?",
                "Shall I share some of our recent client success stories?",
            ]),
            mid: strings(&[
                "What interests you most: our AI solutions, web development, or digital transformation services?",
                "Would you like details about any specific technology we specialize in?",
                "I could also share information about our team's expertise if you'd like?",
            ]),
            closing: strings(&[
                "Before we finish, is there anything else about Indeed Inspiring Infotech you'd like to know?",
                "Would you like me to connect you with our solutions team?",
                "Should I email you more information about our services?",
            ]),
            topics: vec![
                TopicRule::new("ai", &["ai", "artificial intelligence", "machine learning", "ml"], &tech_focus),
                TopicRule::new("web", &["web", "website", "frontend", "backend"], &tech_focus),
                TopicRule::new("digital", &["digital", "transformation", "dx"], &tech_focus),
                TopicRule::new("cloud", &["cloud", "aws", "azure", "gcp"], &tech_focus),
                TopicRule::new(
                    "business",
                    &["service", "solution", "product", "offer"],
                    &["Would you like to know more about how we tailor solutions for specific industries?"],
                ),
            ],
        }
    }

    pub fn safety() -> Self {
        Self {
            intro: strings(&[
                "Would you like to go over the basic safety rules for your workplace?",
                "I can explain how to report a hazard if you're interested?",
                "Shall I walk you through our emergency procedures?",
            ]),
            mid: strings(&[
                "Would you like to know more about protective equipment?",
                "Is there a specific task you'd like safety guidance for?",
                "Shall I explain what to do in case of a fire?",
            ]),
            closing: strings(&[
                "Before we wrap up, is there anything else about safety you'd like to know?",
                "Would you like a quick recap of today's safety tips?",
            ]),
            topics: vec![
                TopicRule::new(
                    "fire",
                    &["fire", "smoke", "extinguisher"],
                    &["Would you like a refresher on our {topic} safety drill?"],
                ),
                TopicRule::new(
                    "protective equipment",
                    &["ppe", "helmet", "gloves", "goggles"],
                    &["Shall I list the {topic} required for your area?"],
                ),
            ],
        }
    }

    /// Driver for the next reply given the history before the current turn
    pub fn select(&self, history: &[Turn]) -> Option<String> {
        if history.len() < 2 {
            return pick(&self.intro);
        }

        let last = history
            .last()
            .map(|turn| turn.user.to_lowercase())
            .unwrap_or_default();

        if CLOSING_CUES.iter().any(|cue| last.contains(cue)) {
            return pick(&self.closing);
        }
        if history.len() > 4 {
            return pick(&self.mid);
        }
        self.topics
            .iter()
            .find(|rule| rule.matches(&last))
            .and_then(TopicRule::render)
            .or_else(|| pick(&self.mid))
    }

    pub fn mid_driver(&self) -> Option<String> {
        pick(&self.mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(users: &[&str]) -> Vec<Turn> {
        users.iter().map(|u| Turn::new(*u, "ok.")).collect()
    }

    #[test]
    fn test_intro_for_new_conversations() {
        let drivers = DriverSet::gmtt();
        let driver = drivers.select(&history(&["hi"])).unwrap();
        assert!(drivers.intro.contains(&driver));
    }

    #[test]
    fn test_closing_on_thanks() {
        let drivers = DriverSet::gmtt();
        let driver = drivers.select(&history(&["hi", "thanks a lot"])).unwrap();
        assert!(drivers.closing.contains(&driver));
    }

    #[test]
    fn test_mid_after_long_conversation() {
        let drivers = DriverSet::gmtt();
        let driver = drivers
            .select(&history(&["a", "b", "c", "d", "tell me about trees"]))
            .unwrap();
        assert!(drivers.mid.contains(&driver));
    }

    #[test]
    fn test_topic_rules() {
        let drivers = DriverSet::gmtt();
        assert_eq!(
            drivers.select(&history(&["hi", "how do I volunteer?"])).unwrap(),
            "Would you like more details about our volunteer programs?"
        );

        let drivers = DriverSet::indeed();
        let driver = drivers
            .select(&history(&["hi", "do you use machine learning"]))
            .unwrap();
        assert!(driver.contains("ai"));
        assert_eq!(
            drivers.select(&history(&["hi", "what products do you have"])).unwrap(),
            "Would you like to know more about how we tailor solutions for specific industries?"
        );
    }

    #[test]
    fn test_empty_set_has_no_driver() {
        assert!(DriverSet::default().select(&[]).is_none());
    }
}
