//! Handlers that generate answers with a completion backend

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{Handler, Query};
use crate::bots::BotProfile;
use crate::conversation::clean_response;
use crate::crawler::storage::SiteIndex;
use crate::knowledge::KnowledgeBase;
use crate::llm::{CompletionRequest, SharedCompletion, ask_yes_no};

/// Pages of crawled content included in fallback prompts
const SITE_CONTEXT_PAGES: usize = 3;

/// Characters of page text per page in fallback prompts
const SITE_CONTEXT_CHARS: usize = 200;

/// Characters of the about page used when expanding a follow-up topic
const TOPIC_CONTEXT_CHARS: usize = 500;

/// Answers from the knowledge base text when the query resembles a known
/// question closely enough
pub struct GroundedAnswer {
    knowledge: Arc<KnowledgeBase>,
    llm: SharedCompletion,
    org_name: String,
    min_similarity: f64,
}

impl GroundedAnswer {
    pub const DEFAULT_MIN_SIMILARITY: f64 = 0.6;

    pub fn new(knowledge: Arc<KnowledgeBase>, llm: SharedCompletion, profile: &BotProfile) -> Self {
        Self {
            knowledge,
            llm,
            org_name: profile.org_name.clone(),
            min_similarity: Self::DEFAULT_MIN_SIMILARITY,
        }
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    fn prompt(&self, input: &str) -> String {
        format!(
            "You are a helpful assistant representing {org}.\n\
             Use only the information below. Speak as \"we\". If the answer is not there, \
             say so, explain what you can share and suggest a related topic. \
             Keep it conversational.\n\n\
             Available information:\n{context}\n\
             User question: {input}\n\
             Helpful response:",
            org = self.org_name,
            context = self.knowledge.context(),
            input = input,
        )
    }
}

/// Point users somewhere useful when the model admits it lacks the answer,
/// and make sure the reply ends like a sentence
fn complete_grounded(response: String, input: &str) -> String {
    let mut response = response;
    let lower = response.to_lowercase();
    if lower.contains("not provided") || lower.contains("not available") {
        let related: &[&str] = if input.contains("location") {
            &["our services", "contact information", "working regions"]
        } else if input.contains("service") {
            &["our expertise", "technologies we use", "client industries"]
        } else {
            &[]
        };

        match related {
            [rest @ .., last] if !rest.is_empty() => {
                response.push_str(&format!(
                    " However, I can tell you about {} or {}.",
                    rest.join(", "),
                    last
                ));
            }
            _ => response
                .push_str(" Would you like information about our services, team, or something else?"),
        }
    }

    if !response.ends_with(['.', '!', '?']) {
        response.push('.');
    }
    response
}

#[async_trait]
impl Handler for GroundedAnswer {
    fn name(&self) -> &str {
        "knowledge_llm"
    }

    #[instrument(skip_all)]
    async fn respond(&self, query: &Query<'_>) -> crate::Result<Option<String>> {
        let score = self.knowledge.best_similarity(&query.normalized);
        if score <= self.min_similarity {
            debug!(score, "Query not close enough to the knowledge base");
            return Ok(None);
        }

        let request = CompletionRequest::new(self.prompt(query.text)).with_max_tokens(100);
        match self.llm.complete(&request).await {
            Ok(response) => {
                let cleaned = clean_response(&response);
                if cleaned.is_empty() {
                    return Ok(None);
                }
                Ok(Some(complete_grounded(cleaned, &query.normalized)))
            }
            Err(e) => {
                warn!("Knowledge-grounded answer failed: {}", e);
                Ok(None)
            }
        }
    }
}

/// Open-ended answers speaking for the organisation
///
/// When the previous reply asked a follow-up question and the user agreed,
/// the topic of that question is expanded instead.
pub struct LlmFallback {
    llm: SharedCompletion,
    profile: BotProfile,
    knowledge: Option<Arc<KnowledgeBase>>,
    site: Option<Arc<SiteIndex>>,
}

impl LlmFallback {
    pub fn new(llm: SharedCompletion, profile: &BotProfile) -> Self {
        Self {
            llm,
            profile: profile.clone(),
            knowledge: None,
            site: None,
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<KnowledgeBase>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_site(mut self, site: Arc<SiteIndex>) -> Self {
        self.site = Some(site);
        self
    }

    /// Reply shown when the backend cannot be reached
    pub fn unavailable_reply(&self) -> String {
        format!(
            "I'm having trouble accessing that information. Please visit {} for details.",
            self.profile.website
        )
    }

    async fn yes_no(&self, prompt: &str) -> bool {
        ask_yes_no(self.llm.as_ref(), prompt)
            .await
            .unwrap_or_else(|e| {
                warn!("Yes/no classification failed: {}", e);
                false
            })
    }

    fn about_text(&self) -> String {
        let Some(site) = &self.site else {
            return String::new();
        };
        site.iter()
            .find(|page| page.url.contains("about"))
            .or_else(|| site.iter().next())
            .map(|page| page.text.chars().take(TOPIC_CONTEXT_CHARS).collect())
            .unwrap_or_default()
    }

    /// Expand the topic of an accepted follow-up question
    #[instrument(skip_all)]
    async fn follow_up(&self, query: &Query<'_>) -> Option<String> {
        let last_bot = &query.last_turn()?.bot;

        let is_follow_up = self
            .yes_no(&format!(
                "Is the following chatbot message a follow-up question that invites the user \
                 to ask for more, such as \"Would you like to know more?\"\n\n\
                 Chatbot message: \"{}\"\n\nAnswer only with YES or NO.",
                last_bot
            ))
            .await;
        if !is_follow_up {
            return None;
        }

        let agreed = self
            .yes_no(&format!(
                "Does the response agree with the question? Reply only with YES or NO.\n\n\
                 Question: \"{}\"\nResponse: \"{}\"",
                last_bot, query.text
            ))
            .await;
        if !agreed {
            return None;
        }

        let topic_request = CompletionRequest::new(format!(
            "Extract only the main topic from this question: \"{}\"\n\
             Examples: \"Want to know about our AI solutions?\" -> AI solutions; \
             \"Interested in our team?\" -> team\nTopic:",
            last_bot
        ));
        let topic = match self.llm.complete(&topic_request).await {
            Ok(topic) => topic.trim().to_string(),
            Err(e) => {
                warn!("Topic extraction failed: {}", e);
                return None;
            }
        };
        if topic.is_empty() {
            return None;
        }
        debug!(topic = %topic, "Expanding accepted follow-up");

        let detail_request = CompletionRequest::new(format!(
            "As {}'s assistant, give 2-3 key points about {} in a professional but \
             conversational tone and end with a relevant follow-up question.\n\nContext: {}",
            self.profile.org_name,
            topic,
            self.about_text()
        ));
        match self.llm.complete(&detail_request).await {
            Ok(detail) => Some(clean_response(&detail)).filter(|d| !d.is_empty()),
            Err(e) => {
                warn!("Follow-up expansion failed: {}", e);
                None
            }
        }
    }

    fn context(&self, query: &Query<'_>) -> String {
        let profile = &self.profile;
        let mut context = String::new();

        if let Some(knowledge) = &self.knowledge {
            context.push_str(&format!("{} knowledge base:\n{}\n", profile.org_name, knowledge.context()));
        }
        if let Some(site) = &self.site {
            context.push_str("Website content summary:\n");
            for page in site.iter().take(SITE_CONTEXT_PAGES) {
                let excerpt: String = page.text.chars().take(SITE_CONTEXT_CHARS).collect();
                context.push_str(&format!("Page: {}\nKey info: {}...\n\n", page.title, excerpt));
            }
        }

        context.push_str(&format!(
            "Identity: I am {}, the {} assistant. Our {} focuses on {}.",
            profile.assistant_name,
            profile.org_name,
            profile.org_type,
            profile.services.join(", ")
        ));
        if let Some(founder) = &profile.founder {
            context.push_str(&format!(" Founded by {}.", founder));
        }
        context.push_str(&format!(" Website: {}\n", profile.website));

        let recent: Vec<String> = query
            .history
            .iter()
            .rev()
            .take(2)
            .rev()
            .map(|turn| format!("User: {}\nAssistant: {}", turn.user, turn.bot))
            .collect();
        if recent.is_empty() {
            context.push_str("\nConversation history: new conversation\n");
        } else {
            context.push_str(&format!("\nConversation history:\n{}\n", recent.join("\n")));
        }
        context
    }
}

#[async_trait]
impl Handler for LlmFallback {
    fn name(&self) -> &str {
        "llm_fallback"
    }

    #[instrument(skip_all)]
    async fn respond(&self, query: &Query<'_>) -> crate::Result<Option<String>> {
        if let Some(detail) = self.follow_up(query).await {
            return Ok(Some(detail));
        }

        let profile = &self.profile;
        let request = CompletionRequest::new(format!(
            "User query: \"{}\"\n\nContext:\n{}\nAnswer:",
            query.text,
            self.context(query)
        ))
        .with_system(format!(
            "You are {}, the official assistant for {}. Respond as part of the organisation \
             using \"we\" and \"our\". Use only company information, keep answers to one to \
             three sentences and end with a relevant follow-up question. For unknown topics \
             direct the user to {}.",
            profile.assistant_name, profile.org_name, profile.website
        ))
        .with_max_tokens(150);

        match self.llm.complete(&request).await {
            Ok(response) => Ok(Some(clean_response(&response))),
            Err(e) => {
                warn!("Fallback completion failed: {}", e);
                Ok(Some(self.unavailable_reply()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::tests::noon;
    use crate::history::Turn;
    use crate::knowledge::FaqEntry;
    use crate::llm::MockCompletion;

    fn knowledge() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::new(vec![FaqEntry::new(
            "What services do you offer?",
            vec!["We offer AI solutions and web development.".into()],
        )]))
    }

    #[tokio::test]
    async fn test_grounded_answer_requires_similarity() {
        let llm = Arc::new(MockCompletion::always("We offer AI solutions"));
        let handler = GroundedAnswer::new(knowledge(), llm.clone(), &BotProfile::indeed());

        let reply = handler
            .respond(&Query::new("what services do you offer", &[], noon()))
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("We offer AI solutions."));
        assert!(llm.prompts()[0].contains("Q: What services do you offer?"));

        let reply = handler
            .respond(&Query::new("tell me a joke", &[], noon()))
            .await
            .unwrap();
        assert!(reply.is_none());
        assert_eq!(llm.prompts().len(), 1);
    }

    #[test]
    fn test_complete_grounded_suggestions() {
        assert_eq!(
            complete_grounded("That is not provided.".into(), "which service suits me"),
            "That is not provided. However, I can tell you about our expertise, technologies we use or client industries."
        );
        assert_eq!(
            complete_grounded("Not available".into(), "who is your ceo"),
            "Not available Would you like information about our services, team, or something else?"
        );
        assert_eq!(complete_grounded("We do".into(), "x"), "We do.");
    }

    #[tokio::test]
    async fn test_fallback_answers_new_conversations() {
        let llm = Arc::new(MockCompletion::new().reply("answer: we build AI tools. Want a demo?"));
        let handler = LlmFallback::new(llm.clone(), &BotProfile::indeed()).with_knowledge(knowledge());

        let reply = handler
            .respond(&Query::new("what do you build", &[], noon()))
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("We build AI tools. Want a demo?"));

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("new conversation"));
        assert!(prompts[0].contains("Founded by Mr. Kushal Sharma"));
    }

    #[tokio::test]
    async fn test_fallback_expands_accepted_follow_up() {
        let llm = Arc::new(
            MockCompletion::new()
                .reply("YES")
                .reply("YES")
                .reply(" AI solutions \n")
                .reply("We build chatbots and vision systems. Want a case study?"),
        );
        let handler = LlmFallback::new(llm.clone(), &BotProfile::indeed());
        let history = vec![Turn::new("hi", "Would you like to know more about our AI solutions?")];

        let reply = handler
            .respond(&Query::new("yes please", &history, noon()))
            .await
            .unwrap();
        assert_eq!(
            reply.as_deref(),
            Some("We build chatbots and vision systems. Want a case study?")
        );
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[3].contains("key points about AI solutions"));
    }

    #[tokio::test]
    async fn test_fallback_declined_follow_up_answers_normally() {
        let llm = Arc::new(
            MockCompletion::new()
                .reply("YES")
                .reply("NO")
                .reply("Okay, what else can I help with?"),
        );
        let handler = LlmFallback::new(llm.clone(), &BotProfile::gmtt());
        let history = vec![Turn::new("hi", "Want to hear about volunteering?")];

        let reply = handler
            .respond(&Query::new("no thanks", &history, noon()))
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("Okay, what else can I help with?"));
        assert!(llm.prompts()[2].contains("User: hi"));
    }

    #[tokio::test]
    async fn test_fallback_reports_unavailable_backend() {
        let llm = Arc::new(MockCompletion::new().fail("down"));
        let handler = LlmFallback::new(llm, &BotProfile::gmtt());
        let reply = handler
            .respond(&Query::new("anything", &[], noon()))
            .await
            .unwrap();
        assert_eq!(
            reply.as_deref(),
            Some("I'm having trouble accessing that information. Please visit https://www.givemetrees.org for details.")
        );
    }
}
