//! Organisation assistant: cascade, polishing and session history

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{info, instrument, warn};

use super::BotProfile;
use crate::cascade::{
    Cascade, ContentHandler, FaqHandler, FaqStrategy, GroundedAnswer, LlmFallback, Query, Reply,
    handlers,
};
use crate::config::{PolishMode, Settings};
use crate::conversation::Polisher;
use crate::crawler::storage::{SiteIndex, Storage};
use crate::db::Database;
use crate::history::{HistoryStore, Turn};
use crate::knowledge::KnowledgeBase;
use crate::llm::{FallbackChain, SharedCompletion};
use crate::matcher::MatchStrategy;
use crate::rules::{self, INVALID_INPUT_REPLY, PENDING_DETAILS_MARKER};

/// Reply used when no handler answers
pub const NO_ANSWER_REPLY: &str =
    "I couldn't find specific information about that. Could you rephrase your question or ask about something else?";

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Assistant speaking for one organisation
pub struct OrgAssistant {
    profile: BotProfile,
    cascade: Cascade,
    polisher: Polisher,
    history: HistoryStore,
    clock: Clock,
}

impl OrgAssistant {
    pub fn builder(profile: BotProfile) -> OrgAssistantBuilder {
        OrgAssistantBuilder::new(profile)
    }

    /// Assistant wired from settings: knowledge file, cached site content
    /// and the configured completion backends
    pub async fn from_settings(profile: BotProfile, settings: &Settings) -> crate::Result<Self> {
        let kind = profile.kind;
        let knowledge = KnowledgeBase::load(settings.knowledge_path(kind)).with_org_defaults(&profile);

        let mut builder = OrgAssistant::builder(profile)
            .knowledge(knowledge)
            .history(HistoryStore::new(settings.history_path(kind)))
            .polish(settings.polish)
            .match_strategy(settings.matcher);

        let storage = Storage::new(settings.crawl_dir());
        match storage.load(&builder.profile.website).await {
            Ok(Some(index)) => builder = builder.site_index(index),
            Ok(None) => info!("No crawled content for {}", builder.profile.website),
            Err(e) => warn!("Ignoring unreadable crawled content: {}", e),
        }

        if settings.has_llm() {
            let chain = FallbackChain::from_settings(settings).map_err(crate::Error::from)?;
            builder = builder.llm(Arc::new(chain));
        }
        Ok(builder.build())
    }

    pub fn profile(&self) -> &BotProfile {
        &self.profile
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Answer one user message and record the turn
    #[instrument(skip(self), fields(bot = %self.profile.kind))]
    pub async fn respond(&self, input: &str, user: Option<&str>) -> crate::Result<Reply> {
        if !rules::is_valid_input(input) {
            return Ok(Reply::new(INVALID_INPUT_REPLY, "invalid_input"));
        }

        let history = self.history.load().await;
        let awaiting_details = history
            .last()
            .is_some_and(|turn| turn.bot.to_lowercase().contains(PENDING_DETAILS_MARKER));
        if awaiting_details {
            info!(handler = "info_submission", "Response found");
            let reply = rules::info_submission_reply(input, &self.profile.contact_email);
            // Recording the turn clears the pending details question
            if let Err(e) = self.history.append(Turn::new(input, reply.clone())).await {
                warn!("Failed to record turn: {}", e);
            }
            return Ok(Reply::new(reply, "info_submission"));
        }

        let query = Query::new(input, &history, (self.clock)()).with_user(user);
        let reply = self
            .cascade
            .respond(&query)
            .await
            .unwrap_or_else(|| Reply::new(NO_ANSWER_REPLY, crate::cascade::FALLBACK_HANDLER));

        let polished = self.polisher.finalize(input, &reply.text, &history).await;
        if let Err(e) = self.history.append(Turn::new(input, polished.clone())).await {
            warn!("Failed to record turn: {}", e);
        }

        Ok(Reply::new(
            self.polisher.keep_moving(&polished, &history),
            reply.handler,
        ))
    }

    /// Store the current session history in the archive database
    pub async fn archive(&self, db: &Database, user: Option<&str>) -> crate::Result<Option<String>> {
        let history: Vec<Turn> = self.history.load().await;
        if history.is_empty() {
            return Ok(None);
        }
        let session_id = db.store_session(&history, user, self.profile.kind).await?;
        Ok(Some(session_id))
    }
}

/// Builder for [`OrgAssistant`]
pub struct OrgAssistantBuilder {
    profile: BotProfile,
    knowledge: Option<KnowledgeBase>,
    site: Option<SiteIndex>,
    llm: Option<SharedCompletion>,
    history: Option<HistoryStore>,
    polish: PolishMode,
    strategy: MatchStrategy,
    clock: Option<Clock>,
}

impl OrgAssistantBuilder {
    pub fn new(profile: BotProfile) -> Self {
        Self {
            profile,
            knowledge: None,
            site: None,
            llm: None,
            history: None,
            polish: PolishMode::default(),
            strategy: MatchStrategy::default(),
            clock: None,
        }
    }

    pub fn knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn site_index(mut self, site: SiteIndex) -> Self {
        self.site = Some(site);
        self
    }

    pub fn llm(mut self, llm: SharedCompletion) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn polish(mut self, polish: PolishMode) -> Self {
        self.polish = polish;
        self
    }

    pub fn match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Clock used by the date and greeting rules
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// The default handler order
    fn cascade(&self, knowledge: &Arc<KnowledgeBase>, site: Option<&Arc<SiteIndex>>) -> Cascade {
        let profile = &self.profile;
        let mut cascade = Cascade::new()
            .with(handlers::identity(profile))
            .with(FaqHandler::new(knowledge.clone(), FaqStrategy::Trigger))
            .with(FaqHandler::new(knowledge.clone(), FaqStrategy::Keyword))
            .with(FaqHandler::new(knowledge.clone(), FaqStrategy::Fuzzy))
            .with(handlers::meta(profile))
            .with(handlers::time_greeting())
            .with(handlers::date())
            .with(handlers::small_talk(&profile.assistant_name));

        if let Some(site) = site {
            cascade = cascade.with(ContentHandler::new(self.strategy.matcher(site)));
        }
        cascade = cascade.with(handlers::contact(&profile.contact_email));

        if let Some(llm) = &self.llm {
            cascade = cascade.with(GroundedAnswer::new(knowledge.clone(), llm.clone(), profile));
            let mut fallback = LlmFallback::new(llm.clone(), profile).with_knowledge(knowledge.clone());
            if let Some(site) = site {
                fallback = fallback.with_site(site.clone());
            }
            cascade = cascade.with(fallback);
        }
        cascade.with_fallback(NO_ANSWER_REPLY)
    }

    pub fn build(self) -> OrgAssistant {
        let knowledge = Arc::new(self.knowledge.clone().unwrap_or_default());
        let site = self.site.clone().map(Arc::new);
        let cascade = self.cascade(&knowledge, site.as_ref());

        let mut polisher = Polisher::new(self.profile.drivers.clone());
        if let (PolishMode::Llm, Some(llm)) = (self.polish, &self.llm) {
            polisher = polisher.with_llm(llm.clone());
        }

        let history = self
            .history
            .unwrap_or_else(|| HistoryStore::new(Settings::default().history_path(self.profile.kind)));

        OrgAssistant {
            profile: self.profile,
            cascade,
            polisher,
            history,
            clock: self.clock.unwrap_or_else(|| Arc::new(|| Local::now().naive_local())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::tests::noon;
    use crate::knowledge::FaqEntry;
    use crate::llm::MockCompletion;
    use tempfile::TempDir;

    fn assistant(dir: &TempDir, profile: BotProfile) -> OrgAssistantBuilder {
        OrgAssistant::builder(profile.clone())
            .knowledge(KnowledgeBase::default().with_org_defaults(&profile))
            .history(HistoryStore::new(dir.path().join("history.json")))
            .clock(noon)
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let bot = assistant(&dir, BotProfile::gmtt()).build();

        let reply = bot.respond("   ", None).await.unwrap();
        assert_eq!(reply.text, INVALID_INPUT_REPLY);
        assert!(bot.history().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_handler_order_without_llm() {
        let dir = TempDir::new().unwrap();
        let bot = assistant(&dir, BotProfile::indeed()).build();
        assert_eq!(
            bot.cascade().handler_names(),
            vec![
                "identity",
                "faq_trigger",
                "faq_keyword",
                "faq_fuzzy",
                "meta",
                "time_greeting",
                "date",
                "small_talk",
                "contact",
            ]
        );

        let site = SiteIndex::new("https://indeedinspiring.com", Vec::new());
        let llm = Arc::new(MockCompletion::always("ok"));
        let bot = assistant(&dir, BotProfile::indeed())
            .site_index(site)
            .llm(llm)
            .build();
        let names = bot.cascade().handler_names();
        assert_eq!(&names[8..], &["content", "contact", "knowledge_llm", "llm_fallback"]);
    }

    #[tokio::test]
    async fn test_identity_reply_is_recorded() {
        let dir = TempDir::new().unwrap();
        let bot = assistant(&dir, BotProfile::gmtt()).build();

        let reply = bot.respond("What is your name?", Some("asha")).await.unwrap();
        assert_eq!(reply.handler, "identity");
        assert_eq!(
            reply.text,
            "My name is TreeBot. What would you like to know about Give Me Trees Foundation today?"
        );

        let history = bot.history().load().await;
        assert_eq!(history, vec![Turn::new("What is your name?", reply.text.clone())]);

        let again = bot.respond("what is your name?", None).await.unwrap();
        assert_eq!(
            again.text,
            "Returning to your question, my name is treebot. what would you like to know about give me trees foundation today?"
        );
    }

    #[tokio::test]
    async fn test_faq_answer_gets_a_driver() {
        let dir = TempDir::new().unwrap();
        let profile = BotProfile::gmtt();
        let knowledge = KnowledgeBase::new(vec![
            FaqEntry::new("How do I volunteer?", vec!["Fill in the form on our site.".into()])
                .with_triggers(["volunteer"]),
        ]);
        let bot = OrgAssistant::builder(profile.clone())
            .knowledge(knowledge)
            .history(HistoryStore::new(dir.path().join("history.json")))
            .clock(noon)
            .build();

        let reply = bot.respond("Can I volunteer?", None).await.unwrap();
        assert_eq!(reply.handler, "faq_trigger");
        assert!(reply.text.starts_with("Fill in the form on our site. "));
        assert!(profile.drivers.intro.iter().any(|d| reply.text.ends_with(d.as_str())));
    }

    #[tokio::test]
    async fn test_pending_contact_details() {
        let dir = TempDir::new().unwrap();
        let bot = assistant(&dir, BotProfile::indeed()).build();

        let reply = bot.respond("I want to talk to someone", None).await.unwrap();
        assert_eq!(reply.handler, "contact");

        let reply = bot
            .respond("my name is Asha Rao, asha@example.com", None)
            .await
            .unwrap();
        assert_eq!(reply.handler, "info_submission");
        assert!(reply.text.contains("Asha Rao"));

        let history = bot.history().load().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].user, "my name is Asha Rao, asha@example.com");

        let reply = bot.respond("What is your name?", None).await.unwrap();
        assert_eq!(reply.handler, "identity");
        assert!(reply.text.starts_with("My name is Infi."));
    }

    #[tokio::test]
    async fn test_llm_fallback_and_no_answer() {
        let dir = TempDir::new().unwrap();
        let bot = assistant(&dir, BotProfile::indeed()).build();
        let reply = bot.respond("zzzz qqqq", None).await.unwrap();
        assert_eq!(reply.handler, "fallback");
        assert!(reply.text.starts_with(NO_ANSWER_REPLY));

        let dir = TempDir::new().unwrap();
        let llm = Arc::new(MockCompletion::always("We can help with that!"));
        let bot = assistant(&dir, BotProfile::indeed()).llm(llm).build();
        let reply = bot.respond("zzzz qqqq", None).await.unwrap();
        assert_eq!(reply.handler, "llm_fallback");
        assert_eq!(reply.text, "We can help with that!");
    }

    #[tokio::test]
    async fn test_archive_session() {
        let dir = TempDir::new().unwrap();
        let bot = assistant(&dir, BotProfile::gmtt()).build();
        let db = Database::open_in_memory().await.unwrap();

        assert!(bot.archive(&db, None).await.unwrap().is_none());

        bot.respond("What is your name?", None).await.unwrap();
        let session_id = bot.archive(&db, Some("asha")).await.unwrap().unwrap();
        let turns = db.session(&session_id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].chatbot_type, "gmtt");
    }
}
