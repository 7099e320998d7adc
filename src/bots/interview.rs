//! Timed technical interview driven by a completion backend

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::llm::{CompletionRequest, LlmError, SharedCompletion};

/// Remaining time below which the interview starts wrapping up
pub const WRAP_UP_THRESHOLD: Duration = Duration::from_secs(120);

const WRAP_UP_NOTE: &str = "[NOTE: Wrapping up the interview.]";

const OPENING_LINE: &str =
    "Interviewer: Hello, thank you for joining the interview today. Let's begin. Can you briefly introduce yourself?";

const FOLLOW_UP_INSTRUCTION: &str = "Ask relevant follow-up questions based on the candidate's \
previous answers, job description, and resume summary. Ensure the conversation flows naturally \
and builds on previous responses.";

const INTERVIEWER_SYSTEM: &str = "You are a professional interview bot conducting technical interviews.";

static JSON_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").unwrap());

/// Interview difficulty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterviewLevel {
    #[default]
    Easy,
    Moderate,
    Experienced,
}

impl InterviewLevel {
    pub fn duration(self) -> Duration {
        let minutes = match self {
            InterviewLevel::Easy => 5,
            InterviewLevel::Moderate => 10,
            InterviewLevel::Experienced => 15,
        };
        Duration::from_secs(minutes * 60)
    }

    fn instructions(self) -> &'static str {
        match self {
            InterviewLevel::Easy => "Ask basic, beginner-friendly interview questions.",
            InterviewLevel::Moderate => {
                "Ask intermediate-level questions focusing on understanding and practical experience."
            }
            InterviewLevel::Experienced => {
                "Ask advanced-level questions about architecture, decision-making, and deep technical topics."
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            InterviewLevel::Easy => "easy",
            InterviewLevel::Moderate => "moderate",
            InterviewLevel::Experienced => "experienced",
        }
    }
}

/// Scores for one answer, each 0 to 5
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub relevance: f32,
    #[serde(default)]
    pub technical_correctness: f32,
    #[serde(default)]
    pub clarity: f32,
    #[serde(default)]
    pub comment: String,
}

impl Evaluation {
    /// Zero scores used when the evaluator reply is unusable
    pub fn unavailable() -> Self {
        Self {
            relevance: 0.0,
            technical_correctness: 0.0,
            clarity: 0.0,
            comment: "Could not evaluate.".to_string(),
        }
    }
}

/// Read the first `{...}` object in an evaluator reply
pub fn parse_evaluation(raw: &str) -> Evaluation {
    JSON_OBJECT_RE
        .find(raw)
        .and_then(|m| serde_json::from_str(m.as_str()).ok())
        .unwrap_or_else(Evaluation::unavailable)
}

/// First non-empty line of a generated reply
pub fn first_line(text: &str) -> String {
    text.trim()
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .unwrap_or_default()
}

/// Condense a resume into a short summary for question generation
pub async fn summarize_resume(llm: &SharedCompletion, resume_text: &str) -> Result<String, LlmError> {
    let request = CompletionRequest::new(format!(
        "Summarize this resume focusing on key skills, experience, and tools used. \
         Write a brief, structured summary:\n{}\nReturn summary:",
        resume_text
    ))
    .with_system(INTERVIEWER_SYSTEM)
    .with_max_tokens(120);

    let summary = llm.complete(&request).await?;
    Ok(summary
        .rsplit("Return summary:")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// A question with the candidate's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
}

/// An answered question with its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedAnswer {
    pub question: String,
    pub answer: String,
    pub evaluation: Evaluation,
}

/// Outcome of submitting an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewStep {
    /// `None` when the interviewer has nothing more to ask
    pub next_question: Option<String>,
    /// Set on the answer that started the wrap-up phase
    pub wrap_up_started: bool,
}

/// One running interview
pub struct InterviewSession {
    llm: SharedCompletion,
    level: InterviewLevel,
    job_description: String,
    resume_summary: String,
    transcript: String,
    log: Vec<AnsweredQuestion>,
    current_question: Option<String>,
    deadline: Instant,
    wrapping_up: bool,
}

impl InterviewSession {
    pub fn new(llm: SharedCompletion, level: InterviewLevel) -> Self {
        Self {
            llm,
            level,
            job_description: "Job description not available".to_string(),
            resume_summary: "Resume not available".to_string(),
            transcript: OPENING_LINE.to_string(),
            log: Vec::new(),
            current_question: None,
            deadline: Instant::now() + level.duration(),
            wrapping_up: false,
        }
    }

    pub fn with_job_description(mut self, job_description: impl Into<String>) -> Self {
        self.job_description = job_description.into();
        self
    }

    pub fn with_resume_summary(mut self, resume_summary: impl Into<String>) -> Self {
        self.resume_summary = resume_summary.into();
        self
    }

    /// Override the level's time limit, counted from now
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.deadline = Instant::now() + duration;
        self
    }

    pub fn level(&self) -> InterviewLevel {
        self.level
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_over(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn is_wrapping_up(&self) -> bool {
        self.wrapping_up
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    pub fn answers(&self) -> &[AnsweredQuestion] {
        &self.log
    }

    fn question_prompt(&self) -> String {
        format!(
            "You are a professional interviewer AI conducting a {level} level job interview.\n\n\
             Context:\nJob Description: {job}\nCandidate Resume Summary: {resume}\n\n\
             Rules:\n\
             - Ask one question at a time.\n\
             - Wait for the candidate's answer before continuing.\n\
             - Ask questions based on the job description and the candidate's resume.\n\
             - {instructions}\n\
             - {follow_up}\n\
             - Total interview time: {minutes} minutes. As time runs out, close naturally.\n\
             - Your role is only the interviewer. Never answer as the candidate.\n\n\
             Conversation so far:\n{transcript}\n\nInterviewer:",
            level = self.level.label(),
            job = self.job_description,
            resume = self.resume_summary,
            instructions = self.level.instructions(),
            follow_up = FOLLOW_UP_INSTRUCTION,
            minutes = self.level.duration().as_secs() / 60,
            transcript = self.transcript,
        )
    }

    async fn next_question(&mut self) -> Result<Option<String>, LlmError> {
        let request = CompletionRequest::new(self.question_prompt())
            .with_system(INTERVIEWER_SYSTEM)
            .with_max_tokens(200);
        let question = first_line(&self.llm.complete(&request).await?);

        if question.is_empty() {
            self.current_question = None;
            return Ok(None);
        }
        self.transcript.push_str(&format!("\nInterviewer: {}", question));
        self.current_question = Some(question.clone());
        Ok(Some(question))
    }

    /// Generate the first question
    #[instrument(skip(self), fields(level = self.level.label()))]
    pub async fn start(&mut self) -> Result<Option<String>, LlmError> {
        info!("Starting interview");
        self.next_question().await
    }

    /// Record the answer to the current question and ask the next one
    #[instrument(skip(self, answer))]
    pub async fn answer(&mut self, answer: &str) -> Result<InterviewStep, LlmError> {
        let mut wrap_up_started = false;
        if !self.wrapping_up && self.remaining() < WRAP_UP_THRESHOLD {
            debug!("Entering wrap-up phase");
            self.transcript.push('\n');
            self.transcript.push_str(WRAP_UP_NOTE);
            self.wrapping_up = true;
            wrap_up_started = true;
        }

        self.transcript.push_str(&format!("\nCandidate: {}", answer));
        if let Some(question) = &self.current_question {
            self.log.push(AnsweredQuestion {
                question: question.clone(),
                answer: answer.to_string(),
            });
        }

        let next_question = self.next_question().await?;
        Ok(InterviewStep {
            next_question,
            wrap_up_started,
        })
    }

    async fn evaluate_one(&self, item: &AnsweredQuestion) -> EvaluatedAnswer {
        let request = CompletionRequest::new(format!(
            "You are an interview evaluator. Only respond with a JSON object.\n\n\
             Evaluate this answer:\nQuestion: {}\nAnswer: {}\n\n\
             Return format:\n{{\n  \"relevance\": 0-5,\n  \"technical_correctness\": 0-5,\n  \
             \"clarity\": 0-5,\n  \"comment\": \"short feedback\"\n}}",
            item.question, item.answer
        ))
        .with_system(INTERVIEWER_SYSTEM)
        .with_max_tokens(150);

        let evaluation = match self.llm.complete(&request).await {
            Ok(raw) => parse_evaluation(&raw),
            Err(e) => {
                warn!("Evaluation failed: {}", e);
                Evaluation::unavailable()
            }
        };
        EvaluatedAnswer {
            question: item.question.clone(),
            answer: item.answer.clone(),
            evaluation,
        }
    }

    /// Score every recorded answer
    #[instrument(skip(self), fields(answers = self.log.len()))]
    pub async fn evaluate(&self) -> Vec<EvaluatedAnswer> {
        join_all(self.log.iter().map(|item| self.evaluate_one(item))).await
    }
}

/// Markdown report with per-question scores and averages
pub fn render_report(evaluations: &[EvaluatedAnswer]) -> String {
    let mut report = String::from("# Interview Report\n");

    for (i, item) in evaluations.iter().enumerate() {
        let e = &item.evaluation;
        report.push_str(&format!(
            "\n## Q{}: {}\n\nAnswer: {}\n\nRelevance: {}, Technical: {}, Clarity: {}\n\nComment: {}\n",
            i + 1,
            item.question,
            item.answer,
            e.relevance,
            e.technical_correctness,
            e.clarity,
            e.comment
        ));
    }

    if !evaluations.is_empty() {
        let n = evaluations.len() as f32;
        let avg = |f: fn(&Evaluation) -> f32| evaluations.iter().map(|i| f(&i.evaluation)).sum::<f32>() / n;
        report.push_str(&format!(
            "\n## Average Scores\n\nRelevance: {:.2}, Technical: {:.2}, Clarity: {:.2}\n",
            avg(|e| e.relevance),
            avg(|e| e.technical_correctness),
            avg(|e| e.clarity)
        ));
    }
    report
}

/// Write the report, creating parent directories
pub async fn save_report(evaluations: &[EvaluatedAnswer], path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, render_report(evaluations)).await?;
    info!("Interview report saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletion;
    use std::sync::Arc;

    #[test]
    fn test_level_durations() {
        assert_eq!(InterviewLevel::Easy.duration(), Duration::from_secs(300));
        assert_eq!(InterviewLevel::Moderate.duration(), Duration::from_secs(600));
        assert_eq!(InterviewLevel::Experienced.duration(), Duration::from_secs(900));
    }

    #[test]
    fn test_parse_evaluation() {
        let raw = "Sure! {\"relevance\": 4, \"technical_correctness\": 3,\n\"clarity\": 5, \"comment\": \"Good\"} {\"x\": 1}";
        let e = parse_evaluation(raw);
        assert_eq!(e.relevance, 4.0);
        assert_eq!(e.clarity, 5.0);
        assert_eq!(e.comment, "Good");

        assert_eq!(parse_evaluation("no json here"), Evaluation::unavailable());
        assert_eq!(parse_evaluation("{relevance: high}"), Evaluation::unavailable());
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  What is Rust?\nCandidate: ..."), "What is Rust?");
        assert_eq!(first_line("   "), "");
    }

    #[tokio::test]
    async fn test_interview_flow() {
        let llm = Arc::new(
            MockCompletion::new()
                .reply("Tell me about your last project.\nCandidate: I built...")
                .reply("How did you test it?")
                .reply("")
                .reply(r#"{"relevance": 5, "technical_correctness": 4, "clarity": 3, "comment": "Solid"}"#)
                .reply("not json"),
        );
        let mut session = InterviewSession::new(llm.clone(), InterviewLevel::Moderate)
            .with_job_description("Rust developer")
            .with_resume_summary("Five years of backend work");

        let first = session.start().await.unwrap();
        assert_eq!(first.as_deref(), Some("Tell me about your last project."));

        let step = session.answer("A crawler in Rust").await.unwrap();
        assert_eq!(step.next_question.as_deref(), Some("How did you test it?"));
        assert!(!step.wrap_up_started);

        let step = session.answer("With mockito").await.unwrap();
        assert!(step.next_question.is_none());
        assert_eq!(session.answers().len(), 2);
        assert_eq!(session.answers()[1].question, "How did you test it?");

        let prompts = llm.prompts();
        assert!(prompts[0].contains("Rust developer"));
        assert!(prompts[0].contains("intermediate-level"));
        assert!(prompts[2].contains("Candidate: With mockito"));

        let evaluations = session.evaluate().await;
        assert_eq!(evaluations.len(), 2);
        let comments: Vec<&str> = evaluations.iter().map(|e| e.evaluation.comment.as_str()).collect();
        assert!(comments.contains(&"Solid"));
        assert!(comments.contains(&"Could not evaluate."));
    }

    #[tokio::test]
    async fn test_wrap_up_is_announced_once() {
        let llm = Arc::new(MockCompletion::always("Any final thoughts?"));
        let mut session = InterviewSession::new(llm.clone(), InterviewLevel::Easy)
            .with_duration(Duration::from_secs(60));

        session.start().await.unwrap();
        assert!(session.answer("Yes").await.unwrap().wrap_up_started);
        assert!(!session.answer("No").await.unwrap().wrap_up_started);
        assert!(session.is_wrapping_up());
        assert!(llm.prompts().last().unwrap().contains(WRAP_UP_NOTE));
    }

    #[tokio::test]
    async fn test_summarize_resume() {
        let llm: SharedCompletion =
            Arc::new(MockCompletion::new().reply("Return summary: Rust, Python, 5 years"));
        assert_eq!(
            summarize_resume(&llm, "resume").await.unwrap(),
            "Rust, Python, 5 years"
        );
    }

    #[test]
    fn test_render_report() {
        let evaluations = vec![
            EvaluatedAnswer {
                question: "Q one".into(),
                answer: "A one".into(),
                evaluation: Evaluation {
                    relevance: 4.0,
                    technical_correctness: 3.0,
                    clarity: 5.0,
                    comment: "Good".into(),
                },
            },
            EvaluatedAnswer {
                question: "Q two".into(),
                answer: "A two".into(),
                evaluation: Evaluation::unavailable(),
            },
        ];

        let report = render_report(&evaluations);
        assert!(report.starts_with("# Interview Report\n"));
        assert!(report.contains("## Q1: Q one"));
        assert!(report.contains("Relevance: 4, Technical: 3, Clarity: 5"));
        assert!(report.contains("Relevance: 2.00, Technical: 1.50, Clarity: 2.50"));
        assert_eq!(render_report(&[]), "# Interview Report\n");
    }
}
