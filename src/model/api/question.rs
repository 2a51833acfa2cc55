use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Choice, Question},
};

/// Shown on the index when nothing has been published yet.
pub const NO_POLLS_NOTICE: &str = "No polls are available.";

/// A vote count with the right noun: "0 votes", "1 vote", "2 votes".
pub fn vote_count(votes: u32) -> String {
    if votes == 1 {
        "1 vote".to_string()
    } else {
        format!("{votes} votes")
    }
}

/// A question as listed on the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub was_published_recently: bool,
}

impl QuestionSummary {
    pub fn new(question: Question, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id,
            was_published_recently: question.was_published_recently(now),
            text: question.question.text,
            pub_date: question.question.pub_date,
        }
    }
}

/// The index page: published questions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexView {
    pub latest_question_list: Vec<QuestionSummary>,
    /// Set iff the list is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl From<Vec<QuestionSummary>> for IndexView {
    fn from(latest_question_list: Vec<QuestionSummary>) -> Self {
        let notice = latest_question_list
            .is_empty()
            .then(|| NO_POLLS_NOTICE.to_string());
        Self {
            latest_question_list,
            notice,
        }
    }
}

/// A choice as offered for voting, without its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDescription {
    pub id: ChoiceId,
    pub text: String,
}

impl From<Choice> for ChoiceDescription {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id,
            text: choice.choice.text,
        }
    }
}

/// The detail page: a published question and the choices to vote on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<ChoiceDescription>,
}

impl QuestionDetail {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            id: question.id,
            text: question.question.text,
            pub_date: question.question.pub_date,
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

/// A choice with its tally, plus the tally rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub id: ChoiceId,
    pub text: String,
    pub votes: u32,
    /// `"<text> -- <votes> vote(s)"`.
    pub summary: String,
}

impl From<Choice> for ChoiceResult {
    fn from(choice: Choice) -> Self {
        let summary = format!("{} -- {}", choice.text, vote_count(choice.votes));
        Self {
            id: choice.id,
            votes: choice.votes,
            text: choice.choice.text,
            summary,
        }
    }
}

/// The results page: a published question and every choice's tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResults {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<ChoiceResult>,
}

impl QuestionResults {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            id: question.id,
            text: question.question.text,
            pub_date: question.question.pub_date,
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl Display for QuestionResults {
    /// The question text, then one line per choice.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.text)?;
        for choice in &self.choices {
            writeln!(f, "{}", choice.summary)?;
        }
        Ok(())
    }
}

/// A vote for one choice of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub choice: ChoiceId,
}
