use argon2::Config;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{clean_text, ChoiceId, QuestionId},
    db::{Choice, NewAdmin, Question, QuestionCore},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self> {
        if cred.username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request("Illegal admin credentials"));
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}

/// One row of the admin question list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminQuestionSummary {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub was_published_recently: bool,
}

impl AdminQuestionSummary {
    pub fn new(question: Question, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id,
            was_published_recently: question.was_published_recently(now),
            text: question.question.text,
            pub_date: question.question.pub_date,
        }
    }
}

/// A choice as the admin edits it, tally included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminChoice {
    pub id: ChoiceId,
    pub text: String,
    pub votes: u32,
}

impl From<Choice> for AdminChoice {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id,
            votes: choice.votes,
            text: choice.choice.text,
        }
    }
}

/// Everything about a question, whether or not it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminQuestionDescription {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub was_published_recently: bool,
    pub choices: Vec<AdminChoice>,
}

impl AdminQuestionDescription {
    pub fn new(question: Question, choices: Vec<Choice>, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id,
            was_published_recently: question.was_published_recently(now),
            text: question.question.text,
            pub_date: question.question.pub_date,
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

/// An inline choice row submitted with a question.
///
/// Rows without an `id` create choices; rows with one edit or delete that choice.
/// New rows left blank are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChoiceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ChoiceId>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u32>,
    #[serde(default)]
    pub delete: bool,
}

impl ChoiceSpec {
    /// An unused extra row.
    pub fn is_blank(&self) -> bool {
        self.id.is_none() && self.text.trim().is_empty()
    }
}

/// A question and its inline choices, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub text: String,
    pub pub_date: DateTime<Utc>,
    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,
}

impl QuestionSpec {
    /// The validated question data.
    pub fn question(&self) -> Result<QuestionCore> {
        Ok(QuestionCore {
            text: clean_text("Question text", &self.text)?,
            pub_date: self.pub_date,
        })
    }

    /// The rows that actually say something.
    pub fn filled_choices(&self) -> impl Iterator<Item = &ChoiceSpec> {
        self.choices.iter().filter(|choice| !choice.is_blank())
    }
}
