use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};

/// Our question IDs are integers, allocated in creation order.
pub type QuestionId = u32;
/// Our choice IDs are integers, allocated in creation order.
pub type ChoiceId = u32;

/// Maximum length, in characters, of question and choice text.
pub const MAX_TEXT_LENGTH: usize = 200;

/// Is a question dated `pub_date` visible to the public at `now`?
///
/// Questions dated in the future behave as if they do not exist.
pub fn is_published(pub_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    pub_date <= now
}

/// Was a question dated `pub_date` published within the day leading up to `now`?
pub fn was_published_recently(pub_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - Duration::days(1) < pub_date && is_published(pub_date, now)
}

/// Strip surrounding whitespace from question or choice text and check its length.
/// `what` names the field in the error message.
pub fn clean_text(what: &str, text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::bad_request(format!("{what} must not be empty")));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(Error::bad_request(format!(
            "{what} must be at most {MAX_TEXT_LENGTH} characters"
        )));
    }
    Ok(text.to_string())
}
