//! Types and rules shared between the DB and API representations.

mod question;

pub use question::{
    clean_text, is_published, was_published_recently, ChoiceId, QuestionId, MAX_TEXT_LENGTH,
};
