//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs are stored under `_id`.
//! - Datetimes are serialised in MongoDB's own format.

mod admin;
pub use admin::{Admin, AdminCore, NewAdmin};

mod question;
pub use question::{Choice, ChoiceCore, NewChoice, NewQuestion, Question, QuestionCore};
