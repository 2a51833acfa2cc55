use log::debug;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter backing question IDs.
pub const QUESTION_ID_COUNTER: &str = "question_id";
/// Counter backing choice IDs.
pub const CHOICE_ID_COUNTER: &str = "choice_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u64,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Failed to find counter with ID {id}"),
                )
            })?;
        u32::try_from(counter.next).map_err(|_| {
            Error::Status(
                Status::InternalServerError,
                format!("Counter {id} is exhausted"),
            )
        })
    }
}

/// Ensure the ID counters exist, starting from 1. Existing counters are left alone.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> Result<()> {
    debug!("Ensuring ID counters exist");
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in [QUESTION_ID_COUNTER, CHOICE_ID_COUNTER] {
        counters
            .update_one(
                doc! { "_id": id },
                doc! { "$setOnInsert": { "next": 1_i64 } },
                upsert.clone(),
            )
            .await?;
    }
    Ok(())
}
