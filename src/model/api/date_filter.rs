use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};

/// Calendar ranges for filtering questions by publication date, all in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum PubDateFilter {
    #[field(value = "any")]
    Any,
    #[field(value = "today")]
    Today,
    #[field(value = "past_7_days")]
    PastSevenDays,
    #[field(value = "this_month")]
    ThisMonth,
    #[field(value = "this_year")]
    ThisYear,
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

impl PubDateFilter {
    /// The half-open `[from, until)` range selected at `now`, or `None` for any date.
    pub fn range(self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let tomorrow = midnight(today.succ_opt()?)?;
        match self {
            Self::Any => None,
            Self::Today => Some((midnight(today)?, tomorrow)),
            Self::PastSevenDays => Some((midnight(today)? - Duration::days(7), tomorrow)),
            Self::ThisMonth => {
                let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
                let next = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
                };
                Some((midnight(first)?, midnight(next)?))
            }
            Self::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
                let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?;
                Some((midnight(first)?, midnight(next)?))
            }
        }
    }
}

/// Read from the `pub_date` query field. Missing means [`PubDateFilter::Any`];
/// an unknown value is a bad request.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for PubDateFilter {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.query_value::<PubDateFilter>("pub_date") {
            None => Outcome::Success(Self::Any),
            Some(Ok(filter)) => Outcome::Success(filter),
            Some(Err(_)) => Outcome::Failure((Status::BadRequest, ())),
        }
    }
}
