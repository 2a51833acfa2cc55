use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::store::Window;

/// Page size used when the request does not give one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Pagination parameters taken from the `page_num` and `page_size` query fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationRequest {
    page_num: u32,
    page_size: u32,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl PaginationRequest {
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num,
            page_size,
        }
    }

    /// The 1-based page number.
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The slice of results this request selects.
    /// Page numbers and sizes start at 1.
    pub fn window(&self) -> Result<Window> {
        let (page_num, page_size) = (self.page_num(), self.page_size());
        if page_num == 0 || page_size == 0 {
            return Err(Error::bad_request(
                "Page number and page size must be at least 1",
            ));
        }
        Ok(Window {
            skip: u64::from(page_num - 1) * u64::from(page_size),
            limit: Some(u64::from(page_size)),
        })
    }

    /// Wrap one page of items with this request's metadata.
    pub fn to_paginated<T>(&self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            pagination: PaginationResult {
                page_num: self.page_num(),
                page_size: self.page_size(),
                total,
            },
            items,
        }
    }
}

/// Missing fields take their defaults; unparsable ones are a bad request.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for PaginationRequest {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let page_num = match req.query_value::<u32>("page_num").unwrap_or(Ok(1)) {
            Ok(page_num) => page_num,
            Err(_) => return Outcome::Failure((Status::BadRequest, ())),
        };
        let page_size = match req
            .query_value::<u32>("page_size")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE))
        {
            Ok(page_size) => page_size,
            Err(_) => return Outcome::Failure((Status::BadRequest, ())),
        };
        Outcome::Success(Self::new(page_num, page_size))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub pagination: PaginationResult,
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        let window = PaginationRequest::default().window().unwrap();
        assert_eq!(window.skip, 0);
        assert_eq!(window.limit, Some(u64::from(DEFAULT_PAGE_SIZE)));
    }

    #[test]
    fn later_pages_skip_earlier_ones() {
        let window = PaginationRequest::new(3, 20).window().unwrap();
        assert_eq!(window.skip, 40);
        assert_eq!(window.limit, Some(20));
    }

    #[test]
    fn zero_is_rejected() {
        assert!(PaginationRequest::new(0, 20).window().is_err());
        assert!(PaginationRequest::new(1, 0).window().is_err());
    }
}
