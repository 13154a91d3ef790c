//! Turns a client listing request into a `ListQuery` the storage tier can run
//! as-is. All checks happen here; the repository trusts what it is given.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

/// PaginationRequest
///
/// Wire shape of `POST /list`. `order` is overloaded: for `sortBy = "Value"`
/// it is either a direction (`ASC`/`DESC`) or a closed range such as `"0-100"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationRequest {
    /// Zero-based page number.
    pub page: u64,
    pub batch_size: u32,
    #[schema(example = "Value")]
    pub sort_by: String,
    #[schema(example = "0-100")]
    pub order: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    CreatedAt,
    Value,
}

impl SortColumn {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::Value => "value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    fn parse(order: &str) -> Option<Self> {
        match order {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }
}

/// Selection
///
/// The two mutually exclusive outcomes of normalization: order the posts, or
/// keep only those whose value lies in `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    OrderBy {
        column: SortColumn,
        direction: Direction,
    },
    RangeFilter {
        low: i64,
        high: i64,
    },
}

/// ListQuery
///
/// A validated listing intent: the selection plus `LIMIT`/`OFFSET`.
/// `offset` always fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub selection: Selection,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("Incorrect sort column: {0:?}, expected \"Date\" or \"Value\"")]
    UnknownSortColumn(String),
    #[error("Incorrect date order: {0:?}, expected \"ASC\" or \"DESC\"")]
    InvalidDateOrder(String),
    #[error("Incorrect value order: {0:?}, expected \"ASC\", \"DESC\" or \"<low>-<high>\"")]
    InvalidValueOrder(String),
    #[error("Page {page} with batch size {batch_size} is out of range")]
    OffsetOverflow { page: u64, batch_size: u32 },
}

pub fn normalize(req: &PaginationRequest) -> Result<ListQuery, PaginationError> {
    let selection = match req.sort_by.as_str() {
        "Date" => {
            let direction = Direction::parse(&req.order)
                .ok_or_else(|| PaginationError::InvalidDateOrder(req.order.clone()))?;
            Selection::OrderBy {
                column: SortColumn::CreatedAt,
                direction,
            }
        }
        // A range wins over a direction; the two never overlap in practice.
        "Value" => match parse_range(&req.order) {
            Some((low, high)) => Selection::RangeFilter { low, high },
            None => {
                let direction = Direction::parse(&req.order)
                    .ok_or_else(|| PaginationError::InvalidValueOrder(req.order.clone()))?;
                Selection::OrderBy {
                    column: SortColumn::Value,
                    direction,
                }
            }
        },
        other => return Err(PaginationError::UnknownSortColumn(other.to_string())),
    };

    let offset = req
        .page
        .checked_mul(u64::from(req.batch_size))
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or(PaginationError::OffsetOverflow {
            page: req.page,
            batch_size: req.batch_size,
        })?;

    Ok(ListQuery {
        selection,
        limit: req.batch_size,
        offset,
    })
}

/// Parses `"<low>-<high>"` with `low <= high`. Whitespace around either
/// bound is ignored; anything that does not split into exactly two integers
/// is not a range.
pub fn parse_range(input: &str) -> Option<(i64, i64)> {
    let (low, high) = input.split_once('-')?;
    if high.contains('-') {
        return None;
    }
    let low: i64 = low.trim().parse().ok()?;
    let high: i64 = high.trim().parse().ok()?;
    (low <= high).then_some((low, high))
}
