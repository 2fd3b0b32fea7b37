//! Column codecs shared by the SQLite repositories.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use docketsync_domain::DocketError;
use rusqlite::types::Type;
use rusqlite::{Error as SqlError, Row};
use uuid::Uuid;

use crate::errors::InfraError;

pub(crate) fn sql_err(err: SqlError) -> DocketError {
    InfraError::from(err).into()
}

pub(crate) fn micros(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_micros()
}

pub(crate) fn opt_micros(instant: Option<DateTime<Utc>>) -> Option<i64> {
    instant.map(micros)
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|err| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        Uuid::parse_str(&value)
            .map_err(|err| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
    })
    .transpose()
}

pub(crate) fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: i64 = row.get(idx)?;
    from_micros(idx, raw)
}

pub(crate) fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|value| from_micros(idx, value)).transpose()
}

/// Status-like text column parsed through the enum's `FromStr`.
pub(crate) fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|err| SqlError::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

/// Non-negative integer column narrowed to `u32`.
pub(crate) fn u32_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw)
        .map_err(|err| SqlError::FromSqlConversionFailure(idx, Type::Integer, Box::new(err)))
}

fn from_micros(idx: usize, raw: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(raw).ok_or_else(|| {
        SqlError::FromSqlConversionFailure(idx, Type::Integer, format!("timestamp out of range: {raw}").into())
    })
}
