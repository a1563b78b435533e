//! Entity splitter
//!
//! Turns one flat input record into the country, state and city tuples of
//! the normalized schema. Pure, no I/O.

use crate::database::{Row, SqlValue};
use crate::reader::CityRecord;

/// A tuple bound for one of the target tables
pub trait TableRow {
    /// Natural key used for deduplication and as the primary key
    fn natural_key(&self) -> Option<i64>;

    /// Values in target column order
    fn into_row(self) -> Row;
}

/// `countries (id, code, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryRow {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
}

/// `states (id, code, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateRow {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
}

/// `cities (id, name, state_id, country_id, latitude, longitude, wikiDataId)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityRow {
    pub id: i64,
    pub name: Option<String>,
    pub state_id: Option<i64>,
    pub country_id: Option<i64>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub wiki_data_id: Option<String>,
}

/// The three tuples derived from one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRecord {
    pub country: CountryRow,
    pub state: StateRow,
    pub city: CityRow,
}

impl TableRow for CountryRow {
    fn natural_key(&self) -> Option<i64> {
        self.id
    }

    fn into_row(self) -> Row {
        vec![self.id.into(), self.code.into(), self.name.into()]
    }
}

impl TableRow for StateRow {
    fn natural_key(&self) -> Option<i64> {
        self.id
    }

    fn into_row(self) -> Row {
        vec![self.id.into(), self.code.into(), self.name.into()]
    }
}

impl TableRow for CityRow {
    fn natural_key(&self) -> Option<i64> {
        Some(self.id)
    }

    fn into_row(self) -> Row {
        vec![
            SqlValue::Int(self.id),
            self.name.into(),
            self.state_id.into(),
            self.country_id.into(),
            self.latitude.into(),
            self.longitude.into(),
            self.wiki_data_id.into(),
        ]
    }
}

/// Split a record into its country, state and city tuples
///
/// Null state or country ids still produce a tuple (with null fields).
pub fn split_record(record: CityRecord) -> SplitRecord {
    SplitRecord {
        country: CountryRow {
            id: record.country_id,
            code: record.country_code,
            name: record.country_name,
        },
        state: StateRow {
            id: record.state_id,
            code: record.state_code,
            name: record.state_name,
        },
        city: CityRow {
            id: record.id,
            name: record.name,
            state_id: record.state_id,
            country_id: record.country_id,
            latitude: record.latitude,
            longitude: record.longitude,
            wiki_data_id: record.wiki_data_id,
        },
    }
}
