//! City-count query

use crate::database::DatabaseGateway;
use crate::error::{Error, Result};
use serde_json::Value;

/// Name of the single result column
pub const COUNT_COLUMN: &str = "number_of_cities";

/// Count cities whose country and state names both match
pub const COUNT_CITIES_QUERY: &str = "SELECT COUNT(ct.id) AS number_of_cities
FROM cities ct
JOIN states s ON ct.state_id = s.id
JOIN countries ctr ON ct.country_id = ctr.id
WHERE ctr.name = ?
AND s.name = ?";

/// Result of the city-count query
#[derive(Debug, Clone, PartialEq)]
pub struct CityCount {
    pub country: String,
    pub state: String,
    /// Column names as returned by the query
    pub columns: Vec<String>,
    /// Result rows; always exactly one
    pub rows: Vec<Vec<Value>>,
    pub count: i64,
}

impl CityCount {
    /// Console line reporting the count
    pub fn summary_line(&self) -> String {
        format!(
            "Number of cities for {} in {}: {}",
            self.state, self.country, self.count
        )
    }
}

/// Run the count query for one (country, state) pair
///
/// A query that yields no rows is reported as a count of zero.
pub fn count_cities<G: DatabaseGateway + ?Sized>(
    gateway: &mut G,
    country: &str,
    state: &str,
) -> Result<CityCount> {
    let result = gateway.query(COUNT_CITIES_QUERY, &[country, state])?;

    let count = match result.scalar(COUNT_CITIES_QUERY) {
        Ok(value) => count_from_value(value)?,
        Err(Error::EmptyResult { .. }) => {
            tracing::warn!(country, state, "count query returned no rows, reporting zero");
            0
        }
        Err(e) => return Err(e),
    };

    let columns = if result.columns.is_empty() {
        vec![COUNT_COLUMN.to_string()]
    } else {
        result.columns
    };

    Ok(CityCount {
        country: country.to_string(),
        state: state.to_string(),
        columns,
        rows: vec![vec![Value::from(count)]],
        count,
    })
}

fn count_from_value(value: &Value) -> Result<i64> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::query(format!("count {n} is not an integer"))),
        Value::String(s) => s
            .parse()
            .map_err(|_| Error::query(format!("count '{s}' is not an integer"))),
        other => Err(Error::query(format!("unexpected count value {other}"))),
    }
}
