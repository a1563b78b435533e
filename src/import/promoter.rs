//! Staging promoter

use crate::database::schema::PROMOTE_CITIES;
use crate::database::DatabaseGateway;
use crate::error::Result;

/// Copy staged cities into `cities`, skipping ids already present
///
/// All referenced states and countries must be committed first. Returns the
/// number of rows the database reports as inserted.
pub fn promote_staged_cities<G: DatabaseGateway + ?Sized>(gateway: &mut G) -> Result<usize> {
    let promoted = gateway.insert_from_select(PROMOTE_CITIES)?;
    tracing::info!(promoted, "promoted staged cities");
    Ok(promoted)
}
