use crate::db::connection::RowConnector;
use crate::db::{insert_row, Table};
use crate::error::Error;
use crate::models::dataset::Value;
use crate::models::{Address, ScamAddress};

/// Inserts an address and returns its `address_id`.
pub async fn insert_address<C>(handle: &mut C, address: &Address) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    insert_row(
        handle,
        Table::Addresses,
        &["address"],
        vec![Value::from(address.address.as_str())],
    )
    .await
}

/// Annotates an existing address as malicious and returns the `scam_id`.
pub async fn insert_scam_address<C>(handle: &mut C, scam: &ScamAddress) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    insert_row(
        handle,
        Table::ScamAddresses,
        &[
            "address_id",
            "address",
            "owner_name",
            "owner_type",
            "owner_sub_type",
            "controller_name",
            "controller_type",
        ],
        vec![
            Value::from(scam.address_id),
            Value::from(scam.address.clone()),
            Value::from(scam.owner_name.clone()),
            Value::from(scam.owner_type.clone()),
            Value::from(scam.owner_sub_type.clone()),
            Value::from(scam.controller_name.clone()),
            Value::from(scam.controller_type.clone()),
        ],
    )
    .await
}
