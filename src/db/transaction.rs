// Transactions and Contracts reference each other. Only Contracts.tx_id is a
// foreign key; Transactions.contract_id is a plain nullable column that is
// backfilled once the contract row exists (see `record_contract`).

use tracing::debug;

use crate::db::connection::RowConnector;
use crate::db::{insert_row, Table};
use crate::error::Error;
use crate::models::dataset::Value;
use crate::models::{Contract, NewTransaction};

const TRANSACTION_COLUMNS: [&str; 13] = [
    "tx_hash",
    "block_id",
    "from_id",
    "to_id",
    "asset_value",
    "erc721_token_id",
    "erc1155_token_id",
    "erc1155_value",
    "token_id",
    "asset",
    "category_id",
    "timestamp",
    "contract_id",
];

/// Inserts a transaction and returns its `tx_id`. The referenced block,
/// addresses and category must already exist.
pub async fn insert_transaction<C>(handle: &mut C, tx: &NewTransaction) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    let values = vec![
        Value::from(tx.tx_hash.clone()),
        Value::from(tx.block_id),
        Value::from(tx.from_id),
        Value::from(tx.to_id),
        Value::from(tx.asset_value),
        Value::from(tx.erc721_token_id.clone()),
        Value::from(tx.erc1155_token_id.clone()),
        Value::from(tx.erc1155_value.clone()),
        Value::from(tx.token_id.clone()),
        Value::from(tx.asset.clone()),
        Value::from(tx.category_id),
        Value::from(tx.timestamp),
        Value::from(tx.contract_id),
    ];

    insert_row(handle, Table::Transactions, &TRANSACTION_COLUMNS, values).await
}

pub async fn insert_contract<C>(handle: &mut C, contract: &Contract) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    insert_row(
        handle,
        Table::Contracts,
        &["tx_id"],
        vec![Value::from(contract.tx_id)],
    )
    .await
}

/// Points `Transactions.contract_id` of `tx_id` at `contract_id`.
pub async fn link_contract<C>(handle: &mut C, tx_id: i64, contract_id: i64) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    let dialect = handle.backend().dialect();
    let statement = format!(
        "UPDATE {} SET {} = ? WHERE {} = ?",
        dialect.quote_ident(Table::Transactions.name()),
        dialect.quote_ident("contract_id"),
        dialect.quote_ident("tx_id"),
    );

    let executed = handle
        .execute(&statement, &[Value::from(contract_id), Value::from(tx_id)])
        .await
        .map_err(|e| Error::statement(Table::Transactions.name(), e))?;

    if executed.rows_affected == 0 {
        return Err(Error::ReferentialIntegrity {
            table: Table::Transactions.to_string(),
            detail: format!("no transaction with tx_id {}", tx_id),
        });
    }

    Ok(())
}

/// Inserts the contract row for `tx_id` and backfills the transaction with
/// the new `contract_id`, which is returned.
pub async fn record_contract<C>(handle: &mut C, tx_id: i64) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    let contract_id = insert_contract(handle, &Contract { tx_id }).await?;
    link_contract(handle, tx_id, contract_id).await?;
    debug!("Linked contract {} to transaction {}", contract_id, tx_id);
    Ok(contract_id)
}
