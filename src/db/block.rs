use crate::db::connection::RowConnector;
use crate::db::{insert_row, Table};
use crate::error::Error;
use crate::models::dataset::Value;
use crate::models::Block;

pub async fn insert_block<C>(handle: &mut C, block: &Block) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    insert_row(
        handle,
        Table::Blocks,
        &["block_number"],
        vec![Value::from(block.block_number.as_str())],
    )
    .await
}
