use crate::db::connection::RowConnector;
use crate::db::{insert_row, Table};
use crate::error::Error;
use crate::models::dataset::Value;
use crate::models::TxCategory;

/// Categories are a lookup table, populated before the transactions that
/// reference them.
pub async fn insert_category<C>(handle: &mut C, category: &TxCategory) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    insert_row(
        handle,
        Table::TxCategories,
        &["category_name"],
        vec![Value::from(category.category_name.as_str())],
    )
    .await
}
