// Insertable shapes of the analytics tables. Surrogate keys are assigned by
// the store and so never appear here.

pub mod dataset;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxCategory {
    pub category_name: String,
}

/// One token-transfer event. The token fields cover the different shapes of
/// ERC-20/721/1155 transfers, so most of them are empty for any given row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub tx_hash: Option<String>,
    pub block_id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub asset_value: Option<f64>,
    pub erc721_token_id: Option<String>,
    pub erc1155_token_id: Option<String>,
    pub erc1155_value: Option<String>,
    pub token_id: Option<String>,
    pub asset: Option<String>,
    pub category_id: i64,
    pub timestamp: Option<NaiveDateTime>,
    /// Left empty on insert and backfilled once the contract row exists.
    pub contract_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub tx_id: i64,
}

/// Attribution of a known-malicious address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScamAddress {
    pub address_id: i64,
    pub address: Option<String>,
    pub owner_name: Option<String>,
    pub owner_type: Option<String>,
    pub owner_sub_type: Option<String>,
    pub controller_name: Option<String>,
    pub controller_type: Option<String>,
}
