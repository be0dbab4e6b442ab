pub mod address;
pub mod block;
pub mod category;
pub mod connection;
pub mod export;
pub mod migration;
pub mod transaction;

use sqlx::any::AnyArguments;
use sqlx::Arguments;
use std::fmt;

use crate::error::Error;
use crate::models::dataset::Value;
use connection::RowConnector;

/// SQL flavour of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident),
            Dialect::Sqlite => format!("\"{}\"", ident),
        }
    }

    /// Upper bound on bind parameters in a single statement.
    pub fn max_bind_params(&self) -> usize {
        match self {
            Dialect::MySql => 65_535,
            Dialect::Sqlite => 32_766,
        }
    }

    /// `COUNT(*)` of tables named by the single bound parameter.
    pub(crate) fn table_exists_query(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
            Dialect::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        }
    }

    /// Column names of the table named by the single bound parameter.
    pub(crate) fn table_columns_query(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "SELECT CAST(column_name AS CHAR) FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                 ORDER BY ordinal_position"
            }
            Dialect::Sqlite => "SELECT name FROM pragma_table_info(?) ORDER BY cid",
        }
    }
}

/// The analytics tables, in foreign-key dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Blocks,
    Addresses,
    TxCategories,
    Transactions,
    Contracts,
    ScamAddresses,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Blocks,
        Table::Addresses,
        Table::TxCategories,
        Table::Transactions,
        Table::Contracts,
        Table::ScamAddresses,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Blocks => "Blocks",
            Table::Addresses => "Addresses",
            Table::TxCategories => "TxCategories",
            Table::Transactions => "Transactions",
            Table::Contracts => "Contracts",
            Table::ScamAddresses => "ScamAddresses",
        }
    }

    /// Store-assigned surrogate key.
    pub fn primary_key(&self) -> &'static str {
        match self {
            Table::Blocks => "block_id",
            Table::Addresses => "address_id",
            Table::TxCategories => "category_id",
            Table::Transactions => "tx_id",
            Table::Contracts => "contract_id",
            Table::ScamAddresses => "scam_id",
        }
    }

    /// Tables this one declares foreign keys against.
    pub fn parents(&self) -> &'static [Table] {
        match self {
            Table::Blocks | Table::Addresses | Table::TxCategories => &[],
            Table::Transactions => &[Table::Blocks, Table::Addresses, Table::TxCategories],
            Table::Contracts => &[Table::Transactions],
            Table::ScamAddresses => &[Table::Addresses],
        }
    }

    pub fn ddl(&self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::MySql => self.mysql_ddl(),
            Dialect::Sqlite => self.sqlite_ddl(),
        }
    }

    fn mysql_ddl(&self) -> &'static str {
        match self {
            Table::Blocks => {
                r#"
    CREATE TABLE IF NOT EXISTS Blocks (
        block_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        block_number VARCHAR(255)
    )
    "#
            }
            Table::Addresses => {
                r#"
    CREATE TABLE IF NOT EXISTS Addresses (
        address_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        address VARCHAR(255)
    )
    "#
            }
            Table::TxCategories => {
                r#"
    CREATE TABLE IF NOT EXISTS TxCategories (
        category_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        category_name VARCHAR(255)
    )
    "#
            }
            Table::Transactions => {
                r#"
    CREATE TABLE IF NOT EXISTS Transactions (
        tx_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        tx_hash VARCHAR(255) DEFAULT NULL,
        block_id INT,
        from_id INT,
        to_id INT,
        asset_value FLOAT DEFAULT NULL,
        erc721_token_id VARCHAR(255) DEFAULT NULL,
        erc1155_token_id VARCHAR(255) DEFAULT NULL,
        erc1155_value VARCHAR(255) DEFAULT NULL,
        token_id VARCHAR(255) DEFAULT NULL,
        asset VARCHAR(255) DEFAULT NULL,
        category_id INT,
        timestamp TIMESTAMP DEFAULT NULL,
        contract_id INT DEFAULT NULL,
        FOREIGN KEY (block_id) REFERENCES Blocks(block_id),
        FOREIGN KEY (from_id) REFERENCES Addresses(address_id),
        FOREIGN KEY (to_id) REFERENCES Addresses(address_id),
        FOREIGN KEY (category_id) REFERENCES TxCategories(category_id)
    )
    "#
            }
            Table::Contracts => {
                r#"
    CREATE TABLE IF NOT EXISTS Contracts (
        contract_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        tx_id INT,
        FOREIGN KEY (tx_id) REFERENCES Transactions(tx_id)
    )
    "#
            }
            Table::ScamAddresses => {
                r#"
    CREATE TABLE IF NOT EXISTS ScamAddresses (
        scam_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        address_id INT,
        address VARCHAR(255) DEFAULT NULL,
        owner_name VARCHAR(255) DEFAULT NULL,
        owner_type VARCHAR(255) DEFAULT NULL,
        owner_sub_type VARCHAR(255) DEFAULT NULL,
        controller_name VARCHAR(255) DEFAULT NULL,
        controller_type VARCHAR(255) DEFAULT NULL,
        FOREIGN KEY (address_id) REFERENCES Addresses(address_id)
    )
    "#
            }
        }
    }

    // Same names, nullability and keys; SQLite storage classes.
    fn sqlite_ddl(&self) -> &'static str {
        match self {
            Table::Blocks => {
                "CREATE TABLE IF NOT EXISTS Blocks (
                    block_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    block_number TEXT
                )"
            }
            Table::Addresses => {
                "CREATE TABLE IF NOT EXISTS Addresses (
                    address_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    address TEXT
                )"
            }
            Table::TxCategories => {
                "CREATE TABLE IF NOT EXISTS TxCategories (
                    category_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    category_name TEXT
                )"
            }
            Table::Transactions => {
                "CREATE TABLE IF NOT EXISTS Transactions (
                    tx_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    tx_hash TEXT DEFAULT NULL,
                    block_id INTEGER,
                    from_id INTEGER,
                    to_id INTEGER,
                    asset_value REAL DEFAULT NULL,
                    erc721_token_id TEXT DEFAULT NULL,
                    erc1155_token_id TEXT DEFAULT NULL,
                    erc1155_value TEXT DEFAULT NULL,
                    token_id TEXT DEFAULT NULL,
                    asset TEXT DEFAULT NULL,
                    category_id INTEGER,
                    timestamp TIMESTAMP DEFAULT NULL,
                    contract_id INTEGER DEFAULT NULL,
                    FOREIGN KEY (block_id) REFERENCES Blocks(block_id),
                    FOREIGN KEY (from_id) REFERENCES Addresses(address_id),
                    FOREIGN KEY (to_id) REFERENCES Addresses(address_id),
                    FOREIGN KEY (category_id) REFERENCES TxCategories(category_id)
                )"
            }
            Table::Contracts => {
                "CREATE TABLE IF NOT EXISTS Contracts (
                    contract_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    tx_id INTEGER,
                    FOREIGN KEY (tx_id) REFERENCES Transactions(tx_id)
                )"
            }
            Table::ScamAddresses => {
                "CREATE TABLE IF NOT EXISTS ScamAddresses (
                    scam_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    address_id INTEGER,
                    address TEXT DEFAULT NULL,
                    owner_name TEXT DEFAULT NULL,
                    owner_type TEXT DEFAULT NULL,
                    owner_sub_type TEXT DEFAULT NULL,
                    controller_name TEXT DEFAULT NULL,
                    controller_type TEXT DEFAULT NULL,
                    FOREIGN KEY (address_id) REFERENCES Addresses(address_id)
                )"
            }
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binds `params` positionally, in order.
pub(crate) fn arguments<'q, 'v>(
    params: impl IntoIterator<Item = &'v Value>,
) -> Result<AnyArguments<'q>, sqlx::Error> {
    let mut args = AnyArguments::default();

    for param in params {
        let added = match param {
            Value::Null => args.add(None::<String>),
            Value::Int(v) => args.add(*v),
            Value::Float(v) => args.add(*v),
            Value::Text(v) => args.add(v.clone()),
            Value::Bool(v) => args.add(*v),
            Value::Timestamp(v) => args.add(v.format("%Y-%m-%d %H:%M:%S").to_string()),
        };
        added.map_err(sqlx::Error::Encode)?;
    }

    Ok(args)
}

/// `INSERT INTO <table> (<columns>) VALUES (?, ...)` for one row, returning
/// the store-assigned key of the new row.
pub(crate) async fn insert_row<C>(
    handle: &mut C,
    table: Table,
    columns: &[&str],
    values: Vec<Value>,
) -> Result<i64, Error>
where
    C: RowConnector + ?Sized,
{
    let dialect = handle.backend().dialect();
    let column_list = columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    let statement = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(table.name()),
        column_list,
        placeholders
    );

    match dialect {
        Dialect::MySql => {
            let executed = handle
                .execute(&statement, &values)
                .await
                .map_err(|e| Error::statement(table.name(), e))?;

            executed
                .last_insert_id
                .ok_or_else(|| Error::rejected(table.name(), "store did not report the inserted key"))
        }
        // The Any driver does not surface SQLite's rowid, so ask for the key.
        Dialect::Sqlite => {
            let statement = format!(
                "{} RETURNING {}",
                statement,
                dialect.quote_ident(table.primary_key())
            );
            handle
                .fetch_scalar(&statement, &values)
                .await
                .map_err(|e| Error::statement(table.name(), e))
        }
    }
}
