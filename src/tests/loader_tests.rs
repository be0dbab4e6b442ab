#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::{
        db::{
            address::{insert_address, insert_scam_address},
            block::insert_block,
            category::insert_category,
            connection::{RowConnection, RowConnector},
            export::{export_table, BulkExporter, ExportOptions, PoolExporter},
            migration::SchemaProfile,
            transaction::{insert_transaction, link_contract, record_contract},
        },
        error::Error,
        models::{
            dataset::{Dataset, Value},
            Address, Block, NewTransaction, ScamAddress, TxCategory,
        },
        tests::TestDb,
    };

    const FROM_ADDRESS: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";
    const TO_ADDRESS: &str = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae";

    struct Parents {
        block_id: i64,
        from_id: i64,
        to_id: i64,
        category_id: i64,
    }

    async fn seed_parents(conn: &mut RowConnection) -> Parents {
        Parents {
            block_id: insert_block(conn, &Block { block_number: "17034870".to_string() })
                .await
                .unwrap(),
            from_id: insert_address(conn, &Address { address: FROM_ADDRESS.to_string() })
                .await
                .unwrap(),
            to_id: insert_address(conn, &Address { address: TO_ADDRESS.to_string() })
                .await
                .unwrap(),
            category_id: insert_category(conn, &TxCategory { category_name: "erc20".to_string() })
                .await
                .unwrap(),
        }
    }

    fn transfer(parents: &Parents) -> NewTransaction {
        NewTransaction {
            tx_hash: Some("0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060".to_string()),
            block_id: parents.block_id,
            from_id: parents.from_id,
            to_id: parents.to_id,
            asset_value: Some(2.5),
            asset: Some("USDC".to_string()),
            category_id: parents.category_id,
            timestamp: NaiveDate::from_ymd_opt(2023, 4, 13)
                .and_then(|d| d.and_hms_opt(22, 27, 35)),
            ..Default::default()
        }
    }

    fn block_dataset(numbers: &[&str]) -> Dataset {
        Dataset::new()
            .with_column(
                "block_number",
                numbers.iter().map(|n| Value::from(*n)).collect(),
            )
            .unwrap()
    }

    async fn block_numbers(db: &TestDb) -> Vec<String> {
        let pool = db.reader().await;
        let numbers: Vec<String> = sqlx::query_scalar("SELECT block_number FROM Blocks ORDER BY block_id")
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;
        numbers
    }

    #[tokio::test]
    async fn test_export_into_empty_table_yields_exact_rows() {
        let db = TestDb::new();
        db.with_schema(SchemaProfile::Full).await.close().await.unwrap();

        let dataset = block_dataset(&["17000000", "17000001", "17000002"]);
        let written = export_table(&dataset, "Blocks", &db.config).await.unwrap();

        assert_eq!(written, 3);
        let mut stored = block_numbers(&db).await;
        stored.sort();
        assert_eq!(stored, vec!["17000000", "17000001", "17000002"]);
    }

    #[tokio::test]
    async fn test_export_appends_rather_than_upserts() {
        let db = TestDb::new();
        db.with_schema(SchemaProfile::Full).await.close().await.unwrap();

        let dataset = block_dataset(&["17000000", "17000001"]);
        export_table(&dataset, "Blocks", &db.config).await.unwrap();
        export_table(&dataset, "Blocks", &db.config).await.unwrap();

        let stored = block_numbers(&db).await;
        assert_eq!(stored.len(), 4);
        for number in ["17000000", "17000001"] {
            assert_eq!(stored.iter().filter(|s| *s == number).count(), 2);
        }
    }

    #[tokio::test]
    async fn test_export_splits_into_batches() {
        let db = TestDb::new();
        db.with_schema(SchemaProfile::Full).await.close().await.unwrap();

        let numbers: Vec<String> = (0..25).map(|n| format!("{}", 17_000_000 + n)).collect();
        let dataset = block_dataset(&numbers.iter().map(String::as_str).collect::<Vec<_>>());
        let exporter = PoolExporter::new(ExportOptions {
            batch_size: 7,
            transactional: false,
        });

        assert_eq!(exporter.export_table(&dataset, "Blocks", &db.config).await.unwrap(), 25);
        assert_eq!(db.count("Blocks").await, 25);
    }

    #[tokio::test]
    async fn test_export_of_empty_dataset_writes_nothing() {
        let db = TestDb::new();
        db.with_schema(SchemaProfile::Full).await.close().await.unwrap();

        let dataset = Dataset::from_json(json!([])).unwrap();
        let written = export_table(&dataset, "Blocks", &db.config).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(db.count("Blocks").await, 0);
    }

    #[tokio::test]
    async fn test_both_write_paths_store_the_same_timestamp() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;
        let parents = seed_parents(&mut conn).await;
        insert_transaction(&mut conn, &transfer(&parents)).await.unwrap();
        conn.close().await.unwrap();

        let dataset = Dataset::from_records(&[transfer(&parents)]).unwrap();
        export_table(&dataset, "Transactions", &db.config).await.unwrap();

        let pool = db.reader().await;
        let stored: Vec<String> =
            sqlx::query_scalar("SELECT CAST(timestamp AS TEXT) FROM Transactions ORDER BY tx_id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(stored, vec!["2023-04-13 22:27:35", "2023-04-13 22:27:35"]);
    }

    #[tokio::test]
    async fn test_export_rejects_unknown_columns() {
        let db = TestDb::new();
        db.with_schema(SchemaProfile::Full).await.close().await.unwrap();

        let dataset = block_dataset(&["17000000"])
            .with_column("gas_used", vec![Value::Int(21_000)])
            .unwrap();

        let err = export_table(&dataset, "Blocks", &db.config).await.unwrap_err();
        assert!(
            matches!(err, Error::Write { ref reason, .. } if reason.contains("gas_used")),
            "unexpected error: {:?}",
            err
        );
        assert_eq!(db.count("Blocks").await, 0);
    }

    #[tokio::test]
    async fn test_export_rejects_missing_table() {
        let db = TestDb::new();
        db.with_schema(SchemaProfile::Scam).await.close().await.unwrap();

        let err = export_table(&block_dataset(&["1"]), "Blocks", &db.config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[tokio::test]
    async fn test_export_rejects_unsafe_table_name() {
        let db = TestDb::new();

        let err = export_table(&block_dataset(&["1"]), "Blocks; DROP TABLE Blocks", &db.config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[tokio::test]
    async fn test_export_of_records_with_nulls() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Scam).await;
        let address_id = insert_address(&mut conn, &Address { address: FROM_ADDRESS.to_string() })
            .await
            .unwrap();
        conn.close().await.unwrap();

        let dataset = Dataset::from_json(json!([
            { "address_id": address_id, "address": FROM_ADDRESS, "owner_name": "Fake Phishing 1", "owner_type": "scam" },
            { "address_id": address_id, "address": FROM_ADDRESS },
        ]))
        .unwrap();
        export_table(&dataset, "ScamAddresses", &db.config).await.unwrap();

        let pool = db.reader().await;
        let owners: Vec<Option<String>> =
            sqlx::query_scalar("SELECT owner_name FROM ScamAddresses ORDER BY scam_id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(owners, vec![Some("Fake Phishing 1".to_string()), None]);
    }

    #[tokio::test]
    async fn test_partial_write_without_transaction() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;
        let parents = seed_parents(&mut conn).await;
        conn.close().await.unwrap();

        let good = transfer(&parents);
        let bad = NewTransaction {
            category_id: 999,
            ..transfer(&parents)
        };
        let dataset = Dataset::from_records(&[good, bad]).unwrap();
        let exporter = PoolExporter::new(ExportOptions {
            batch_size: 1,
            transactional: false,
        });

        let err = exporter
            .export_table(&dataset, "Transactions", &db.config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }), "unexpected error: {:?}", err);
        assert_eq!(db.count("Transactions").await, 1);
    }

    #[tokio::test]
    async fn test_transactional_export_rolls_back() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;
        let parents = seed_parents(&mut conn).await;
        conn.close().await.unwrap();

        let good = transfer(&parents);
        let bad = NewTransaction {
            category_id: 999,
            ..transfer(&parents)
        };
        let dataset = Dataset::from_records(&[good, bad]).unwrap();
        let exporter = PoolExporter::new(ExportOptions {
            batch_size: 1,
            transactional: true,
        });

        let err = exporter
            .export_table(&dataset, "Transactions", &db.config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }), "unexpected error: {:?}", err);
        assert_eq!(db.count("Transactions").await, 0);
    }

    #[tokio::test]
    async fn test_transaction_foreign_keys_resolve() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;
        let parents = seed_parents(&mut conn).await;

        let tx_id = insert_transaction(&mut conn, &transfer(&parents)).await.unwrap();
        conn.close().await.unwrap();

        let pool = db.reader().await;
        let (block_number, from, to, category, value): (String, String, String, String, f64) =
            sqlx::query_as(
                "SELECT b.block_number, f.address, t.address, c.category_name, tx.asset_value
                 FROM Transactions tx
                 JOIN Blocks b ON b.block_id = tx.block_id
                 JOIN Addresses f ON f.address_id = tx.from_id
                 JOIN Addresses t ON t.address_id = tx.to_id
                 JOIN TxCategories c ON c.category_id = tx.category_id
                 WHERE tx.tx_id = ?",
            )
            .bind(tx_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(block_number, "17034870");
        assert_eq!(from, FROM_ADDRESS);
        assert_eq!(to, TO_ADDRESS);
        assert_eq!(category, "erc20");
        assert_eq!(value, 2.5);
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;
        let parents = seed_parents(&mut conn).await;

        let orphan = NewTransaction {
            category_id: parents.category_id + 100,
            ..transfer(&parents)
        };
        let err = insert_transaction(&mut conn, &orphan).await.unwrap_err();

        assert!(
            matches!(err, Error::ReferentialIntegrity { ref table, .. } if table == "Transactions"),
            "unexpected error: {:?}",
            err
        );
        assert_eq!(db.count("Transactions").await, 0);
    }

    #[tokio::test]
    async fn test_keys_increase_monotonically() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;

        let first = insert_block(&mut conn, &Block { block_number: "1".to_string() }).await.unwrap();
        let second = insert_block(&mut conn, &Block { block_number: "2".to_string() }).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_contract_backfills_transaction() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;
        let parents = seed_parents(&mut conn).await;
        let tx_id = insert_transaction(&mut conn, &transfer(&parents)).await.unwrap();

        let contract_id = record_contract(&mut conn, tx_id).await.unwrap();

        let linked = conn
            .fetch_scalar(
                "SELECT COUNT(*) FROM Transactions t JOIN Contracts c ON c.contract_id = t.contract_id \
                 WHERE t.tx_id = ? AND c.tx_id = ?",
                &[Value::Int(tx_id), Value::Int(tx_id)],
            )
            .await
            .unwrap();
        assert_eq!(linked, 1);
        assert!(contract_id > 0);
    }

    #[tokio::test]
    async fn test_link_contract_requires_transaction() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Full).await;

        let err = link_contract(&mut conn, 42, 1).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }));
    }

    #[tokio::test]
    async fn test_scam_address_requires_known_address() {
        let db = TestDb::new();
        let mut conn = db.with_schema(SchemaProfile::Scam).await;

        let unknown = ScamAddress {
            address_id: 7,
            address: Some(TO_ADDRESS.to_string()),
            owner_type: Some("phishing".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            insert_scam_address(&mut conn, &unknown).await,
            Err(Error::ReferentialIntegrity { .. })
        ));

        let address_id = insert_address(&mut conn, &Address { address: TO_ADDRESS.to_string() })
            .await
            .unwrap();
        let scam_id = insert_scam_address(&mut conn, &ScamAddress { address_id, ..unknown })
            .await
            .unwrap();
        assert!(scam_id > 0);
    }
}
