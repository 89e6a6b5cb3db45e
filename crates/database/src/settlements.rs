use sqlx::PgConnection;

use crate::TransactionHash;

pub async fn recent_settlement_tx_hashes(
    ex: &mut PgConnection,
    start_block: i64,
) -> Result<Vec<TransactionHash>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT tx_hash
FROM settlements
WHERE block_number >= $1
    "#;
    sqlx::query_scalar::<_, TransactionHash>(QUERY)
        .bind(start_block)
        .fetch_all(ex)
        .await
}
