use {
    crate::{Address, PgTransaction, TransactionHash},
    sqlx::{Executor, PgConnection, QueryBuilder},
    tracing::instrument,
};

/// Represents a CoW AMM stored in the database
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CowAmm {
    pub address: Address,
    pub factory_address: Address,
    pub tradeable_tokens: Vec<Address>,
    pub block_number: i64,
    pub tx_hash: TransactionHash,
}

/// Insert or update multiple CoW AMMs in the database using batch insert
#[instrument(skip_all)]
pub async fn upsert_batched(
    ex: &mut PgTransaction<'_>,
    cow_amms: &[CowAmm],
) -> Result<(), sqlx::Error> {
    if cow_amms.is_empty() {
        return Ok(());
    }

    const BATCH_SIZE: usize = 200;

    for chunk in cow_amms.chunks(BATCH_SIZE) {
        upsert(ex, chunk).await?;
    }

    Ok(())
}

/// Insert or update a batch of CoW AMMs in the database
#[instrument(skip_all)]
async fn upsert(ex: &mut PgConnection, cow_amms: &[CowAmm]) -> Result<(), sqlx::Error> {
    const QUERY: &str =
        "INSERT INTO cow_amms (address, factory_address, tradeable_tokens, block_number, tx_hash) ";
    const CONFLICT_CLAUSE: &str = r#"
ON CONFLICT (address)
DO UPDATE SET
    factory_address  = EXCLUDED.factory_address,
    tradeable_tokens = EXCLUDED.tradeable_tokens,
    block_number     = EXCLUDED.block_number,
    tx_hash          = EXCLUDED.tx_hash
    "#;

    let mut query_builder = QueryBuilder::new(QUERY);

    query_builder.push_values(cow_amms, |mut builder, cow_amm| {
        builder
            .push_bind(cow_amm.address)
            .push_bind(cow_amm.factory_address)
            .push_bind(cow_amm.tradeable_tokens.clone())
            .push_bind(cow_amm.block_number)
            .push_bind(cow_amm.tx_hash);
    });
    query_builder.push(CONFLICT_CLAUSE);
    query_builder.build().execute(ex).await?;

    Ok(())
}

/// Fetch all CoW AMMs for a specific helper contract
#[instrument(skip_all)]
pub async fn fetch_by_factory_address(
    ex: &mut PgConnection,
    address: &Address,
) -> Result<Vec<CowAmm>, sqlx::Error> {
    const QUERY: &str = "SELECT * FROM cow_amms WHERE factory_address = $1";

    let cow_amms = sqlx::query_as(QUERY).bind(address).fetch_all(ex).await?;

    Ok(cow_amms)
}

/// Delete CoW AMMs within a block range for a specific factory address.
#[instrument(skip_all)]
pub async fn delete_by_block_range(
    ex: &mut PgConnection,
    factory_address: &Address,
    start_block: i64,
    end_block: i64,
) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"
DELETE FROM cow_amms
WHERE factory_address = $1
  AND block_number BETWEEN $2 AND $3;
    "#;

    ex.execute(
        sqlx::query(QUERY)
            .bind(factory_address)
            .bind(start_block)
            .bind(end_block),
    )
    .await?;
    Ok(())
}
