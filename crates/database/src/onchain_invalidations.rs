use crate::{events::EventIndex, OrderUid, PgTransaction};
use sqlx::{Executor, PgConnection};

#[derive(Clone, Debug, Default, sqlx::FromRow, Eq, PartialEq)]
pub struct OnchainCancellationRow {
    pub uid: OrderUid,
    pub is_reorged: bool,
    pub block_number: i64,
    pub log_index: i64,
}

pub async fn append(
    ex: &mut PgTransaction<'_>,
    events: &[(EventIndex, OrderUid)],
) -> Result<(), sqlx::Error> {
    for (index, event) in events {
        insert_onchain_invalidation(ex, index, event).await?;
    }
    Ok(())
}

pub async fn mark_as_reorged(
    ex: &mut PgTransaction<'_>,
    mark_from_block_number: i64,
) -> Result<(), sqlx::Error> {
    const QUERY_ONCHAIN_ORDERS: &str =
        "UPDATE onchain_order_cancellations SET is_reorged = true WHERE block_number >= $1;";
    ex.execute(sqlx::query(QUERY_ONCHAIN_ORDERS).bind(mark_from_block_number))
        .await?;
    Ok(())
}

pub async fn insert_onchain_invalidation(
    ex: &mut PgConnection,
    index: &EventIndex,
    order_uid: &OrderUid,
) -> Result<(), sqlx::Error> {
    const QUERY: &str =
        "INSERT INTO onchain_order_cancellations (block_number, log_index, uid, is_reorged) VALUES ($1, $2, $3, false) \
        ON CONFLICT (uid) DO UPDATE SET
            is_reorged = false, block_number = $1, log_index = $2;
    ;";
    sqlx::query(QUERY)
        .bind(index.block_number)
        .bind(index.log_index)
        .bind(order_uid)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn read_onchain_invalidation(
    ex: &mut PgConnection,
    id: &OrderUid,
) -> Result<Option<OnchainCancellationRow>, sqlx::Error> {
    const QUERY: &str = r#"
        SELECT * FROM onchain_order_cancellations
        WHERE uid = $1
    "#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}
