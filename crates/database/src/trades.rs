use crate::{Address, OrderUid, TransactionHash};
use bigdecimal::BigDecimal;
use futures::stream::BoxStream;
use sqlx::PgConnection;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, sqlx::FromRow)]
pub struct TradesQueryRow {
    pub block_number: i64,
    pub log_index: i64,
    pub order_uid: OrderUid,
    pub buy_amount: BigDecimal,
    pub sell_amount: BigDecimal,
    pub sell_amount_before_fees: BigDecimal,
    pub owner: Address,
    pub buy_token: Address,
    pub sell_token: Address,
    pub tx_hash: Option<TransactionHash>,
}

pub fn trades<'a>(
    ex: &'a mut PgConnection,
    owner_filter: Option<&'a Address>,
    order_uid_filter: Option<&'a OrderUid>,
) -> BoxStream<'a, Result<TradesQueryRow, sqlx::Error>> {
    const COMMON_QUERY: &str = r#"
SELECT
    t.block_number,
    t.log_index,
    t.order_uid,
    t.buy_amount,
    t.sell_amount,
    t.sell_amount - t.fee_amount as sell_amount_before_fees,
    o.owner,
    o.buy_token,
    o.sell_token,
    settlement.tx_hash
FROM trades t
LEFT OUTER JOIN LATERAL (
    SELECT tx_hash FROM settlements s
    WHERE s.block_number = t.block_number
    AND   s.log_index > t.log_index
    ORDER BY s.log_index ASC
    LIMIT 1
) AS settlement ON true
JOIN orders o
ON o.uid = t.order_uid"#;
    const QUERY: &str = const_format::concatcp!(
        COMMON_QUERY,
        " WHERE ($1 IS NULL OR o.owner = $1)",
        " AND ($2 IS NULL OR o.uid = $2)",
        "UNION",
        COMMON_QUERY,
        " LEFT OUTER JOIN onchain_placed_orders onchain_o",
        " ON onchain_o.uid = t.order_uid",
        " WHERE onchain_o.sender = $1",
        " AND ($2 IS NULL OR o.uid = $2)",
    );

    sqlx::query_as(QUERY)
        .bind(owner_filter)
        .bind(order_uid_filter)
        .fetch(ex)
}
