use {
    crate::infra::persistence::dto,
    sqlx::{PgConnection, QueryBuilder},
};

pub async fn insert_batch(
    ex: &mut PgConnection,
    fee_policies: impl IntoIterator<Item = dto::FeePolicy>,
) -> Result<(), sqlx::Error> {
    let mut query_builder = QueryBuilder::new(
        "INSERT INTO fee_policies (auction_id, order_uid, kind, surplus_factor, \
         max_volume_factor, volume_factor) ",
    );

    query_builder.push_values(fee_policies, |mut b, fee_policy| {
        b.push_bind(fee_policy.auction_id)
            .push_bind(fee_policy.order_uid)
            .push_bind(fee_policy.kind)
            .push_bind(fee_policy.surplus_factor)
            .push_bind(fee_policy.max_volume_factor)
            .push_bind(fee_policy.volume_factor);
    });

    query_builder.build().execute(ex).await.map(|_| ())
}

pub async fn fetch(
    ex: &mut PgConnection,
    auction_id: dto::AuctionId,
    order_uid: database::OrderUid,
) -> Result<Vec<dto::FeePolicy>, sqlx::Error> {
    const QUERY: &str = r#"
        SELECT * FROM fee_policies
        WHERE auction_id = $1 AND order_uid = $2
        ORDER BY application_order
    "#;
    let rows = sqlx::query_as::<_, dto::FeePolicy>(QUERY)
        .bind(auction_id)
        .bind(order_uid)
        .fetch_all(ex)
        .await?
        .into_iter()
        .collect();
    Ok(rows)
}
