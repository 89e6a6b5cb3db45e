use {
    crate::{Address, PgTransaction, auction::AuctionId},
    bigdecimal::BigDecimal,
    sqlx::{PgConnection, QueryBuilder},
    std::ops::DerefMut,
    tracing::instrument,
};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Score {
    pub auction_id: AuctionId,
    pub solver: Address,
    pub reference_score: BigDecimal,
}

#[instrument(skip_all)]
pub async fn insert(ex: &mut PgTransaction<'_>, scores: &[Score]) -> Result<(), sqlx::Error> {
    const QUERY: &str = "INSERT INTO reference_scores (auction_id, solver, reference_score) ";

    if scores.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::new(QUERY);
    query_builder.push_values(scores, |mut builder, score| {
        builder
            .push_bind(score.auction_id)
            .push_bind(score.solver)
            .push_bind(score.reference_score.clone());
    });

    query_builder.build().execute(ex.deref_mut()).await?;

    Ok(())
}

#[instrument(skip_all)]
pub async fn fetch(
    ex: &mut PgConnection,
    auction_id: AuctionId,
) -> Result<Vec<Score>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM reference_scores WHERE auction_id = $1"#;
    sqlx::query_as(QUERY).bind(auction_id).fetch_all(ex).await
}
