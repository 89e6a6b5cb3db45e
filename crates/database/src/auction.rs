use sqlx::{types::JsonValue, PgConnection};

pub type AuctionId = i64;

pub async fn load_most_recent(
    ex: &mut PgConnection,
) -> Result<Option<(AuctionId, JsonValue)>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT id, json
FROM auctions
ORDER BY id DESC
LIMIT 1
    ;"#;
    sqlx::query_as(QUERY).fetch_optional(ex).await
}

pub async fn replace_auction(
    ex: &mut PgConnection,
    data: &JsonValue,
) -> Result<AuctionId, sqlx::Error> {
    const QUERY: &str = r#"
WITH deleted AS (
    DELETE FROM auctions
)
INSERT INTO auctions (json)
VALUES ($1)
RETURNING id;
    "#;

    let (id,) = sqlx::query_as(QUERY).bind(data).fetch_one(ex).await?;
    Ok(id)
}
