use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products},
    error::AppResult,
};

/// Maps each known product to the seller that owns it. Unknown ids are left out.
pub async fn resolve_sellers_for_products<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Uuid>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, Uuid)> = Products::find()
        .select_only()
        .column(ProdCol::Id)
        .column(ProdCol::SellerId)
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows.into_iter().collect())
}
