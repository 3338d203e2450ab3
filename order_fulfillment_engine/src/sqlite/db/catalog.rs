use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{MenuSlot, MenuSlotOption, Product, ProductId, StationId};

fn push_id_list<'a, I, T>(builder: &mut QueryBuilder<'a, Sqlite>, ids: I)
where
    I: IntoIterator<Item = T>,
    T: 'a + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite> + Send,
{
    builder.push("(");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(id);
    }
    list.push_unseparated(")");
}

pub async fn fetch_products(ids: &[ProductId], conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT id, name, price, is_active, product_type FROM products WHERE id IN ");
    push_id_list(&mut builder, ids.iter().map(|id| id.value()));
    builder.push(" ORDER BY id");
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn fetch_slots_for_products(
    product_ids: &[ProductId],
    conn: &mut SqliteConnection,
) -> Result<Vec<MenuSlot>, sqlx::Error> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT id, product_id, name, sequence FROM menu_slots WHERE product_id IN ");
    push_id_list(&mut builder, product_ids.iter().map(|id| id.value()));
    builder.push(" ORDER BY product_id, sequence, id");
    let slots = builder.build_query_as::<MenuSlot>().fetch_all(conn).await?;
    Ok(slots)
}

pub async fn fetch_slot_options(
    slot_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<MenuSlotOption>, sqlx::Error> {
    if slot_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT slot_id, option_product_id FROM menu_slot_options WHERE slot_id IN ");
    push_id_list(&mut builder, slot_ids.iter().copied());
    builder.push(" ORDER BY slot_id, option_product_id");
    let options = builder.build_query_as::<MenuSlotOption>().fetch_all(conn).await?;
    Ok(options)
}

pub async fn fetch_station_product_ids(
    station_id: StationId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductId>, sqlx::Error> {
    let ids: Vec<(i64,)> =
        sqlx::query_as("SELECT product_id FROM station_products WHERE station_id = $1 ORDER BY product_id")
            .bind(station_id.value())
            .fetch_all(conn)
            .await?;
    Ok(ids.into_iter().map(|(id,)| ProductId(id)).collect())
}
