use chrono::{Duration, Utc};
use marketplace_orders::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    middleware::auth::issue_token,
    models::Role,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let buyer_id = ensure_user(&orm, "buyer@example.com", "Demo Buyer", Role::Buyer).await?;
    let farm_id = ensure_user(&orm, "farm@example.com", "Green Farm", Role::Seller).await?;
    let orchard_id = ensure_user(&orm, "orchard@example.com", "Hill Orchard", Role::Seller).await?;

    seed_products(
        &orm,
        farm_id,
        &[("Organic Rice 5kg", 180_000), ("Free-range Eggs x10", 45_000)],
    )
    .await?;
    seed_products(
        &orm,
        orchard_id,
        &[("Mango 1kg", 60_000), ("Dragon Fruit 1kg", 40_000)],
    )
    .await?;

    let ttl = Duration::days(7);
    println!("Seed completed.");
    println!(
        "Buyer  {buyer_id}: {}",
        issue_token(buyer_id, Role::Buyer, &config.jwt_secret, ttl)?
    );
    println!(
        "Seller {farm_id}: {}",
        issue_token(farm_id, Role::Seller, &config.jwt_secret, ttl)?
    );
    println!(
        "Seller {orchard_id}: {}",
        issue_token(orchard_id, Role::Seller, &config.jwt_secret, ttl)?
    );
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        full_name: Set(full_name.to_string()),
        role: Set(role.as_str().to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn seed_products(
    orm: &OrmConn,
    seller_id: Uuid,
    products: &[(&str, i64)],
) -> anyhow::Result<()> {
    for (name, price) in products {
        let exists = Products::find()
            .filter(ProdCol::SellerId.eq(seller_id))
            .filter(ProdCol::Name.eq(*name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller_id),
            name: Set(name.to_string()),
            price: Set(*price),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products for seller {seller_id}");
    Ok(())
}
