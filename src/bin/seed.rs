use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use storefront_orders::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        DiscountCodes, Products,
        discount_codes::{ActiveModel as CodeActive, Column as CodeCol},
        products::{ActiveModel as ProductActive, Column as ProdCol},
    },
    middleware::auth::issue_token,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url, config.max_connections).await?;
    run_migrations(&orm).await?;

    seed_products(&orm).await?;
    seed_discount_codes(&orm).await?;

    // Tokens are only printed when a signing secret is configured.
    if std::env::var("JWT_SECRET").is_ok() {
        let admin_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let admin_token = issue_token(admin_id, "admin", Duration::days(7))?;
        let user_token = issue_token(user_id, "user", Duration::days(7))?;
        println!("Admin {admin_id}: {admin_token}");
        println!("User {user_id}: {user_token}");
    }

    println!("Seed completed");
    Ok(())
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let products = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 550000, 50, false),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120000, 100, false),
        ("Rust Sticker Pack", "Decorate your laptop", 50000, 0, true),
        ("E-book: Async Rust", "Learn async Rust patterns", 250000, 0, true),
    ];

    for (name, desc, price, stock, unlimited) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(desc.to_string())),
            price: Set(price),
            stock_supplier: Set(stock),
            stock_sold: Set(0),
            unlimited: Set(unlimited),
            disabled: Set(false),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_discount_codes(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let exists = DiscountCodes::find()
        .filter(CodeCol::Code.eq("WELCOME10"))
        .one(orm)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    CodeActive {
        id: Set(Uuid::new_v4()),
        code: Set("WELCOME10".into()),
        description: Set("10% off the first order".into()),
        percentage_bps: Set(1000),
        active: Set(true),
        starts_at: Set(None),
        expires_at: Set(Some((Utc::now() + Duration::days(90)).into())),
        uses_max: Set(Some(500)),
        uses_per_user: Set(Some(1)),
        uses_current: Set(0),
        minimum_amount: Set(Some(100000)),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Seeded discount codes");
    Ok(())
}
