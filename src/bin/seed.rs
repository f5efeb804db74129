use mittiarts_store::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    services::auth_service::hash_password,
};
use serde_json::json;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let admin_id = ensure_user(&pool, "admin@mittiarts.in", "admin123", "Studio Admin").await?;
    grant_admin(&pool, admin_id).await?;
    let user_id = ensure_user(&pool, "customer@mittiarts.in", "user123", "Asha").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    display_name: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, display_name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET display_name = EXCLUDED.display_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(display_name)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn grant_admin(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO admins (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, price in paise, stock, is_ganesh_idol)
    let products = vec![
        ("Terracotta Water Pot", "Hand-thrown matka that keeps water cool", 85000, 40, false),
        ("Glazed Tea Cups (Set of 4)", "Stoneware cups with a speckled glaze", 120000, 25, false),
        ("Clay Diya Pack", "Twelve hand-pressed oil lamps", 30000, 150, false),
        ("Hanging Planter", "Terracotta planter with jute rope", 65000, 3, false),
        ("Eco Ganesha (12 inch)", "Unbaked river-clay idol, dissolves at home", 250000, 15, true),
        ("Eco Ganesha (6 inch)", "Small unbaked clay idol with seed inside", 110000, 30, true),
    ];

    for (name, desc, price, stock, is_idol) in products {
        let slug = name.to_lowercase().replace(' ', "-");
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, images, is_ganesh_idol)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price as i64)
        .bind(stock as i32)
        .bind(json!([format!("/images/{slug}.jpg")]))
        .bind(is_idol)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
