use mittiarts_store::{
    db::{create_pool, orm_from_pool, run_migrations},
    domain::status::{FulfillmentStatus, PaymentStatus},
    dto::{
        admin::ImportOrdersRequest,
        auth::{LoginRequest, RegisterRequest},
        season::UpdateSeasonRequest,
        wishlist::AddWishlistRequest,
    },
    entity::{
        admins::ActiveModel as AdminActive,
        orders::{Column as OrderCol, Entity as Orders},
        products::ActiveModel as ProductActive,
    },
    error::AppError,
    middleware::auth::{AuthUser, decode_token},
    models::SeasonMode,
    routes::params::{Pagination, ProductQuery},
    services::{
        admin_service, auth_service, cart_service, product_service, season_service,
        wishlist_service,
    },
    state::{AppState, Settings},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;
use uuid::Uuid;

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

// Register -> login -> session, season switching, wishlist move-to-cart and legacy import.
#[tokio::test]
async fn session_season_wishlist_and_import_flow() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
        return Ok(());
    };

    let pool = create_pool(&database_url).await?;
    let orm = orm_from_pool(&pool);
    run_migrations(&orm).await?;
    let state = AppState::new(
        pool,
        orm,
        Settings {
            jwt_secret: "test-secret".into(),
            low_stock_threshold: 5,
            shipping_fee: 5000,
            free_shipping_over: 1_000_000,
        },
    );

    // Session
    let email = format!("potter-{}@example.com", Uuid::new_v4());
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            email: email.to_uppercase(),
            password: "clay-and-fire".into(),
            display_name: Some("Potter".into()),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(registered.email, email);

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "clay-and-fire".into(),
            display_name: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "clay-and-fire".into(),
        },
    )
    .await?
    .data
    .expect("login");
    assert!(!login.session.is_admin);

    let user: AuthUser = decode_token(&login.token, &state.settings.jwt_secret)?;
    assert_eq!(user.user_id, registered.id);

    let forbidden = season_service::update_season(
        &state,
        &user,
        UpdateSeasonRequest {
            mode: SeasonMode::Ganesh,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // Promotion takes effect on the next call, without a new token.
    AdminActive {
        user_id: Set(user.user_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let session = auth_service::current_session(&state, &user)
        .await?
        .data
        .expect("session");
    assert!(session.is_admin);
    assert_eq!(session.display_name.as_deref(), Some("Potter"));

    // Season
    let idol = insert_product(&state, "Eco Ganesha", true).await?;
    let planter = insert_product(&state, "Hanging Planter", false).await?;

    season_service::update_season(
        &state,
        &user,
        UpdateSeasonRequest {
            mode: SeasonMode::Ganesh,
        },
    )
    .await?;
    let listed = product_ids(&state, false).await?;
    assert!(listed.contains(&idol));
    assert!(!listed.contains(&planter));

    season_service::update_season(
        &state,
        &user,
        UpdateSeasonRequest {
            mode: SeasonMode::Normal,
        },
    )
    .await?;
    let listed = product_ids(&state, false).await?;
    assert!(!listed.contains(&idol));
    assert!(listed.contains(&planter));
    let everything = product_ids(&state, true).await?;
    assert!(everything.contains(&idol) && everything.contains(&planter));

    // Wishlist
    wishlist_service::add_to_wishlist(&state, &user, AddWishlistRequest { product_id: planter })
        .await?;
    wishlist_service::add_to_wishlist(&state, &user, AddWishlistRequest { product_id: planter })
        .await?;
    let wishlist = wishlist_service::list_wishlist(&state, &user, Pagination::default())
        .await?
        .data
        .expect("wishlist");
    assert_eq!(wishlist.items.len(), 1);

    wishlist_service::move_to_cart(&state, &user, planter).await?;
    let wishlist = wishlist_service::list_wishlist(&state, &user, Pagination::default())
        .await?
        .data
        .expect("wishlist");
    assert!(wishlist.items.is_empty());
    let cart = cart_service::list_cart(&state, &user)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 1);

    // Moving a product that is no longer wishlisted leaves the cart alone.
    let moved = wishlist_service::move_to_cart(&state, &user, planter).await;
    assert!(matches!(moved, Err(AppError::NotFound)));
    let cart = cart_service::list_cart(&state, &user)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 1);
    assert_eq!(cart.lines[0].row_ids.len(), 1);

    // Legacy import
    let number = format!("LEG-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let docs = json!({
        "orders": [
            {
                "orderNumber": number,
                "createdAt": { "seconds": 1700000000, "nanoseconds": 0 },
                "status": "PROCESSING",
                "deliveryStatus": "DELIVERED",
                "paymentStatus": "completed",
                "totalAmount": 1250.5,
                "items": [{ "productId": planter, "quantity": 2 }],
                "deliveryDetails": { "company": "Delhivery", "consignmentNumber": "DL-1" }
            },
            {
                "orderNumber": number,
                "createdAt": "2023-11-14T22:13:20Z",
                "status": "PENDING"
            }
        ]
    });
    let request: ImportOrdersRequest = serde_json::from_value(docs)?;
    let summary = admin_service::import_orders(&state, &user, request)
        .await?
        .data
        .expect("import summary");
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped_duplicates, vec![number.clone()]);

    let imported = Orders::find()
        .filter(OrderCol::OrderNumber.eq(number.as_str()))
        .one(&state.orm)
        .await?
        .expect("imported order");
    assert_eq!(imported.fulfillment_status, FulfillmentStatus::Delivered);
    assert_eq!(imported.payment_status, PaymentStatus::Completed);
    assert_eq!(imported.total_amount, 125050);
    assert_eq!(imported.created_at.timestamp(), 1_700_000_000);

    let dashboard = admin_service::dashboard(&state, &user)
        .await?
        .data
        .expect("dashboard");
    assert!(dashboard.delivered_order_ids.contains(&imported.id));

    Ok(())
}

async fn insert_product(state: &AppState, name: &str, is_idol: bool) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{name} {}", Uuid::new_v4())),
        description: Set(Some("Test piece".into())),
        price: Set(50000),
        stock: Set(10),
        images: Set(json!(["/images/test.jpg"])),
        is_ganesh_idol: Set(is_idol),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn product_ids(state: &AppState, include_all: bool) -> anyhow::Result<Vec<Uuid>> {
    let query = ProductQuery {
        per_page: Some(100),
        include_all: Some(include_all),
        ..ProductQuery::default()
    };
    let products = product_service::list_products(state, query)
        .await?
        .data
        .expect("products");
    Ok(products.items.into_iter().map(|p| p.id).collect())
}
