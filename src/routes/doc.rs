use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        aggregate::{DashboardSummary, FulfillmentCounts, TrendPoint},
        delivery::{DeliveryDetails, SkipReason, SkippedItem},
        legacy::{LegacyDeliveryDetails, LegacyOrder},
        status::{FulfillmentStatus, PaymentStatus},
        workflow::{FulfillmentAction, PaymentAction},
    },
    dto::{
        admin::{
            DeliveryOutcome, ImportOrdersRequest, ImportSummary, InventoryAdjustRequest,
            UpdatePaymentRequest,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest, SessionContext},
        cart::{
            AddToCartRequest, CartLineDto, CartMutation, CartView, OrphanCartRow,
            UpdateCartQuantityRequest,
        },
        orders::{CheckoutRequest, DeliveryAddress, OrderList, OrderView, PersonalInfo},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        season::UpdateSeasonRequest,
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    models::{Order, Product, Season, SeasonMode, User, WishlistItem},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, health, orders, params, products as product_routes, season, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        season::get_season,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        cart::purge_orphans,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::move_to_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_payment,
        admin::check_in,
        admin::save_delivery_details,
        admin::mark_delivered,
        admin::cancel_order,
        admin::dashboard,
        admin::import_orders,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::update_season
    ),
    components(
        schemas(
            User,
            Product,
            WishlistItem,
            Order,
            Season,
            SeasonMode,
            PaymentStatus,
            FulfillmentStatus,
            FulfillmentAction,
            PaymentAction,
            DeliveryDetails,
            SkipReason,
            SkippedItem,
            TrendPoint,
            FulfillmentCounts,
            DashboardSummary,
            LegacyOrder,
            LegacyDeliveryDetails,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            SessionContext,
            AddToCartRequest,
            UpdateCartQuantityRequest,
            CartLineDto,
            OrphanCartRow,
            CartView,
            CartMutation,
            AddWishlistRequest,
            WishlistProductList,
            PersonalInfo,
            DeliveryAddress,
            CheckoutRequest,
            OrderList,
            OrderView,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            UpdateSeasonRequest,
            UpdatePaymentRequest,
            InventoryAdjustRequest,
            ImportOrdersRequest,
            ImportSummary,
            DeliveryOutcome,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderView>,
            ApiResponse<OrderList>,
            ApiResponse<DashboardSummary>,
            ApiResponse<DeliveryOutcome>,
            ApiResponse<Season>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and session"),
        (name = "Season", description = "Seasonal merchandising mode"),
        (name = "Products", description = "Product catalogue"),
        (name = "Cart", description = "Consolidated shopping cart"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Orders", description = "Customer orders"),
        (name = "Admin", description = "Order workflow, delivery, dashboard and inventory"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_import_schemas() {
        let doc = ApiDoc::openapi();
        let components = doc.components.clone().expect("components");
        assert!(components.schemas.contains_key("LegacyOrder"));
        assert!(components.schemas.contains_key("LegacyDeliveryDetails"));
        assert!(doc.paths.paths.contains_key("/api/admin/orders/import"));
    }
}
