use crate::storage::ReviewStats;
use crate::transport::http::handlers::{carts, categories, health, products, reviews, users};
use crate::transport::http::types::{
    AddToCartRequest, ApiResponse, AppState, CartQuantityRequest, CategoryInput, ProductInput,
    ReviewInput, UserInput,
};
use axum::routing::{get, patch, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        products::list_products_handler,
        products::get_product_handler,
        products::get_product_details_handler,
        products::create_product_handler,
        products::update_product_handler,
        products::delete_product_handler,
        categories::list_categories_handler,
        categories::get_category_handler,
        categories::get_category_details_handler,
        categories::create_category_handler,
        categories::update_category_handler,
        categories::delete_category_handler,
        users::list_users_handler,
        users::get_user_handler,
        users::get_user_details_handler,
        users::create_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        reviews::list_reviews_handler,
        reviews::search_reviews_handler,
        reviews::product_reviews_handler,
        reviews::review_stats_handler,
        reviews::like_review_handler,
        reviews::get_review_handler,
        reviews::get_review_details_handler,
        reviews::create_review_handler,
        reviews::update_review_handler,
        reviews::delete_review_handler,
        carts::add_to_cart_handler,
        carts::get_cart_handler,
        carts::update_cart_quantity_handler,
        carts::remove_from_cart_handler
    ),
    components(schemas(
        ApiResponse,
        ReviewStats,
        AddToCartRequest,
        CartQuantityRequest,
        CategoryInput,
        ProductInput,
        UserInput,
        ReviewInput
    )),
    tags((name = "storefront", description = "Products, categories, users, reviews and shopping carts"))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/products",
            get(products::list_products_handler).post(products::create_product_handler),
        )
        .route(
            "/products/:id",
            get(products::get_product_handler)
                .patch(products::update_product_handler)
                .delete(products::delete_product_handler),
        )
        .route("/products/:id/details", get(products::get_product_details_handler))
        .route(
            "/categories",
            get(categories::list_categories_handler).post(categories::create_category_handler),
        )
        .route(
            "/categories/:id",
            get(categories::get_category_handler)
                .patch(categories::update_category_handler)
                .delete(categories::delete_category_handler),
        )
        .route(
            "/categories/:id/details",
            get(categories::get_category_details_handler),
        )
        .route(
            "/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/users/:id",
            get(users::get_user_handler)
                .patch(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route("/users/:id/details", get(users::get_user_details_handler))
        .route(
            "/reviews",
            get(reviews::list_reviews_handler).post(reviews::create_review_handler),
        )
        .route("/reviews/search", get(reviews::search_reviews_handler))
        .route(
            "/reviews/product/:product_id",
            get(reviews::product_reviews_handler),
        )
        .route(
            "/reviews/product/:product_id/stats",
            get(reviews::review_stats_handler),
        )
        .route(
            "/reviews/:id",
            get(reviews::get_review_handler)
                .patch(reviews::update_review_handler)
                .delete(reviews::delete_review_handler),
        )
        .route("/reviews/:id/details", get(reviews::get_review_details_handler))
        .route("/reviews/:id/like", patch(reviews::like_review_handler))
        .route("/shopping-cart", post(carts::add_to_cart_handler))
        .route("/shopping-cart/:user_id", get(carts::get_cart_handler))
        .route(
            "/shopping-cart/:user_id/:product_id",
            patch(carts::update_cart_quantity_handler).delete(carts::remove_from_cart_handler),
        )
        .with_state(app_state)
}
