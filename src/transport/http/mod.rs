pub mod error;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod carts;
    pub mod categories;
    pub mod common;
    pub mod health;
    pub mod products;
    pub mod reviews;
    pub mod users;
}

pub use error::ApiError;
pub use router::{create_router, ApiDoc};
pub use types::{ApiResponse, AppState};
