use kit::{Router, Settings};

use crate::controllers::{auth, category, city, order, product, province, supplier, user};

/// Mount every resource router under its `/api` prefix
pub fn register(settings: &Settings) -> Router {
    Router::new()
        .group("/api/categories", category::routes)
        .group("/api/suppliers", supplier::routes)
        .group("/api/provinces", province::routes)
        .group("/api/users", user::routes)
        .group("/api/cities", city::routes)
        .group("/api/products", product::routes)
        .group("/api/auth", auth::routes(settings.auth.clone()))
        .group("/api/orders", order::routes)
}
