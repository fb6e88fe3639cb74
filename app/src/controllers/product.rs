use kit::{json, json_status, AppError, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use super::{deleted, ensure_exists, id};
use crate::models::{category, order_item, product, supplier};

#[derive(Debug, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    /// In cents
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: i64,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: i32,
    pub image: Option<String>,
    pub category_id: i32,
    pub supplier_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductChanges {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: Option<i32>,
    pub image: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
}

/// Query string of the product listing
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<i32>,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .post("/", store)
        .update("/{id}", update)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<product::Model, FrameworkError> {
    product::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Product"))
}

/// List products, optionally `?category_id=N`
pub async fn index(req: Request) -> Response {
    let mut query = product::Entity::find().order_by_asc(product::Column::Name);
    let filter: ProductFilter = req.query()?;
    if let Some(category_id) = filter.category_id {
        query = query.filter(product::Column::CategoryId.eq(category_id));
    }
    let products = query
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(products))
}

pub async fn show(req: Request) -> Response {
    json(serde_json::json!(find(&req).await?))
}

pub async fn store(req: Request) -> Response {
    let payload: ProductPayload = req.validated()?;
    let db = req.db()?.conn();
    ensure_exists::<category::Entity, _>(db, payload.category_id, "Category").await?;
    ensure_exists::<supplier::Entity, _>(db, payload.supplier_id, "Supplier").await?;

    let product = product::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        image: Set(payload.image),
        category_id: Set(payload.category_id),
        supplier_id: Set(payload.supplier_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(FrameworkError::from)?;

    json_status(201, serde_json::json!(product))
}

pub async fn update(req: Request) -> Response {
    let existing = find(&req).await?;
    let changes: ProductChanges = req.validated()?;
    let db = req.db()?.conn();

    let mut active: product::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = changes.price {
        active.price = Set(price);
    }
    if let Some(stock) = changes.stock {
        active.stock = Set(stock);
    }
    if let Some(image) = changes.image {
        active.image = Set(Some(image));
    }
    if let Some(category_id) = changes.category_id {
        ensure_exists::<category::Entity, _>(db, category_id, "Category").await?;
        active.category_id = Set(category_id);
    }
    if let Some(supplier_id) = changes.supplier_id {
        ensure_exists::<supplier::Entity, _>(db, supplier_id, "Supplier").await?;
        active.supplier_id = Set(supplier_id);
    }

    let product = active.update(db).await.map_err(FrameworkError::from)?;
    json(serde_json::json!(product))
}

pub async fn destroy(req: Request) -> Response {
    let product = find(&req).await?;
    let db = req.db()?.conn();

    let ordered = order_item::Entity::find()
        .filter(order_item::Column::ProductId.eq(product.id))
        .count(db)
        .await
        .map_err(FrameworkError::from)?;
    if ordered > 0 {
        return Err(AppError::conflict("Product is part of an order").into());
    }

    product::Entity::delete_by_id(product.id)
        .exec(db)
        .await
        .map_err(FrameworkError::from)?;
    deleted("Product")
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use serde_json::json;

    #[tokio::test]
    async fn products_reference_category_and_supplier() {
        let app = TestApp::new().await;
        let (category_id, supplier_id) = app.catalog().await;

        let missing_supplier = app
            .send(
                "POST",
                "/api/products",
                json!({ "name": "Rake", "price": 1500, "stock": 3,
                        "category_id": category_id, "supplier_id": 404 }),
            )
            .await;
        assert_eq!(missing_supplier.status_code(), 422);

        let negative = app
            .send(
                "POST",
                "/api/products",
                json!({ "name": "Rake", "price": -1, "stock": 3,
                        "category_id": category_id, "supplier_id": supplier_id }),
            )
            .await;
        assert_eq!(negative.status_code(), 422);

        let created = app
            .send(
                "POST",
                "/api/products",
                json!({ "name": "Rake", "price": 1500, "stock": 3, "image": "/uploads/rake.png",
                        "category_id": category_id, "supplier_id": supplier_id }),
            )
            .await;
        assert_eq!(created.status_code(), 201);

        let filtered = app
            .call("GET", &format!("/api/products?category_id={}", category_id))
            .await;
        assert_eq!(filtered.json_body().unwrap().as_array().unwrap().len(), 1);

        let other = app
            .call("GET", &format!("/api/products?category_id={}", category_id + 1))
            .await;
        assert_eq!(other.json_body(), Some(json!([])));

        assert_eq!(category_id, 1);
        let encoded = app.call("GET", "/api/products?category_id=%31").await;
        assert_eq!(encoded.status_code(), 200);
        assert_eq!(encoded.json_body().unwrap().as_array().unwrap().len(), 1);

        let malformed = app.call("GET", "/api/products?category_id=abc").await;
        assert_eq!(malformed.status_code(), 400);
    }

    #[tokio::test]
    async fn ordered_products_cannot_be_deleted() {
        let app = TestApp::new().await;
        let (category_id, supplier_id) = app.catalog().await;
        let product = app
            .send(
                "POST",
                "/api/products",
                json!({ "name": "Hose", "price": 900, "stock": 4,
                        "category_id": category_id, "supplier_id": supplier_id }),
            )
            .await
            .json_body()
            .unwrap()["id"]
            .clone();
        let user = app
            .send(
                "POST",
                "/api/users",
                json!({ "name": "Gil", "email": "gil@shop.test", "password": "long-enough" }),
            )
            .await
            .json_body()
            .unwrap()["id"]
            .clone();
        let placed = app
            .send(
                "POST",
                "/api/orders",
                json!({ "user_id": user, "items": [{ "product_id": product, "quantity": 1 }] }),
            )
            .await;
        assert_eq!(placed.status_code(), 201);

        let refused = app.call("DELETE", &format!("/api/products/{}", product)).await;
        assert_eq!(refused.status_code(), 409);
        assert_eq!(
            refused.json_body(),
            Some(json!({ "message": "Product is part of an order" }))
        );

        let still_there = app.call("GET", &format!("/api/products/{}", product)).await;
        assert_eq!(still_there.status_code(), 200);
    }
}
