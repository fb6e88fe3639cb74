//! Order placement

use chrono::Utc;
use kit::{AppError, DbScope, FrameworkError};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{order, order_item, product, user};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct OrderLine {
    pub product_id: i32,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewOrder {
    pub user_id: i32,
    #[validate(length(min = 1, message = "an order needs at least one item"), nested)]
    pub items: Vec<OrderLine>,
}

/// Place an order in one transaction
///
/// Stock is checked and decremented per line and the total is computed from
/// current prices. Any failure rolls back every write.
pub struct PlaceOrderAction;

impl PlaceOrderAction {
    pub async fn execute(
        &self,
        scope: &DbScope,
        new_order: NewOrder,
    ) -> Result<(order::Model, Vec<order_item::Model>), FrameworkError> {
        let txn = scope.begin().await?;

        if user::Entity::find_by_id(new_order.user_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(AppError::unprocessable(format!(
                "User {} does not exist",
                new_order.user_id
            ))
            .into());
        }

        let mut total: i64 = 0;
        let mut lines = Vec::with_capacity(new_order.items.len());
        for line in &new_order.items {
            let item = product::Entity::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::unprocessable(format!("Product {} does not exist", line.product_id))
                })?;

            if item.stock < line.quantity {
                return Err(insufficient_stock(&item).into());
            }

            // Decrement relative to the stored value so a concurrent order
            // that took the last units makes this update match no row.
            let decremented = product::Entity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.quantity),
                )
                .filter(product::Column::Id.eq(item.id))
                .filter(product::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;
            if decremented.rows_affected == 0 {
                return Err(insufficient_stock(&item).into());
            }

            total = i64::from(line.quantity)
                .checked_mul(item.price)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| AppError::unprocessable("Order total out of range"))?;
            lines.push((line.product_id, line.quantity, item.price));
        }

        let placed = order::ActiveModel {
            user_id: Set(new_order.user_id),
            status: Set(order::Status::Pending.as_str().to_string()),
            total: Set(total),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (product_id, quantity, unit_price) in lines {
            let item = order_item::ActiveModel {
                order_id: Set(placed.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;
        tracing::info!(order_id = placed.id, total, lines = items.len(), "order placed");
        Ok((placed, items))
    }
}

fn insufficient_stock(item: &product::Model) -> AppError {
    AppError::unprocessable(format!(
        "Insufficient stock for {}: {} left",
        item.name, item.stock
    ))
}
