use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::dtos::order::{OrderFilter, OrderResponse, SaveOrderRequest};
use crate::dtos::DeleteParams;
use crate::error::AppError;
use crate::models::product::Product;
use crate::orders::OrderComposer;
use crate::state::AppState;
use crate::views::Confirm;

fn find_product(products: &[Product], id: i64) -> Result<&Product, AppError> {
    products
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))
}

/// One `(product_id, quantity)` per product, in request order, with repeated
/// products summed.
fn merged_lines(payload: &SaveOrderRequest) -> Result<Vec<(i64, i32)>, AppError> {
    let mut merged: Vec<(i64, i32)> = Vec::with_capacity(payload.lines.len());
    for line in &payload.lines {
        match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| AppError::validation("Quantity is too large"))?;
            }
            None => merged.push((line.product_id, line.quantity)),
        }
    }
    Ok(merged)
}

/// Applies the request header fields to the form.
fn apply_header(composer: &mut OrderComposer, payload: &SaveOrderRequest) {
    composer.select_customer(payload.customer_id);
    composer.set_description(payload.description.clone());
    composer.set_status(payload.status);
}

// GET /orders?filter...
#[instrument(skip(state))]
pub async fn get_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.gateway.list_orders().await?;
    let response = orders
        .into_iter()
        .filter(|o| o.matches(&filter))
        .map(OrderResponse::from)
        .collect();
    Ok(Json(response))
}

// GET /orders/:id
#[instrument(skip(state))]
pub async fn get_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .gateway
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    Ok(Json(OrderResponse::from(order)))
}

// POST /orders - Build the cart from the request lines and save it
#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<SaveOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let products = state.gateway.products().list().await?;

    let mut composer = OrderComposer::new();
    apply_header(&mut composer, &payload);
    for line in &payload.lines {
        composer.add_line(find_product(&products, line.product_id)?, line.quantity)?;
    }

    let order = composer.save(state.gateway.as_ref(), &products).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

// PUT /orders/:id - Replace header and lines of an existing order
#[instrument(skip(state, payload))]
pub async fn update_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<SaveOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let existing = state
        .gateway
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    let products = state.gateway.products().list().await?;

    let mut composer = OrderComposer::edit(&existing);
    apply_header(&mut composer, &payload);

    // Stored lines keep their captured price; only their quantity changes.
    for (product_id, quantity) in merged_lines(&payload)? {
        if composer.cart().contains(product_id) {
            composer.set_quantity(product_id, quantity)?;
        } else {
            composer.add_line(find_product(&products, product_id)?, quantity)?;
        }
    }
    for line in &existing.lines {
        if !payload.lines.iter().any(|l| l.product_id == line.product_id) {
            composer.remove_line(line.product_id);
        }
    }

    let order = composer.save(state.gateway.as_ref(), &products).await?;
    Ok(Json(OrderResponse::from(order)))
}

// DELETE /orders/:id?confirm=true - Lines go with the header; stock is not restored
#[instrument(skip(state))]
pub async fn delete_order(
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !params.confirm("Delete this order?") {
        return Err(AppError::validation("Deletion not confirmed"));
    }
    if !state.gateway.delete_order(id).await? {
        return Err(AppError::not_found("Order not found"));
    }
    info!(id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
