//! Grocery item API endpoints

use api_types::{
    ServiceResponse, ServiceStatus,
    item::{
        GroceryItemNew, GroceryItemUpdate, GroceryItemView, ItemStatusView, PendingItemView,
        WantedItemNew,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, created, done, extract::JsonBody, parse_id, server::ServerState};

fn view(detail: engine::GroceryItemDetail) -> GroceryItemView {
    let link = match detail.status {
        engine::ItemStatus::Unlinked => ItemStatusView::Unlinked,
        engine::ItemStatus::Pending => ItemStatusView::Pending,
        engine::ItemStatus::Bought {
            purchase_id,
            payer_name,
            date_purchased,
        } => ItemStatusView::Bought {
            purchase_id,
            payer_name,
            date_purchased,
        },
    };
    GroceryItemView {
        id: detail.item.id,
        name: detail.item.name,
        quantity: detail.item.quantity,
        unit_price: detail.item.unit_price,
        total_amount: detail.total_amount,
        link,
    }
}

pub async fn list(
    State(state): State<ServerState>,
) -> Result<Json<Vec<GroceryItemView>>, ServerError> {
    let items = state.engine.list_grocery_items().await?;
    Ok(Json(items.into_iter().map(view).collect()))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<GroceryItemView>, ServerError> {
    let item_id = parse_id(&id, "grocery_item")?;
    let detail = state.engine.grocery_item(item_id).await?;
    Ok(Json(view(detail)))
}

/// Handle requests for an item bought now by a member
pub async fn add(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<GroceryItemNew>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let date = payload
        .date_purchased
        .unwrap_or_else(|| Utc::now().date_naive());
    let item_id = state
        .engine
        .add_grocery_item(
            engine::NewGroceryItem {
                name: payload.name,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
            },
            payload.member_id,
            date,
        )
        .await?;
    Ok(created(item_id))
}

/// Handle requests for an item to put on the pending list
pub async fn add_wanted(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<WantedItemNew>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let item_id = state
        .engine
        .add_wanted_item(engine::NewGroceryItem {
            name: payload.name,
            quantity: payload.quantity,
            unit_price: payload.unit_price,
        })
        .await?;
    Ok(created(item_id))
}

pub async fn pending(
    State(state): State<ServerState>,
) -> Result<Json<Vec<PendingItemView>>, ServerError> {
    let items = state.engine.pending_items().await?;
    Ok(Json(
        items
            .into_iter()
            .map(|item| PendingItemView {
                id: item.id,
                name: item.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    ))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<GroceryItemUpdate>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let item_id = parse_id(&id, "grocery_item")?;
    state
        .engine
        .update_grocery_item(
            item_id,
            engine::GroceryItemUpdate {
                id: payload.id,
                name: payload.name,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
            },
        )
        .await?;
    Ok(done(ServiceStatus::Updated))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let item_id = parse_id(&id, "grocery_item")?;
    state.engine.delete_grocery_item(item_id).await?;
    Ok(done(ServiceStatus::Deleted))
}
