//! Purchase API endpoints

use api_types::{
    ServiceResponse, ServiceStatus,
    purchase::{PurchaseNew, PurchasePage, PurchasePageQuery, PurchaseUpdate, PurchaseView},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::PurchaseHistoryQuery;

use crate::{
    ServerError, created, done,
    extract::{JsonBody, QueryParams},
    parse_id,
    server::ServerState,
};

fn view(history: engine::PurchaseHistory) -> PurchaseView {
    PurchaseView {
        purchase_id: history.purchase_id,
        date_purchased: history.date_purchased,
        payer_name: history.payer_name,
        item_names: history.item_names,
        total_amount: history.total_amount,
    }
}

/// Handle requests for the whole purchase history, newest first
pub async fn list(
    State(state): State<ServerState>,
) -> Result<Json<Vec<PurchaseView>>, ServerError> {
    let purchases = state.engine.list_purchases().await?;
    Ok(Json(purchases.into_iter().map(view).collect()))
}

/// Handle requests for one page of the purchase history
pub async fn page(
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<PurchasePageQuery>,
) -> Result<Json<PurchasePage>, ServerError> {
    let page = state
        .engine
        .purchase_history_page(PurchaseHistoryQuery {
            member_id: query.member_id,
            limit: query.limit,
            cursor: query.cursor,
        })
        .await?;

    Ok(Json(PurchasePage {
        purchases: page.items.into_iter().map(view).collect(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseView>, ServerError> {
    let purchase_id = parse_id(&id, "purchase")?;
    let history = state.engine.purchase_history(purchase_id).await?;
    Ok(Json(view(history)))
}

/// Record a purchase; listed items are marked as bought by it.
///
/// Without `item_ids` the purchase is recorded empty.
pub async fn add(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<PurchaseNew>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let date = payload
        .date_purchased
        .unwrap_or_else(|| Utc::now().date_naive());
    let purchase_id = match payload.item_ids {
        None => state.engine.add_purchase(payload.member_id, date).await?,
        Some(item_ids) => {
            state
                .engine
                .add_purchase_with_items(payload.member_id, date, &item_ids)
                .await?
        }
    };
    Ok(created(purchase_id))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<PurchaseUpdate>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let purchase_id = parse_id(&id, "purchase")?;
    state
        .engine
        .update_purchase(
            purchase_id,
            engine::PurchaseUpdate {
                id: payload.id,
                member_id: payload.member_id,
                date_purchased: payload.date_purchased,
            },
        )
        .await?;
    Ok(done(ServiceStatus::Updated))
}

/// Delete a purchase, sending its items back to pending
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let purchase_id = parse_id(&id, "purchase")?;
    state.engine.delete_purchase(purchase_id).await?;
    Ok(done(ServiceStatus::Deleted))
}

pub async fn link_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let purchase_id = parse_id(&id, "purchase")?;
    let item_id = parse_id(&item_id, "grocery_item")?;
    let link_id = state.engine.link_item(item_id, purchase_id).await?;
    Ok(created(link_id))
}

pub async fn unlink_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let purchase_id = parse_id(&id, "purchase")?;
    let item_id = parse_id(&item_id, "grocery_item")?;
    state.engine.unlink_item(item_id, purchase_id).await?;
    Ok(done(ServiceStatus::Deleted))
}
