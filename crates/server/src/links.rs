//! Link API endpoints

use api_types::{
    ServiceResponse, ServiceStatus,
    link::{LinkNew, LinkUpdate, LinkView},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, created, done, extract::JsonBody, parse_id, server::ServerState};

fn view(link: engine::Link) -> LinkView {
    LinkView {
        id: link.id,
        grocery_item_id: link.grocery_item_id,
        purchase_id: link.purchase_id(),
        is_bought: link.is_bought(),
    }
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<LinkView>>, ServerError> {
    let links = state.engine.list_links().await?;
    Ok(Json(links.into_iter().map(view).collect()))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<LinkView>, ServerError> {
    let link_id = parse_id(&id, "link")?;
    let link = state.engine.link(link_id).await?;
    Ok(Json(view(link)))
}

/// Link an item to a purchase, or mark it pending when no purchase is given
pub async fn add(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<LinkNew>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let link_id = match payload.purchase_id {
        Some(purchase_id) => {
            state
                .engine
                .link_item(payload.grocery_item_id, purchase_id)
                .await?
        }
        None => state.engine.mark_item_pending(payload.grocery_item_id).await?,
    };
    Ok(created(link_id))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<LinkUpdate>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let link_id = parse_id(&id, "link")?;
    state
        .engine
        .update_link(
            link_id,
            engine::LinkUpdate {
                id: payload.id,
                grocery_item_id: payload.grocery_item_id,
                purchase_id: payload.purchase_id,
            },
        )
        .await?;
    Ok(done(ServiceStatus::Updated))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let link_id = parse_id(&id, "link")?;
    state.engine.delete_link(link_id).await?;
    Ok(done(ServiceStatus::Deleted))
}
