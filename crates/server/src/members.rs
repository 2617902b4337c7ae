//! Member API endpoints

use api_types::{
    ServiceResponse, ServiceStatus,
    member::{MemberItems, MemberNew, MemberUpdate, MemberView},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, created, done, extract::JsonBody, parse_id, server::ServerState};

fn view(member: engine::Member) -> MemberView {
    MemberView {
        id: member.id,
        name: member.name,
        email: member.email,
    }
}

/// Handle requests for listing every member
pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<MemberView>>, ServerError> {
    let members = state.engine.list_members().await?;
    Ok(Json(members.into_iter().map(view).collect()))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MemberView>, ServerError> {
    let member_id = parse_id(&id, "member")?;
    let member = state.engine.member(member_id).await?;
    Ok(Json(view(member)))
}

/// Handle requests for creating a new member
pub async fn add(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<MemberNew>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let member_id = state
        .engine
        .add_member(&payload.name, &payload.email)
        .await?;
    Ok(created(member_id))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<MemberUpdate>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let member_id = parse_id(&id, "member")?;
    state
        .engine
        .update_member(
            member_id,
            engine::MemberUpdate {
                id: payload.id,
                name: payload.name,
                email: payload.email,
            },
        )
        .await?;
    Ok(done(ServiceStatus::Updated))
}

/// Delete a member. Their purchases go too and the items return to pending.
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ServiceResponse>), ServerError> {
    let member_id = parse_id(&id, "member")?;
    state.engine.delete_member(member_id).await?;
    Ok(done(ServiceStatus::Deleted))
}

/// Items bought by the member, alphabetical
pub async fn items(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MemberItems>, ServerError> {
    let member_id = parse_id(&id, "member")?;
    let items = state.engine.items_bought_by_member(member_id).await?;
    Ok(Json(MemberItems { member_id, items }))
}
