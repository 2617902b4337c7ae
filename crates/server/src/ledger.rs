//! Ledger API endpoints

use api_types::ledger::{BalanceView, LedgerView};
use axum::{
    Json,
    extract::{Path, State},
};

use crate::{ServerError, parse_id, server::ServerState};

fn balance_view(balance: engine::MemberBalance) -> BalanceView {
    BalanceView {
        member_id: balance.member_id,
        name: balance.name,
        amount_paid: balance.amount_paid,
        amount_owed: balance.amount_owed,
    }
}

/// Paid and owed amounts of every member
pub async fn get(State(state): State<ServerState>) -> Result<Json<LedgerView>, ServerError> {
    let ledger = state.engine.ledger().await?;
    Ok(Json(LedgerView {
        total_spent: ledger.total_spent,
        fair_share: ledger.fair_share,
        balances: ledger.balances.into_iter().map(balance_view).collect(),
    }))
}

pub async fn member(
    State(state): State<ServerState>,
    Path(member_id): Path<String>,
) -> Result<Json<BalanceView>, ServerError> {
    let member_id = parse_id(&member_id, "member")?;
    let balance = state.engine.member_balance(member_id).await?;
    Ok(Json(balance_view(balance)))
}
