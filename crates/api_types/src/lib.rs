use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a request, carried by every [`ServiceResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    NotFound,
    Created,
    Updated,
    Deleted,
    Error,
    Success,
}

/// Uniform result envelope for writes and errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub status: ServiceStatus,
    /// Id of the created record, set only for `created`.
    pub created_id: Option<Uuid>,
    /// Human readable messages, in order.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl ServiceResponse {
    pub fn new(status: ServiceStatus) -> Self {
        Self {
            status,
            created_id: None,
            messages: Vec::new(),
        }
    }

    pub fn created(id: Uuid) -> Self {
        Self {
            created_id: Some(id),
            ..Self::new(ServiceStatus::Created)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

pub mod member {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub name: String,
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberUpdate {
        /// Must match the id in the path.
        pub id: Uuid,
        pub name: String,
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: Uuid,
        pub name: String,
        pub email: String,
    }

    /// Names of the items bought by a member, alphabetical.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberItems {
        pub member_id: Uuid,
        pub items: Vec<String>,
    }
}

pub mod item {
    use super::*;

    /// An item bought right now by `member_id`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroceryItemNew {
        pub name: String,
        pub quantity: i32,
        pub unit_price: f64,
        pub member_id: Uuid,
        /// Defaults to today (UTC).
        pub date_purchased: Option<NaiveDate>,
    }

    /// An item to put on the pending list.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WantedItemNew {
        pub name: String,
        pub quantity: i32,
        pub unit_price: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroceryItemUpdate {
        /// Must match the id in the path.
        pub id: Uuid,
        pub name: String,
        pub quantity: i32,
        pub unit_price: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "status", rename_all = "snake_case")]
    pub enum ItemStatusView {
        Unlinked,
        Pending,
        Bought {
            purchase_id: Uuid,
            payer_name: String,
            date_purchased: NaiveDate,
        },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroceryItemView {
        pub id: Uuid,
        pub name: String,
        pub quantity: i32,
        pub unit_price: f64,
        /// `quantity * unit_price`.
        pub total_amount: f64,
        pub link: ItemStatusView,
    }

    /// A pending item, without link details.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingItemView {
        pub id: Uuid,
        pub name: String,
        pub quantity: i32,
        pub unit_price: f64,
    }
}

pub mod purchase {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseNew {
        pub member_id: Uuid,
        /// Defaults to today (UTC).
        pub date_purchased: Option<NaiveDate>,
        /// Items bought by this purchase. Absent records an empty purchase;
        /// a present list must name at least one item.
        #[serde(default)]
        pub item_ids: Option<Vec<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseUpdate {
        /// Must match the id in the path.
        pub id: Uuid,
        pub member_id: Uuid,
        pub date_purchased: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseView {
        pub purchase_id: Uuid,
        pub date_purchased: NaiveDate,
        pub payer_name: String,
        pub item_names: Vec<String>,
        pub total_amount: f64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PurchasePageQuery {
        pub member_id: Option<Uuid>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor, from `next_cursor`.
        ///
        /// Newest to older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchasePage {
        pub purchases: Vec<PurchaseView>,
        /// Opaque cursor for fetching the next page (older purchases).
        pub next_cursor: Option<String>,
    }
}

pub mod link {
    use super::*;

    /// Create a link. Without `purchase_id` the item is marked pending.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LinkNew {
        pub grocery_item_id: Uuid,
        pub purchase_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LinkUpdate {
        /// Must match the id in the path.
        pub id: Uuid,
        pub grocery_item_id: Uuid,
        pub purchase_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LinkView {
        pub id: Uuid,
        pub grocery_item_id: Uuid,
        pub purchase_id: Option<Uuid>,
        pub is_bought: bool,
    }
}

pub mod ledger {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub member_id: Uuid,
        pub name: String,
        pub amount_paid: f64,
        /// Positive: still owes the pool. Negative: is owed a refund.
        pub amount_owed: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerView {
        pub total_spent: f64,
        pub fair_share: f64,
        pub balances: Vec<BalanceView>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_snake_case_status() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ServiceResponse::created(id)).unwrap();
        assert_eq!(json["status"], "created");
        assert_eq!(json["created_id"], id.to_string());

        let json = serde_json::to_value(
            ServiceResponse::new(ServiceStatus::NotFound).with_message("member not exists"),
        )
        .unwrap();
        assert_eq!(json["status"], "not_found");
        assert!(json["created_id"].is_null());
        assert_eq!(json["messages"][0], "member not exists");
    }

    #[test]
    fn purchase_items_default_to_empty() {
        let body: purchase::PurchaseNew = serde_json::from_str(&format!(
            r#"{{"member_id":"{}","date_purchased":null}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(body.item_ids.is_none());
    }
}
