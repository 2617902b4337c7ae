use api_types::{ServiceResponse, ServiceStatus};
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use uuid::Uuid;

pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod extract;
mod grocery_items;
mod ledger;
mod links;
mod members;
mod purchases;
mod server;

pub mod types {
    pub use api_types::{ServiceResponse, ServiceStatus};

    pub mod member {
        pub use api_types::member::{MemberItems, MemberNew, MemberUpdate, MemberView};
    }

    pub mod item {
        pub use api_types::item::{
            GroceryItemNew, GroceryItemUpdate, GroceryItemView, ItemStatusView, PendingItemView,
            WantedItemNew,
        };
    }

    pub mod purchase {
        pub use api_types::purchase::{
            PurchaseNew, PurchasePage, PurchasePageQuery, PurchaseUpdate, PurchaseView,
        };
    }

    pub mod link {
        pub use api_types::link::{LinkNew, LinkUpdate, LinkView};
    }

    pub mod ledger {
        pub use api_types::ledger::{BalanceView, LedgerView};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Timeout,
    /// A body or query string the extractor refused, with its status.
    Rejection(StatusCode, String),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> (StatusCode, ServiceStatus) {
    match err {
        EngineError::KeyNotFound(_) => (StatusCode::NOT_FOUND, ServiceStatus::NotFound),
        EngineError::Conflict(_) => (StatusCode::CONFLICT, ServiceStatus::Error),
        EngineError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ServiceStatus::Error),
        EngineError::ExistingKey(_)
        | EngineError::InvalidInput(_)
        | EngineError::IdMismatch(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidCursor(_) => (StatusCode::UNPROCESSABLE_ENTITY, ServiceStatus::Error),
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            format!("database error: {db_err}")
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (code, status, message) = match self {
            ServerError::Engine(err) => {
                let (code, status) = status_for_engine_error(&err);
                (code, status, message_for_engine_error(err))
            }
            ServerError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                ServiceStatus::Error,
                "request timed out".to_string(),
            ),
            ServerError::Rejection(code, message) => (code, ServiceStatus::Error, message),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, ServiceStatus::Error, err),
        };

        (code, Json(ServiceResponse::new(status).with_message(message))).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Parse an id taken from the request path.
fn parse_id(value: &str, label: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(value)
        .map_err(|_| ServerError::Engine(EngineError::InvalidId(format!("invalid {label} id"))))
}

/// `201 Created` with the envelope carrying the new id.
fn created(id: Uuid) -> (StatusCode, Json<ServiceResponse>) {
    (StatusCode::CREATED, Json(ServiceResponse::created(id)))
}

fn done(status: ServiceStatus) -> (StatusCode, Json<ServiceResponse>) {
    (StatusCode::OK, Json(ServiceResponse::new(status)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::KeyNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        assert_eq!(
            status_of(EngineError::Conflict("x".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn engine_validation_maps_to_422() {
        for err in [
            EngineError::ExistingKey("x".to_string()),
            EngineError::InvalidInput("x".to_string()),
            EngineError::IdMismatch("x".to_string()),
            EngineError::InvalidId("x".to_string()),
            EngineError::InvalidCursor("x".to_string()),
        ] {
            assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn engine_database_maps_to_500() {
        let err = EngineError::Database(sea_orm::DbErr::Custom("disk full".to_string()));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn timeout_maps_to_408() {
        assert_eq!(
            ServerError::Timeout.into_response().status(),
            StatusCode::REQUEST_TIMEOUT
        );
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejection_keeps_its_status() {
        let res =
            ServerError::Rejection(StatusCode::UNSUPPORTED_MEDIA_TYPE, "no json".to_string())
                .into_response();
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn path_ids_must_be_uuids() {
        assert!(parse_id(&Uuid::new_v4().to_string(), "member").is_ok());
        assert!(matches!(
            parse_id("42", "member"),
            Err(ServerError::Engine(EngineError::InvalidId(_)))
        ));
    }
}
