use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod grocery_items;
mod ledger;
mod links;
mod members;
mod purchases;

pub use purchases::PurchaseHistoryQuery;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

/// Run a write through `with_tx!` and settle lock contention.
///
/// SQLite refuses to upgrade a read transaction to a write one while another
/// connection is writing. The whole transaction is then rolled back and
/// `$recheck` reads the row once more outside of it: a missing row is
/// `KeyNotFound`, a row that is still there is `Conflict`.
macro_rules! with_write_tx {
    ($self:expr, $recheck:ident($id:expr), |$tx:ident| $body:expr) => {{
        let outcome: ResultEngine<_> = async { with_tx!($self, |$tx| $body) }.await;
        match outcome {
            Err(err) if err.is_busy() => {
                tracing::debug!(error = %err, "write lost a lock race, re-checking");
                Err($self.$recheck(&$self.database, $id).await)
            }
            outcome => outcome,
        }
    }};
}

pub(crate) use with_tx;
pub(crate) use with_write_tx;

/// Entry point of the basket engine.
///
/// The engine keeps no state besides the database handle: balances, pending
/// pools and histories are all derived from the store on each call.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
