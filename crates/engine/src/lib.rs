//! Shared grocery basket engine.
//!
//! Tracks grocery items, the purchases that bought them and the members who
//! paid, and derives who owes whom under an equal split.
//!
//! - [`Engine`] is the entry point; every operation runs in its own database
//!   transaction.
//! - [`Link`] carries the pending/bought state of an item.
//! - [`Ledger`] is the paid/owed projection.
//! - [`PurchaseHistory`] is the purchase history projection.

pub use error::EngineError;
pub use grocery_items::{GroceryItem, GroceryItemDetail, GroceryItemUpdate, ItemStatus, NewGroceryItem};
pub use item_links::{Link, LinkState, LinkUpdate};
pub use ledger::{Ledger, MemberBalance};
pub use members::{Member, MemberUpdate};
pub use ops::{Engine, EngineBuilder, PurchaseHistoryQuery};
pub use purchases::{Purchase, PurchaseHistory, PurchaseHistoryPage, PurchaseUpdate};

mod error;
mod grocery_items;
mod item_links;
mod ledger;
mod members;
mod ops;
mod purchases;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
