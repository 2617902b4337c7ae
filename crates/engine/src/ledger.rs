//! Paid/owed balances under the equal-split rule.
//!
//! The ledger is never stored: it is recomputed from purchases and links on
//! every request.
//!
//! - `amount_paid(m)`: cost of every item bought through `m`'s purchases.
//! - `fair_share`: total spend divided by the number of members.
//! - `amount_owed(m) = fair_share - amount_paid(m)`: positive means `m` still
//!   owes the pool, negative means `m` is owed a refund.
//!
//! Amounts are plain `f64`; the owed amounts sum to zero only up to rounding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, GroceryItem, Link, Member, Purchase, ResultEngine};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: Uuid,
    pub name: String,
    pub amount_paid: f64,
    pub amount_owed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub total_spent: f64,
    pub fair_share: f64,
    /// One entry per member, in the order the members were given.
    pub balances: Vec<MemberBalance>,
}

impl Ledger {
    /// Compute the ledger from a snapshot of the store.
    ///
    /// Pending links are ignored. A bought link pointing at an unknown
    /// purchase or item is reported as `KeyNotFound`, as is an empty member
    /// set.
    pub fn compute(
        members: &[Member],
        purchases: &[Purchase],
        links: &[Link],
        items: &[GroceryItem],
    ) -> ResultEngine<Self> {
        if members.is_empty() {
            return Err(EngineError::KeyNotFound("no members".to_string()));
        }

        let payer_by_purchase: HashMap<Uuid, Uuid> =
            purchases.iter().map(|p| (p.id, p.member_id)).collect();
        let items_by_id: HashMap<Uuid, &GroceryItem> =
            items.iter().map(|item| (item.id, item)).collect();

        let mut paid: HashMap<Uuid, f64> = members.iter().map(|m| (m.id, 0.0)).collect();
        for link in links {
            let Some(purchase_id) = link.purchase_id() else {
                continue;
            };
            let payer = payer_by_purchase
                .get(&purchase_id)
                .ok_or_else(|| EngineError::KeyNotFound("purchase not exists".to_string()))?;
            let item = items_by_id
                .get(&link.grocery_item_id)
                .ok_or_else(|| EngineError::KeyNotFound("grocery_item not exists".to_string()))?;
            let amount = paid
                .get_mut(payer)
                .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
            *amount += item.cost();
        }

        let total_spent: f64 = members.iter().map(|m| paid[&m.id]).sum();
        let fair_share = total_spent / members.len() as f64;

        let balances = members
            .iter()
            .map(|member| {
                let amount_paid = paid[&member.id];
                MemberBalance {
                    member_id: member.id,
                    name: member.name.clone(),
                    amount_paid,
                    amount_owed: fair_share - amount_paid,
                }
            })
            .collect();

        Ok(Self {
            total_spent,
            fair_share,
            balances,
        })
    }

    pub fn balance(&self, member_id: Uuid) -> Option<&MemberBalance> {
        self.balances.iter().find(|b| b.member_id == member_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const EPS: f64 = 1e-4;

    fn member(name: &str) -> Member {
        Member::new(name.to_string(), format!("{}@example.org", name.to_lowercase()))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 7).unwrap()
    }

    #[test]
    fn equal_split_of_a_single_purchase() {
        let alice = member("Alice");
        let bob = member("Bob");
        let purchase = Purchase::new(alice.id, date());
        let milk = GroceryItem::new("Milk".to_string(), 2, 15.0);
        let bread = GroceryItem::new("Bread".to_string(), 1, 10.0);
        let links = vec![
            Link::bought(milk.id, purchase.id),
            Link::bought(bread.id, purchase.id),
        ];

        let ledger = Ledger::compute(
            &[alice.clone(), bob.clone()],
            &[purchase],
            &links,
            &[milk, bread],
        )
        .unwrap();

        assert!((ledger.total_spent - 40.0).abs() < EPS);
        assert!((ledger.fair_share - 20.0).abs() < EPS);

        let a = ledger.balance(alice.id).unwrap();
        assert!((a.amount_paid - 40.0).abs() < EPS);
        assert!((a.amount_owed + 20.0).abs() < EPS);

        let b = ledger.balance(bob.id).unwrap();
        assert_eq!(b.amount_paid, 0.0);
        assert!((b.amount_owed - 20.0).abs() < EPS);
    }

    #[test]
    fn pending_links_do_not_count() {
        let alice = member("Alice");
        let eggs = GroceryItem::new("Eggs".to_string(), 12, 0.3);
        let ledger = Ledger::compute(&[alice.clone()], &[], &[Link::pending(eggs.id)], &[eggs])
            .unwrap();

        assert_eq!(ledger.total_spent, 0.0);
        assert_eq!(ledger.fair_share, 0.0);
        assert_eq!(ledger.balance(alice.id).unwrap().amount_owed, 0.0);
    }

    #[test]
    fn owed_amounts_sum_to_zero() {
        let members: Vec<Member> = ["Ann", "Ben", "Cid"].into_iter().map(member).collect();
        let mut purchases = Vec::new();
        let mut links = Vec::new();
        let mut items = Vec::new();
        for (i, payer) in members.iter().enumerate() {
            let purchase = Purchase::new(payer.id, date());
            for j in 0..=i {
                let item = GroceryItem::new(format!("item-{i}-{j}"), (j + 1) as i32, 0.1 + j as f64 / 3.0);
                links.push(Link::bought(item.id, purchase.id));
                items.push(item);
            }
            purchases.push(purchase);
        }

        let ledger = Ledger::compute(&members, &purchases, &links, &items).unwrap();
        let owed: f64 = ledger.balances.iter().map(|b| b.amount_owed).sum();
        let paid: f64 = ledger.balances.iter().map(|b| b.amount_paid).sum();
        let bought: f64 = items.iter().map(GroceryItem::cost).sum();

        assert!(owed.abs() < EPS);
        assert!((paid - bought).abs() < EPS);
    }

    #[test]
    fn empty_member_set_is_not_found() {
        assert_eq!(
            Ledger::compute(&[], &[], &[], &[]),
            Err(EngineError::KeyNotFound("no members".to_string()))
        );
    }

    #[test]
    fn dangling_purchase_reference_is_reported() {
        let alice = member("Alice");
        let item = GroceryItem::new("Tea".to_string(), 1, 4.0);
        let link = Link::bought(item.id, Uuid::new_v4());
        assert_eq!(
            Ledger::compute(&[alice], &[], &[link], &[item]),
            Err(EngineError::KeyNotFound("purchase not exists".to_string()))
        );
    }
}
