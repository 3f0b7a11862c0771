//! `SeaORM` Entity prelude

pub use super::state_purchases::Entity as StatePurchases;
