pub mod distance;
pub mod ledger;
pub mod rates;
