pub mod dates;
pub mod deposit;
pub mod ledger;
pub mod office;

pub use deposit::{Deposit, LineItem};
pub use ledger::{ConsolidatedLedger, Summary};
pub use office::Office;
