pub mod monthly;
pub mod ytd;

pub use monthly::{aggregate_monthly, dedup_by_date};
pub use ytd::ytd_summary;
