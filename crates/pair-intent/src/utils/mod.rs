pub mod token_list;
pub mod units;
