pub mod filter;
pub mod output;
