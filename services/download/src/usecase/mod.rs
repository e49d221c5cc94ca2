pub mod admin;
pub mod link;
pub mod redeem;
