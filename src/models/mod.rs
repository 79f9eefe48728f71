pub mod account;
pub mod call;
pub mod customer;
pub mod order;
pub mod payment;
pub mod product;
pub mod purchase;
