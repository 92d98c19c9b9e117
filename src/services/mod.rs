pub mod catalog;
pub mod checkout_service;
pub mod identity;
pub mod order_service;
