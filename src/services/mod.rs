pub mod invoicing;
pub mod lifecycle;
pub mod store;
