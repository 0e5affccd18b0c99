pub mod customer;
pub mod driver;
pub mod identity;
pub mod load;
pub mod notification;
pub mod rating;
