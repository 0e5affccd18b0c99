pub mod identities;
pub mod loads;
pub mod notifications;
pub mod ratings;
