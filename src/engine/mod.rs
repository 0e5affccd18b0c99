pub mod accounts;
pub mod approval;
pub mod lifecycle;
pub mod notify;
pub mod rating;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod test_support;
