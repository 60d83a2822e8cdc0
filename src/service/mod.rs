pub mod backup;
pub mod copy;
pub mod enumerate;
pub mod environment;
pub mod event_bus;
pub mod hash;
pub mod history;
pub mod listeners;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;
