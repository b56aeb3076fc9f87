pub(crate) mod output_registry;
pub(crate) mod store;
