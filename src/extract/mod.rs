pub(crate) mod block;
pub(crate) mod extractor;
pub(crate) mod markers;
