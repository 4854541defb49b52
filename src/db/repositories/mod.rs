pub(crate) mod intervals;
pub(crate) mod samples;
pub(crate) mod sessions;
