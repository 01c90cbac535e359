#[cfg(feature = "framing")]
pub mod framing;

#[cfg(feature = "analyzer")]
pub mod analyzer;
