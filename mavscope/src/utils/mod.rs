//! Common utils.

#[cfg(any(test, feature = "test_utils"))]
pub mod test;
