/// In-memory reader and writer, always available. Handy for tests and for
/// feeding a step from data already loaded.
pub mod memory;

#[cfg(feature = "logger")]
/// This module provides a logger item writer, useful for debugging purposes.
pub mod logger;

#[cfg(feature = "csv")]
/// This module provides a CSV item reader.
pub mod csv;

#[cfg(feature = "rdbc")]
/// This module provides transactional database item writers.
pub mod rdbc;
