//! An in-memory storage backend. Nothing survives a restart, which makes it handy for tests and local experiments.
mod memory_impl;

pub use memory_impl::MemoryDatabase;
