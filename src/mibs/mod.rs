//! Worked MIB examples against the [`crate::db`] adapter.
//!
//! Each submodule pairs a [`crate::handler::MibProducer`] (answering
//! Get/GetNext against an in-memory snapshot) with a [`crate::updater::Updater`]
//! (refreshing that snapshot from the database on the background runtime's
//! schedule). The snapshot itself is an immutable `Arc<Snapshot>` held in a
//! `std::sync::Mutex`, replaced wholesale on every refresh, so the producer
//! - read by the session task - only ever holds the lock long enough to
//! clone the `Arc`, never blocking on or observing a torn write from the
//! updater.

pub mod arp;
pub mod fdb;
pub mod interfaces;
