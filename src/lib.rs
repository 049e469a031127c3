//! Async AgentX (RFC 2741) subagent framework.
//!
//! This crate implements the subagent side of RFC 2741: a process that
//! dials a local SNMP master agent over a Unix-domain stream socket,
//! registers ownership of one or more OID subtrees, and answers
//! Get/GetNext/GetBulk/Set requests against application-supplied [`MibProducer`]
//! implementations.
//!
//! # Layout
//!
//! - [`wire`] - the RFC 2741 PDU codec.
//! - [`oid`], [`value`], [`varbind`] - the core value types the wire and MIB
//!   layers are built from.
//! - [`handler`] - the [`MibProducer`] trait applications implement.
//! - [`mib`] - [`MibBuilder`]/[`MibTable`], composing producers into a
//!   registry.
//! - [`agent`] - the supervisor tying together the session and updater
//!   tasks, and the four-phase Set protocol.
//! - [`session`] - the connection state machine talking to the master agent.
//! - [`updater`] - the periodic background refresh runtime.
//! - [`db`] - the external key-value adapter trait MIB examples read from.
//! - [`mibs`] - worked MIB examples (IF-MIB interfaces, IP-MIB ARP, FDB).
//! - [`cli`] - process wiring for the `agentx-subagentd` binary (`cli` feature).
//!
//! [`MibProducer`]: handler::MibProducer
//! [`MibBuilder`]: mib::MibBuilder
//! [`MibTable`]: mib::MibTable

pub mod agent;
#[cfg(feature = "cli")]
pub mod cli;
pub mod db;
pub mod error;
pub mod handler;
pub mod mib;
pub mod mibs;
pub mod oid;
pub mod prelude;
pub mod session;
pub mod updater;
mod util;
pub mod value;
pub mod varbind;
pub mod wire;

pub use error::{Error, Result};
pub use oid::Oid;
pub use value::Value;
pub use varbind::VarBind;
