//! Convenient glob import for building producers and MIB tables.
//!
//! # Usage
//!
//! ```rust,no_run
//! use agentx_subagent::prelude::*;
//! ```
//!
//! This imports the core wire-independent types ([`Oid`], [`Value`],
//! [`VarBind`]), error handling ([`Error`], [`Result`]), the producer trait
//! and its supporting types, and [`MibBuilder`] for composing a
//! [`MibTable`](crate::mib::MibTable).

pub use crate::error::{Error, Result};
pub use crate::handler::{
    BoxFuture, GetNextResult, GetResult, MibProducer, OidTable, RequestContext, Response,
    SetResult,
};
pub use crate::mib::{MibBuilder, MibTable};
pub use crate::oid::Oid;
pub use crate::value::Value;
pub use crate::varbind::VarBind;

#[doc(no_inline)]
pub use crate::oid;
