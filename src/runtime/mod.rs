//! Task Runtime Module
//!
//! Data exchanged with the hosting engine for every task attempt.
//!
//! - [`value`]: Declared runtime values and their coercion rules
//! - [`request`]: Resource requests, limits and the final invocation

pub mod request;
pub mod value;

pub use request::{JobInvocation, ResourceLimits, ResourceRequest};
pub use value::{CoercionError, RuntimeValues, Value};
