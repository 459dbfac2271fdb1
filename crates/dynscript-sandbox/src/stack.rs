//! Stack headroom for script evaluation.
//!
//! Built-ins that call back into script code (`Array.prototype.map`,
//! getters, `require`) recurse on the Rust stack, and the engine's parser
//! is recursive too. Evaluation therefore always starts with a wide margin.

const RED_ZONE: usize = 32 * 1024 * 1024; // 32MB
const STACK_SIZE: usize = 256 * 1024 * 1024; // 256MB

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_SIZE, f)
}
