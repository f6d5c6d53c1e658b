//! Interception of member calls.
//!
//! A [`Thunk`] is the compiled behavior for one member and phase. It is handed
//! to an [`InterceptionFacility`], which installs it around the member and can
//! later remove everything a given owner installed.
//!
//! # Execution Flow
//!
//! ```text
//! call ──► before thunks ──► original ──► after thunks (with result slot) ──► result
//! ```

mod facility;
mod thunk;

pub use facility::{InterceptionFacility, InterceptorTable};
pub use thunk::{Thunk, ThunkFn};
