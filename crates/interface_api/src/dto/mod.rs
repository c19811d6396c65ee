//! Request/response data transfer objects
//!
//! Wire shapes use camelCase keys. Identifier, month and enum fields arrive
//! as plain strings and are parsed here or in the handlers, so a malformed
//! value surfaces as a validation error instead of a framework rejection.

pub mod beat;
pub mod coverage;
pub mod directory;
pub mod visit;
