//! Domain models for blood-request matching.

mod blood_type;
mod hospital;
mod location;
mod request;
mod user;

pub use blood_type::*;
pub use hospital::*;
pub use location::*;
pub use request::*;
pub use user::*;
