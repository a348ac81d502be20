pub mod error;
pub mod features;
pub mod form;

pub use error::FormError;
pub use features::*;
pub use form::*;
