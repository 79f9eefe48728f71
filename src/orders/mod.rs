//! Order composition: a cart of product lines validated against stock and
//! saved as one unit through the gateway.

pub mod cart;
pub mod composer;

pub use cart::{Cart, CartError};
pub use composer::{OrderComposer, Phase};
