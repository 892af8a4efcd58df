//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod profile;

pub use product::{ImageUpload, Product, ProductInput, ACCEPTED_IMAGE_TYPES, MAX_IMAGE_BYTES};
pub use order::{
    ContactDetails, NewOrder, NewOrderLine, Order, OrderError, OrderLine, OrderLineDetail, OrderStatus, OrderWithLines,
};
pub use cart::{Cart, CartLine};
pub use profile::{Profile, ProfileUpdate};
