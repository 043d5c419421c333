//! Storefront domain: value objects, aggregates, events and catalog search.
pub mod value_objects;
pub mod aggregates;
pub mod events;
pub mod search;
