//! Demo application routes.

pub mod greet;

pub use greet::GreetService;
