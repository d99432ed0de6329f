pub mod board;
pub mod calendar;
pub mod clock;
pub mod error;
pub mod model;
pub mod notifications;
pub mod report;
pub mod repository;
pub mod service;
pub mod stats;
pub mod store;

pub use crate::error::HabitError;
pub use crate::service::{HabitService, HabitServiceBuilder};
