//! Infrastructure layer: event store, aggregate loading, unit of work, read models.

pub mod error;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod repository;
pub mod unit_of_work;


pub use error::PersistenceError;
pub use repository::AggregateRepository;
pub use unit_of_work::UnitOfWork;
