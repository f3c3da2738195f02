//! Calendar provider seams.
//!
//! The reliability layer does not talk to any calendar API itself. Providers
//! implement [`CalendarProvider`]; the [`Invoker`] wraps every provider call
//! as retry(measure(pooled call)) and adds the batch helpers.

mod event;
mod invoker;
mod memory;
mod provider;

pub use event::CalendarEvent;
pub use invoker::{Invoker, ProviderFactory};
pub use memory::InMemoryProvider;
pub use provider::{CalendarProvider, Operation};
