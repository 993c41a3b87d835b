//! Background synchronization: refresh poller, update checker and the
//! observer contract their events flow through.

mod events;
mod poller;
mod update_checker;

pub use events::*;
pub use poller::*;
pub use update_checker::*;
