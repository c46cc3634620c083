//! Tasks that make up the application as well as the resources they use.
pub mod alarm_loop;
pub mod buttons;
pub mod indicator;
pub mod network;
pub mod resources;
pub mod schedule;
pub mod time_sync;
