pub mod environ;
pub mod inspect;
pub mod kill;
pub mod metric;
pub mod platform;
pub mod process;
pub mod table;
