pub mod cb_future;
pub mod cb_race;
pub mod cb_stream;
pub mod object;
pub mod require;
pub mod vendor;
