pub mod names;

pub use names::{AddNameRequest, Envelope, HealthResponse, NameRecord, NamesResponse};
