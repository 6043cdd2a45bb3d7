pub mod names;

pub use names::NamesRepository;
