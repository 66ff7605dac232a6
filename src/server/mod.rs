pub mod handler;
pub mod logic;
pub mod params;

pub use handler::CodeIntelServer;
