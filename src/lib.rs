mod error;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

mod app;
mod cleanup;
mod cli;
mod cue;
mod encoding;
mod interrupt;
mod output;
mod scan;
mod split;
mod tag;
mod tools;
mod types;

pub use app::run;
