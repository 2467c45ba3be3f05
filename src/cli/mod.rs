mod args;
mod paths;

pub use args::{AddCommand, CaptureArgs, Cli, Commands};
pub use paths::{read_payload, resolve_dir};
