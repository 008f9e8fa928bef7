pub mod launcher;

pub use launcher::{build_launch_config, launch_browser};
