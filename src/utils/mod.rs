pub mod logging;
pub mod stop_flag;

pub use stop_flag::StopFlag;
