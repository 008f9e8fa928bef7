//! 业务流程层：登录、导航和三类学习任务

pub mod completion;
pub mod exam_flow;
pub mod homework_flow;
pub mod navigation;
pub mod poller;
pub mod portal;
pub mod video_flow;

pub use completion::{completion_signal, is_completed, CompletionSignal};
pub use exam_flow::ExamReport;
pub use homework_flow::HomeworkReport;
pub use poller::{CompletionPoller, PollReport, PollerSettings, TabDriver};
