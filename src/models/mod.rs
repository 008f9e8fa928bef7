pub mod course;
pub mod exam;
pub mod homework;
pub mod question;
pub mod target;
pub mod video;

pub use course::CourseEntry;
pub use exam::ExamEntry;
pub use homework::{HomeworkItem, ItemStatus};
pub use question::{Answer, Question, QuestionKind, QuestionOption, RawQuestion};
pub use target::{TabHandle, Target, TargetState};
pub use video::{MediaState, PageSignals, VideoSpeed};
