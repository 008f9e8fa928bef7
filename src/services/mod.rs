pub mod answer;
pub mod debug_dump;
pub mod llm_service;
pub mod selector;

pub use answer::{AnswerResolver, AnswerStrategy, RandomStrategy, RemoteStrategy};
pub use debug_dump::PageDumper;
pub use llm_service::LlmService;
pub use selector::select_next_item;
