pub mod advice_llm;
pub mod db;

pub use advice_llm::OpenAiAdviceAdapter;
pub use db::DbAdapter;
