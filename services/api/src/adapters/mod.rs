pub mod connectivity;
pub mod gemini;
pub mod history_file;
pub mod openai;

pub use connectivity::TcpConnectivityProbe;
pub use gemini::GeminiAdapter;
pub use history_file::JsonFileHistoryStore;
pub use openai::OpenAiAdapter;
