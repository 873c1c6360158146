pub mod config;
pub mod generator;
pub mod http;
pub mod storage;
pub mod transcoder;
pub mod transcriber;
pub mod video;

pub use config::ConfigStore;
pub use generator::TextGenerator;
pub use http::{ByteStream, HttpClient};
pub use storage::ObjectStore;
pub use transcoder::Transcoder;
pub use transcriber::SpeechBackend;
pub use video::VideoSource;
