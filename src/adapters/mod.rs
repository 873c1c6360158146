pub mod cloud_speech;
pub mod config_store;
pub mod credentials;
pub mod ffmpeg_transcoder;
pub mod gcs_store;
pub mod innertube_source;
pub mod openai_generator;
pub mod reqwest_http;

pub use cloud_speech::CloudSpeechBackend;
pub use config_store::TomlConfigStore;
pub use credentials::load_token;
pub use ffmpeg_transcoder::FfmpegTranscoder;
pub use gcs_store::GcsObjectStore;
pub use innertube_source::InnertubeVideoSource;
pub use openai_generator::OpenAiTextGenerator;
pub use reqwest_http::ReqwestHttpClient;
