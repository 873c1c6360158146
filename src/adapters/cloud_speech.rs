use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::{
    DomainError, JobStatus, RecognitionConfig, RemoteObjectRef, ResultSegment, SecretString,
    TranscriptionErrorKind, TranscriptionJob,
};
use crate::ports::{HttpClient, SpeechBackend};

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<RecognizeResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<ResultSegment>,
}

/// Speech backend speaking the Speech-to-Text v1 long-running REST API.
pub struct CloudSpeechBackend {
    http: Arc<dyn HttpClient>,
    api_base: String,
    token: SecretString,
}

impl CloudSpeechBackend {
    pub fn new(http: Arc<dyn HttpClient>, api_base: impl Into<String>, token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn operation_url(&self, job: &TranscriptionJob) -> String {
        format!("{}/v1/operations/{}", self.api_base, job.name)
    }
}

#[async_trait]
impl SpeechBackend for CloudSpeechBackend {
    async fn submit(
        &self,
        audio: &RemoteObjectRef,
        config: &RecognitionConfig,
    ) -> Result<TranscriptionJob, DomainError> {
        let url = format!("{}/v1/speech:longrunningrecognize", self.api_base);
        let body = json!({
            "config": config,
            "audio": { "uri": audio.uri() },
        });

        let value = self
            .http
            .post_json(&url, Some(&self.token), &body)
            .await
            .map_err(|e| DomainError::transcription(TranscriptionErrorKind::Rejected, e.to_string()))?;
        let submitted: SubmitResponse = serde_json::from_value(value).map_err(|e| {
            DomainError::transcription(
                TranscriptionErrorKind::Rejected,
                format!("unexpected submit response: {}", e),
            )
        })?;

        info!(job = %submitted.name, audio = %audio, "Transcription job submitted");
        Ok(TranscriptionJob::submitted(submitted.name))
    }

    async fn poll(&self, job: &TranscriptionJob) -> Result<JobStatus, DomainError> {
        let value = self
            .http
            .get_json(&self.operation_url(job), Some(&self.token))
            .await
            .map_err(|e| DomainError::transcription(TranscriptionErrorKind::Unavailable, e.to_string()))?;
        let operation: Operation = serde_json::from_value(value).map_err(|e| {
            DomainError::transcription(
                TranscriptionErrorKind::Unavailable,
                format!("unreadable operation {}: {}", job.name, e),
            )
        })?;

        if !operation.done {
            debug!(job = %job.name, "Transcription job still running");
            return Ok(JobStatus::Running);
        }
        if let Some(error) = operation.error {
            return Ok(JobStatus::Failed(format!("code {}: {}", error.code, error.message)));
        }
        let results = operation.response.unwrap_or_default().results;
        Ok(JobStatus::Succeeded(results))
    }

    async fn cancel(&self, job: &TranscriptionJob) -> Result<(), DomainError> {
        let url = format!("{}:cancel", self.operation_url(job));
        self.http
            .post_json(&url, Some(&self.token), &json!({}))
            .await
            .map_err(|e| DomainError::transcription(TranscriptionErrorKind::Unavailable, e.to_string()))?;
        info!(job = %job.name, "Transcription job cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ReqwestHttpClient;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn backend(api_base: String) -> CloudSpeechBackend {
        let http = Arc::new(ReqwestHttpClient::new(Duration::from_secs(5)).unwrap());
        CloudSpeechBackend::new(http, api_base, SecretString::new("speech-token"))
    }

    #[tokio::test]
    async fn test_submit_sends_config_and_uri() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/v1/speech:longrunningrecognize")
            .match_header("authorization", "Bearer speech-token")
            .match_body(Matcher::Json(json!({
                "config": {"encoding": "LINEAR16", "sampleRateHertz": 16000, "languageCode": "en-US"},
                "audio": {"uri": "gs://yt_summary/audio.wav"}
            })))
            .with_status(200)
            .with_body(r#"{"name":"op-42"}"#)
            .create_async()
            .await;

        let job = backend(server.url())
            .submit(
                &RemoteObjectRef::new("yt_summary", "audio.wav"),
                &RecognitionConfig::new(16_000, "en-US"),
            )
            .await
            .unwrap();
        assert_eq!(job.name, "op-42");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_rejection() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/speech:longrunningrecognize")
            .with_status(400)
            .with_body(r#"{"error":{"message":"sample rate mismatch"}}"#)
            .create_async()
            .await;

        let err = backend(server.url())
            .submit(
                &RemoteObjectRef::new("b", "k"),
                &RecognitionConfig::new(16_000, "en-US"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Transcription {
                kind: TranscriptionErrorKind::Rejected,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_poll_states() {
        let mut server = Server::new_async().await;
        let _running = server
            .mock("GET", "/v1/operations/op-1")
            .with_status(200)
            .with_body(r#"{"name":"op-1","metadata":{"progressPercent":40}}"#)
            .create_async()
            .await;
        let _failed = server
            .mock("GET", "/v1/operations/op-2")
            .with_status(200)
            .with_body(r#"{"name":"op-2","done":true,"error":{"code":3,"message":"bad audio"}}"#)
            .create_async()
            .await;
        let _done = server
            .mock("GET", "/v1/operations/op-3")
            .with_status(200)
            .with_body(
                r#"{"name":"op-3","done":true,"response":{"results":[
                    {"alternatives":[{"transcript":"Hello","confidence":0.9},{"transcript":"Hallo","confidence":0.1}],"languageCode":"en-us"},
                    {"alternatives":[{"transcript":" world","confidence":0.8}]}
                ]}}"#,
            )
            .create_async()
            .await;

        let speech = backend(server.url());
        assert_eq!(
            speech.poll(&TranscriptionJob::submitted("op-1")).await.unwrap(),
            JobStatus::Running
        );
        assert_eq!(
            speech.poll(&TranscriptionJob::submitted("op-2")).await.unwrap(),
            JobStatus::Failed("code 3: bad audio".to_string())
        );
        match speech.poll(&TranscriptionJob::submitted("op-3")).await.unwrap() {
            JobStatus::Succeeded(results) => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].top().unwrap().transcript, "Hello");
                assert_eq!(results[0].language_code.as_deref(), Some("en-us"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_error_status_is_transcription_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/operations/op-1")
            .with_status(503)
            .with_body("backend unavailable")
            .create_async()
            .await;

        let err = backend(server.url())
            .poll(&TranscriptionJob::submitted("op-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Transcription { kind: TranscriptionErrorKind::Unavailable, ref message }
                if message.contains("503")
        ));
    }

    #[tokio::test]
    async fn test_malformed_operation_is_transcription_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/operations/op-1")
            .with_status(200)
            .with_body(r#"{"done":"soon"}"#)
            .create_async()
            .await;

        let err = backend(server.url())
            .poll(&TranscriptionJob::submitted("op-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Transcription {
                kind: TranscriptionErrorKind::Unavailable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancel_posts_to_operation() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/v1/operations/op-9:cancel")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        backend(server.url())
            .cancel(&TranscriptionJob::submitted("op-9"))
            .await
            .unwrap();
        m.assert_async().await;
    }
}
