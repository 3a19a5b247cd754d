use crate::core::device_client::{PlaybackChunk, PlaybackStream};
use crate::device::multipart::{boundary_from_content_type, encode_part, MultipartParser, MultipartPart};
use crate::errors::AppError;
use anyhow::Result;
use async_trait::async_trait;
use diqwest::WithDigestAuth;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const CLIENT_BOUNDARY: &str = "--client-stream-boundary--";

/// Playback window asked of the device.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub client_id: i64,
    pub child_id: Option<String>,
    pub player_id: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
}

impl PlaybackRequest {
    pub fn to_json(&self) -> Value {
        let mut playback = json!({
            "client_id": self.client_id,
            "channels": [0, 1],
            "scale": "1/1",
            "start_time": self.start_time.to_string(),
            "end_time": self.end_time.to_string(),
            "event_type": [1, 2],
        });
        if let Some(child_id) = &self.child_id {
            playback["device_id"] = json!(child_id);
        }
        if let Some(player_id) = &self.player_id {
            playback["player_id"] = json!(player_id);
        }
        json!({
            "type": "request",
            "seq": 1,
            "params": { "playback": playback, "method": "get" }
        })
    }
}

#[derive(Debug, PartialEq)]
pub enum PartEvent {
    Media(Vec<u8>),
    Finished,
    Notice,
}

/// Decides what a received part means for the session.
pub fn classify_part(part: MultipartPart) -> Result<PartEvent, AppError> {
    let content_type = part.content_type.to_ascii_lowercase();
    if content_type.starts_with("video/") {
        return Ok(PartEvent::Media(part.body));
    }
    if !content_type.contains("json") {
        debug!("Ignoring media part of type '{}'", part.content_type);
        return Ok(PartEvent::Notice);
    }

    let message: Value = serde_json::from_slice(&part.body)
        .map_err(|e| AppError::Stream(format!("Malformed session message: {}", e)))?;
    let code = message
        .pointer("/params/error_code")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if code != 0 {
        return Err(AppError::Stream(format!("Device rejected playback with error code {}", code)));
    }
    let status = message.pointer("/params/status").and_then(Value::as_str);
    if status == Some("finished") {
        return Ok(PartEvent::Finished);
    }
    debug!("Session message: {}", message);
    Ok(PartEvent::Notice)
}

/// A playback session over the device's multipart streaming endpoint.
///
/// The response body is read by a background task that hands media over through a
/// channel bounded by the configured window size.
pub struct MediaSession {
    receiver: mpsc::Receiver<Result<PlaybackChunk, AppError>>,
    reader: JoinHandle<()>,
}

impl MediaSession {
    pub async fn start(
        http: &Client,
        url: &str,
        user: &str,
        password: &str,
        request: &PlaybackRequest,
        window_size: u32,
    ) -> Result<Self, AppError> {
        let payload = request.to_json().to_string();
        let body = encode_part(CLIENT_BOUNDARY, "application/json", payload.as_bytes());
        debug!("🎞️ Opening playback session at {} for {}..{}", url, request.start_time, request.end_time);

        let response = http
            .post(url)
            .header(CONTENT_TYPE, format!("multipart/mixed;boundary={}", CLIENT_BOUNDARY))
            .body(body)
            .send_with_digest_auth(user, password)
            .await
            .map_err(|e| AppError::Network(format!("Playback request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Stream(format!(
                "Playback request to {} failed with status: {}",
                url,
                response.status()
            )));
        }
        let boundary = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(boundary_from_content_type)
            .ok_or_else(|| AppError::Stream("Playback response is not multipart".to_string()))?;

        let (sender, receiver) = mpsc::channel(window_size.max(1) as usize);
        let reader = tokio::spawn(async move {
            let mut parser = MultipartParser::new(&boundary);
            let mut body = response.bytes_stream();
            loop {
                loop {
                    let event = match parser.next_part().and_then(|p| p.map(classify_part).transpose()) {
                        Ok(Some(event)) => event,
                        Ok(None) => break,
                        Err(e) => {
                            let _ = sender.send(Err(e)).await;
                            return;
                        }
                    };
                    match event {
                        PartEvent::Media(data) => {
                            if sender.send(Ok(PlaybackChunk { data })).await.is_err() {
                                debug!("Playback consumer went away; stopping reader.");
                                return;
                            }
                        }
                        PartEvent::Finished => return,
                        PartEvent::Notice => {}
                    }
                }
                if parser.is_finished() {
                    return;
                }
                match body.next().await {
                    Some(Ok(bytes)) => parser.push(&bytes),
                    Some(Err(e)) => {
                        warn!("Playback stream read failed: {}", e);
                        let _ = sender.send(Err(AppError::Network(e.to_string()))).await;
                        return;
                    }
                    None => return,
                }
            }
        });

        Ok(MediaSession { receiver, reader })
    }
}

#[async_trait]
impl PlaybackStream for MediaSession {
    async fn next_chunk(&mut self) -> Result<Option<PlaybackChunk>> {
        match self.receiver.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
