use crate::core::device_client::{ChildDevice, DeviceClient, DeviceConnector, PlaybackStream, Recording};
use crate::device::media_session::{MediaSession, PlaybackRequest};
use crate::errors::AppError;
use crate::hub_config::HubConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use md5::{Digest, Md5};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tokio::sync::OnceCell;

const MEDIA_PORT: u16 = 8800;
// Whole calendar range accepted by searchDateWithVideo.
const SEARCH_START_DATE: &str = "20000101";
const SEARCH_END_DATE: &str = "20991231";
const RECORDINGS_PER_DAY: u32 = 99;

/// Hashed form of a credential as the local login expects it.
pub fn hash_password(password: &str) -> String {
    format!("{:X}", Md5::digest(password.as_bytes()))
}

// Hosts without a scheme are devices on the LAN speaking HTTPS with self-signed certificates.
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// The media port speaks plain HTTP, unlike the API port.
fn media_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}/stream", host)
    } else {
        format!("http://{}:{}/stream", host, MEDIA_PORT)
    }
}

/// Wraps one request the way the hub expects it, routing through `controlChild` for cameras.
pub fn build_request_body(method: &str, params: Value, child_id: Option<&str>) -> Value {
    let inner = json!({ "method": method, "params": params });
    match child_id {
        None => json!({
            "method": "multipleRequest",
            "params": { "requests": [inner] }
        }),
        Some(device_id) => json!({
            "method": "multipleRequest",
            "params": { "requests": [{
                "method": "controlChild",
                "params": { "childControl": {
                    "device_id": device_id,
                    "request_data": {
                        "method": "multipleRequest",
                        "params": { "requests": [inner] }
                    }
                }}
            }]}
        }),
    }
}

fn error_code(value: &Value) -> i64 {
    value.get("error_code").and_then(Value::as_i64).unwrap_or(0)
}

/// Digs the single response out of a (possibly child-wrapped) multipleRequest reply.
pub fn extract_result(reply: &Value, method: &str, child: bool) -> Result<Value, AppError> {
    let code = error_code(reply);
    if code != 0 {
        return Err(AppError::Device { method: method.to_string(), code });
    }
    let mut response = reply
        .pointer("/result/responses/0")
        .ok_or_else(|| AppError::Response(format!("'{}' reply has no responses: {}", method, reply)))?;

    if child {
        let code = error_code(response);
        if code != 0 {
            return Err(AppError::Device { method: "controlChild".to_string(), code });
        }
        let data = response
            .pointer("/result/response_data")
            .ok_or_else(|| AppError::Response(format!("'{}' child reply has no response_data: {}", method, response)))?;
        let code = error_code(data);
        if code != 0 {
            return Err(AppError::Device { method: method.to_string(), code });
        }
        response = response
            .pointer("/result/response_data/result/responses/0")
            .ok_or_else(|| AppError::Response(format!("'{}' child reply has no responses: {}", method, response)))?;
    }

    let code = error_code(response);
    if code != 0 {
        return Err(AppError::Device { method: method.to_string(), code });
    }
    Ok(response.get("result").cloned().unwrap_or(Value::Null))
}

// Devices report times and ids either as numbers or as numeric strings.
fn as_i64_lenient(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[derive(Debug, Deserialize)]
struct ChildDeviceRecord {
    device_id: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    device_model: String,
}

pub fn parse_child_page(result: &Value) -> Result<(Vec<ChildDevice>, Option<usize>), AppError> {
    let list = result
        .get("child_device_list")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let records: Vec<ChildDeviceRecord> = serde_json::from_value(list)
        .map_err(|e| AppError::Response(format!("Malformed child_device_list: {}", e)))?;
    let sum = result.get("sum").and_then(Value::as_u64).map(|s| s as usize);
    let devices = records
        .into_iter()
        .map(|r| ChildDevice {
            device_id: r.device_id,
            alias: r.alias,
            device_model: r.device_model,
        })
        .collect();
    Ok((devices, sum))
}

/// Flattens `playback.search_results` (a list of single-key objects) into device dates.
pub fn parse_recording_dates(result: &Value) -> Vec<String> {
    result
        .pointer("/playback/search_results")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .flat_map(|obj| obj.values())
                .filter_map(|v| v.get("date").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Flattens `playback.search_video_results`; every key of every entry is one recording.
pub fn parse_recordings(result: &Value) -> Result<Vec<Recording>, AppError> {
    let Some(entries) = result
        .pointer("/playback/search_video_results")
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    let mut recordings = Vec::new();
    for obj in entries.iter().filter_map(Value::as_object) {
        for (key, item) in obj {
            let start_time = item.get("startTime").and_then(as_i64_lenient);
            let end_time = item.get("endTime").and_then(as_i64_lenient);
            match (start_time, end_time) {
                (Some(start_time), Some(end_time)) => recordings.push(Recording { start_time, end_time }),
                _ => {
                    return Err(AppError::Response(format!(
                        "Recording '{}' is missing startTime/endTime: {}",
                        key, item
                    )))
                }
            }
        }
    }
    Ok(recordings)
}

pub struct TapoClient {
    name: String,
    host: String,
    user: String,
    password: String,
    child_id: Option<String>,
    player_id: Option<String>,
    http: Client,
    stok: String,
    user_id: OnceCell<i64>,
}

impl TapoClient {
    /// Logs into the hub; with `child` set, every request is routed to that camera.
    pub async fn connect(config: &HubConfig, child: Option<&ChildDevice>) -> Result<Self, AppError> {
        let start_time = Instant::now();
        let name = child
            .map(|c| c.alias.clone())
            .unwrap_or_else(|| config.host.clone());
        debug!("🔐 Logging into '{}' for '{}'...", config.host, name);

        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;

        // The hub's local API authenticates with the cloud credential, for the hub and its children.
        let password = config.cloud_password.clone();
        let body = json!({
            "method": "login",
            "params": {
                "hashed": true,
                "password": hash_password(&password),
                "username": config.user,
            }
        });
        let reply: Value = http
            .post(format!("{}/", base_url(&config.host)))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let code = error_code(&reply);
        if code != 0 {
            return Err(AppError::Authentication {
                host: config.host.clone(),
                details: format!("login returned error code {}", code),
            });
        }
        let stok = reply
            .pointer("/result/stok")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Authentication {
                host: config.host.clone(),
                details: "login reply carried no session token".to_string(),
            })?
            .to_string();

        info!("✅ Logged into '{}' as '{}' in {:?}", config.host, name, start_time.elapsed());
        Ok(TapoClient {
            name,
            host: config.host.clone(),
            user: config.user.clone(),
            password,
            child_id: child.map(|c| c.device_id.clone()),
            player_id: Some(config.player_id.clone()).filter(|id| !id.is_empty()),
            http,
            stok,
            user_id: OnceCell::new(),
        })
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, AppError> {
        let body = build_request_body(method, params, self.child_id.as_deref());
        let url = format!("{}/stok={}/ds", base_url(&self.host), self.stok);
        debug!("➡️ [{}] {}", self.name, method);
        let reply: Value = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        extract_result(&reply, method, self.child_id.is_some())
    }

    async fn user_id(&self) -> Result<i64, AppError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let result = self
                    .request("getUserID", json!({ "system": { "get_user_id": "null" } }))
                    .await?;
                result
                    .get("user_id")
                    .and_then(as_i64_lenient)
                    .ok_or_else(|| AppError::Response(format!("getUserID returned no user_id: {}", result)))
            })
            .await?;
        Ok(*id)
    }
}

#[async_trait]
impl DeviceClient for TapoClient {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn get_child_devices(&self) -> Result<Vec<ChildDevice>> {
        let mut devices = Vec::new();
        loop {
            let result = self
                .request(
                    "getChildDeviceList",
                    json!({ "childControl": { "start_index": devices.len() } }),
                )
                .await?;
            let (page, sum) = parse_child_page(&result)?;
            let page_len = page.len();
            devices.extend(page);
            debug!("  [{}] child page of {} (total so far {}, sum {:?})", self.name, page_len, devices.len(), sum);
            match sum {
                Some(sum) if page_len > 0 && devices.len() < sum => continue,
                _ => break,
            }
        }
        Ok(devices)
    }

    async fn get_recording_dates(&self) -> Result<Vec<String>> {
        let result = self
            .request(
                "searchDateWithVideo",
                json!({ "playback": { "search_year_utility": {
                    "channel": [0],
                    "start_date": SEARCH_START_DATE,
                    "end_date": SEARCH_END_DATE,
                }}}),
            )
            .await?;
        Ok(parse_recording_dates(&result))
    }

    async fn get_recordings(&self, date: &str) -> Result<Vec<Recording>> {
        let user_id = self.user_id().await?;
        let result = self
            .request(
                "searchVideoOfDay",
                json!({ "playback": { "search_video_utility": {
                    "channel": 0,
                    "date": date,
                    "end_index": RECORDINGS_PER_DAY,
                    "id": user_id,
                    "start_index": 0,
                }}}),
            )
            .await?;
        Ok(parse_recordings(&result)?)
    }

    async fn open_playback(
        &self,
        recording: &Recording,
        window_size: u32,
    ) -> Result<Box<dyn PlaybackStream>> {
        let user_id = self.user_id().await?;
        let request = PlaybackRequest {
            client_id: user_id,
            child_id: self.child_id.clone(),
            player_id: self.player_id.clone(),
            start_time: recording.start_time,
            end_time: recording.end_time,
        };
        let session = MediaSession::start(
            &self.http,
            &media_url(&self.host),
            &self.user,
            &self.password,
            &request,
            window_size,
        )
        .await
        .with_context(|| format!("Failed to open playback session on '{}'", self.name))?;
        Ok(Box::new(session))
    }
}

pub struct TapoConnector;

#[async_trait]
impl DeviceConnector for TapoConnector {
    async fn connect_hub(&self, config: &HubConfig) -> Result<Box<dyn DeviceClient>> {
        let client = TapoClient::connect(config, None)
            .await
            .with_context(|| format!("Failed to connect to hub '{}'", config.host))?;
        Ok(Box::new(client))
    }

    async fn connect_child(&self, config: &HubConfig, child: &ChildDevice) -> Result<Box<dyn DeviceClient>> {
        let client = TapoClient::connect(config, Some(child))
            .await
            .with_context(|| format!("Failed to connect to camera '{}' via hub '{}'", child.alias, config.host))?;
        Ok(Box::new(client))
    }
}
