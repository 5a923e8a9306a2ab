// core/src/strava.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;
use ureq::Agent;

use crate::error::{CorsaError, Result};
use crate::models::StravaConfig;
use crate::telemetry;
use crate::types::{Workout, WorkoutMeta, WorkoutSample, WorkoutSource};

pub const STRAVA_API: &str = "https://www.strava.com/api/v3";
pub const STRAVA_OAUTH: &str = "https://www.strava.com/oauth";
pub const SCOPE: &str = "activity:read_all";
/// Hvor mange aktiviteter vi ser på som standard.
pub const DEFAULT_LIMIT: usize = 50;

const RUN_TYPES: [&str; 3] = ["Run", "TrailRun", "VirtualRun"];

/// OAuth-token for én bruker. Sendes eksplisitt inn i hvert kall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix-sekunder
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StravaSession {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|exp| exp <= now.timestamp())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl From<TokenResponse> for StravaSession {
    fn from(t: TokenResponse) -> Self {
        Self {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_at: t.expires_at,
        }
    }
}

/// Sammendrag fra `/athlete/activities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
    /// meter
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
}

impl ActivitySummary {
    pub fn is_run(&self) -> bool {
        let t = self.sport_type.as_deref().unwrap_or(&self.activity_type);
        RUN_TYPES.contains(&t) || RUN_TYPES.contains(&self.activity_type.as_str())
    }

    pub fn meta(&self) -> WorkoutMeta {
        WorkoutMeta {
            name: if self.name.is_empty() {
                None
            } else {
                Some(self.name.clone())
            },
            start_time: self.start_date,
            distance_m: self.distance,
            ascent_m: self.total_elevation_gain,
            duration_s: None,
            source: WorkoutSource::Strava {
                activity_id: self.id,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Stream {
    #[serde(default)]
    pub data: Vec<Option<f64>>,
}

/// Streams med `key_by_type=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StreamSet {
    #[serde(default)]
    pub time: Option<Stream>,
    #[serde(default)]
    pub watts: Option<Stream>,
    #[serde(default)]
    pub heartrate: Option<Stream>,
}

/// Streams i listeform (`[{"type": "time", "data": [...]}, ...]`).
#[derive(Debug, Clone, Deserialize)]
pub struct TypedStream {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Vec<Option<f64>>,
}

impl StreamSet {
    pub fn from_list(list: Vec<TypedStream>) -> Self {
        let mut set = StreamSet::default();
        for s in list {
            let stream = Some(Stream { data: s.data });
            match s.kind.as_str() {
                "time" => set.time = stream,
                "watts" => set.watts = stream,
                "heartrate" => set.heartrate = stream,
                other => debug!("[strava] ignorerer stream `{other}`"),
            }
        }
        set
    }

    /// Kanoniske samples. Punkter uten tid, watt eller puls (eller puls 0)
    /// droppes.
    pub fn to_samples(&self, label: &str) -> Result<Vec<WorkoutSample>> {
        let missing = |stream: &'static str| CorsaError::MissingStream {
            label: label.to_string(),
            stream,
        };
        let time = self.time.as_ref().ok_or_else(|| missing("time"))?;
        let watts = self
            .watts
            .as_ref()
            .filter(|s| s.data.iter().any(Option::is_some))
            .ok_or_else(|| missing("power"))?;
        let hr = self
            .heartrate
            .as_ref()
            .filter(|s| s.data.iter().any(Option::is_some))
            .ok_or_else(|| missing("heart rate"))?;

        let n = time.data.len().min(watts.data.len()).min(hr.data.len());
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            match (time.data[i], watts.data[i], hr.data[i]) {
                (Some(t), Some(w), Some(h)) if h > 0.0 && w >= 0.0 => {
                    out.push(WorkoutSample::new(t, h.round() as u32, w));
                }
                _ => continue,
            }
        }
        if out.len() < n {
            debug!("[strava] {label}: droppet {} av {n} punkter", n - out.len());
        }
        Ok(out)
    }
}

/// Bygg en Workout av en aktivitet + streams.
pub fn streams_to_workout(activity: &ActivitySummary, streams: &StreamSet) -> Result<Workout> {
    let meta = activity.meta();
    let label = format!("strava:{}", activity.id);
    let samples = streams.to_samples(&label)?;
    Ok(Workout::with_meta(samples, meta))
}

/// URL brukeren sendes til for å godkjenne tilgang.
pub fn authorize_url(config: &StravaConfig) -> String {
    format!(
        "{STRAVA_OAUTH}/authorize?client_id={}&response_type=code&redirect_uri={}&approval_prompt=auto&scope={}",
        encode_query(&config.client_id),
        encode_query(&config.redirect_uri),
        encode_query(SCOPE),
    )
}

fn encode_query(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Kilde for aktiviteter (prod: StravaClient, test: StaticActivitySource).
pub trait ActivitySource {
    fn list_runs(&self, session: &StravaSession, limit: usize) -> Result<Vec<ActivitySummary>>;

    fn fetch_workout(&self, session: &StravaSession, activity: &ActivitySummary)
        -> Result<Workout>;
}

/// Strava-klient – blocking (ureq).
pub struct StravaClient {
    agent: Agent,
    config: StravaConfig,
    api_base: String,
    oauth_base: String,
}

impl StravaClient {
    pub fn new(config: StravaConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        Self {
            agent,
            config,
            api_base: STRAVA_API.to_string(),
            oauth_base: STRAVA_OAUTH.to_string(),
        }
    }

    /// Pek klienten mot en annen vert (proxy/mock).
    pub fn with_base_urls(mut self, api_base: &str, oauth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &StravaConfig {
        &self.config
    }

    pub fn authorize_url(&self) -> String {
        authorize_url(&self.config)
    }

    /// Bytt `code` fra redirect mot token.
    pub fn exchange_code(&self, code: &str) -> Result<StravaSession> {
        let url = format!("{}/token", self.oauth_base);
        let resp = self
            .agent
            .post(&url)
            .send_form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .map_err(|e| request_error("token", e))?;
        telemetry::strava_request("token", "ok");
        let token: TokenResponse = read_json(resp, "token response")?;
        info!("✅ Strava-tilkobling OK");
        Ok(token.into())
    }

    pub fn refresh(&self, session: &StravaSession) -> Result<StravaSession> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(CorsaError::Unauthorized)?;
        let url = format!("{}/token", self.oauth_base);
        let resp = self
            .agent
            .post(&url)
            .send_form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .map_err(|e| request_error("refresh", e))?;
        telemetry::strava_request("refresh", "ok");
        let token: TokenResponse = read_json(resp, "token response")?;
        Ok(token.into())
    }

    pub fn fetch_streams(&self, session: &StravaSession, activity_id: u64) -> Result<StreamSet> {
        let url = format!("{}/activities/{activity_id}/streams", self.api_base);
        let resp = self
            .agent
            .get(&url)
            .set("Authorization", &bearer(session))
            .query("keys", "time,watts,heartrate")
            .query("key_by_type", "true")
            .call()
            .map_err(|e| request_error("streams", e))?;
        telemetry::strava_request("streams", "ok");
        read_json(resp, "activity streams")
    }
}

impl ActivitySource for StravaClient {
    fn list_runs(&self, session: &StravaSession, limit: usize) -> Result<Vec<ActivitySummary>> {
        let url = format!("{}/athlete/activities", self.api_base);
        let resp = self
            .agent
            .get(&url)
            .set("Authorization", &bearer(session))
            .query("per_page", &limit.clamp(1, 200).to_string())
            .call()
            .map_err(|e| request_error("activities", e))?;
        telemetry::strava_request("activities", "ok");

        let all: Vec<ActivitySummary> = read_json(resp, "activity list")?;
        let total = all.len();
        let runs: Vec<ActivitySummary> = all.into_iter().filter(|a| a.is_run()).collect();
        info!("[strava] {} løpeturer av {total} aktiviteter", runs.len());
        Ok(runs)
    }

    fn fetch_workout(
        &self,
        session: &StravaSession,
        activity: &ActivitySummary,
    ) -> Result<Workout> {
        let streams = self.fetch_streams(session, activity.id)?;
        streams_to_workout(activity, &streams)
    }
}

/// Ferdige aktiviteter i minnet (tester / offline).
#[derive(Debug, Clone, Default)]
pub struct StaticActivitySource {
    pub activities: Vec<(ActivitySummary, StreamSet)>,
}

impl ActivitySource for StaticActivitySource {
    fn list_runs(&self, _session: &StravaSession, limit: usize) -> Result<Vec<ActivitySummary>> {
        Ok(self
            .activities
            .iter()
            .map(|(a, _)| a)
            .take(limit)
            .filter(|a| a.is_run())
            .cloned()
            .collect())
    }

    fn fetch_workout(
        &self,
        _session: &StravaSession,
        activity: &ActivitySummary,
    ) -> Result<Workout> {
        let (_, streams) = self
            .activities
            .iter()
            .find(|(a, _)| a.id == activity.id)
            .ok_or_else(|| CorsaError::Http {
                status: Some(404),
                message: format!("activity {} not found", activity.id),
            })?;
        streams_to_workout(activity, streams)
    }
}

fn bearer(session: &StravaSession) -> String {
    format!("Bearer {}", session.access_token)
}

fn read_json<T: serde::de::DeserializeOwned>(resp: ureq::Response, what: &str) -> Result<T> {
    let body = resp.into_string()?;
    let mut de = serde_json::Deserializer::from_str(&body);
    spte::deserialize(&mut de).map_err(|e| CorsaError::parse(what, e))
}

fn request_error(endpoint: &'static str, err: ureq::Error) -> CorsaError {
    match err {
        ureq::Error::Status(401, _) => {
            telemetry::strava_request(endpoint, "unauthorized");
            warn!("[strava] {endpoint}: token avvist (401)");
            CorsaError::Unauthorized
        }
        ureq::Error::Status(code, resp) => {
            telemetry::strava_request(endpoint, "error");
            CorsaError::Http {
                status: Some(code),
                message: resp.into_string().unwrap_or_default(),
            }
        }
        ureq::Error::Transport(t) => {
            telemetry::strava_request(endpoint, "transport");
            CorsaError::Http {
                status: None,
                message: t.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_query_escapes_reserved() {
        assert_eq!(encode_query("activity:read_all"), "activity%3Aread_all");
        assert_eq!(
            encode_query("https://a.b/c?d"),
            "https%3A%2F%2Fa.b%2Fc%3Fd"
        );
    }

    #[test]
    fn session_expiry() {
        let mut s = StravaSession::new("abc");
        let now = Utc::now();
        assert!(!s.is_expired(now));
        s.expires_at = Some(now.timestamp() - 1);
        assert!(s.is_expired(now));
        s.expires_at = Some(now.timestamp() + 3600);
        assert!(!s.is_expired(now));
    }
}
