//! YandexMusicClient — `MusicService` backend for api.music.yandex.net.
//!
//! Talks to the mobile JSON API with an OAuth token:
//! - `GET  /account/status` to validate the token and learn the uid
//! - `GET  /users/{uid}/likes/tracks` for the liked-tracks library
//! - `POST /tracks` for full track metadata
//! - `GET  /tracks/{id}/download-info` for available encodings
//!
//! Direct links are built from the storage host's JSON answer and signed
//! with the md5 scheme the official clients use.

use crate::core::error::{AppError, AppResult};
use crate::core::types::{Bitrate, Codec};
use crate::music::{AccountInfo, DownloadVariant, MusicService, ServiceError, TrackDescriptor, TrackId};
use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use url::Url;

/// Salt mixed into direct-link signatures.
const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";

const CLIENT_HEADER: &str = "X-Yandex-Music-Client";
const CLIENT_ID: &str = "YandexMusicAndroid/24023621";

/// Download source for Yandex Music.
pub struct YandexMusicClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
    account: OnceCell<AccountInfo>,
}

impl YandexMusicClient {
    /// Builds an unauthenticated client. Call [`MusicService::authenticate`] before use.
    pub fn new(token: Option<SecretString>, base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("likesync/0.3")
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            account: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ServiceError> {
        let token = self
            .token
            .as_ref()
            .map(|t| t.expose_secret())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("music token is not configured".to_string()))?;

        Ok(request
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {}", token))
            .header(CLIENT_HEADER, CLIENT_ID))
    }

    async fn get_result<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let request = self.authorized(self.client.get(self.url(path)))?;
        let response = check_status(request.send().await?, path)?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::Protocol(format!("{}: {}", path, e)))?;
        Ok(envelope.result)
    }

    async fn fetch_account(&self) -> Result<AccountInfo, ServiceError> {
        log::debug!("Authorizing with {}", self.base_url);
        let status: AccountStatus = self.get_result("/account/status").await?;
        let uid = status
            .account
            .uid
            .ok_or_else(|| ServiceError::Unauthorized("token is not bound to an account".to_string()))?;

        Ok(AccountInfo {
            uid,
            login: status.account.login,
        })
    }
}

/// Maps HTTP status codes onto service errors.
fn check_status(response: Response, what: &str) -> Result<Response, ServiceError> {
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ServiceError::Unauthorized(format!("{} rejected the token", what)))
        }
        StatusCode::NOT_FOUND => Err(ServiceError::NotFound(what.to_string())),
        s => Err(ServiceError::Protocol(format!("{} returned {}", what, s))),
    }
}

/// md5 signature over the storage path and secret, hex-encoded.
pub(crate) fn sign_path(path: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(SIGN_SALT.as_bytes());
    hasher.update(path.strip_prefix('/').unwrap_or(path).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn build_direct_link(codec: Codec, info: &StorageInfo) -> String {
    let sign = sign_path(&info.path, &info.s);
    format!("https://{}/get-{}/{}/{}{}", info.host, codec.as_str(), sign, info.ts, info.path)
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct AccountStatus {
    account: AccountBody,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    uid: Option<u64>,
    login: Option<String>,
}

/// The API is inconsistent about numeric vs. string ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Num(u64),
    Str(String),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Num(n) => n.to_string(),
            IdValue::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Likes {
    library: LikesLibrary,
}

#[derive(Debug, Deserialize)]
struct LikesLibrary {
    #[serde(default)]
    tracks: Vec<TrackShort>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackShort {
    id: IdValue,
    album_id: Option<IdValue>,
}

impl TrackShort {
    fn into_track_id(self) -> TrackId {
        match self.album_id {
            Some(album) => TrackId::composite(album.into_string(), self.id.into_string()),
            None => TrackId::new(self.id.into_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackBody {
    id: IdValue,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artists: Vec<ArtistBody>,
    #[serde(default)]
    albums: Vec<AlbumBody>,
    cover_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistBody {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumBody {
    id: Option<IdValue>,
    #[serde(default)]
    title: String,
    track_count: Option<u32>,
}

impl TrackBody {
    fn into_descriptor(self) -> TrackDescriptor {
        let track_id = self.id.into_string();
        let mut albums = self.albums.into_iter();
        let album = albums.next();

        let id = match album.as_ref().and_then(|a| a.id.as_ref()) {
            Some(IdValue::Num(n)) => TrackId::composite(n, &track_id),
            Some(IdValue::Str(s)) => TrackId::composite(s, &track_id),
            None => TrackId::new(track_id),
        };

        let mut descriptor = TrackDescriptor::new(id, self.title)
            .with_artists(self.artists.into_iter().map(|a| a.name));
        if let Some(album) = album {
            descriptor = descriptor.with_album(album.title, album.track_count);
        }
        if let Some(cover) = self.cover_uri {
            descriptor = descriptor.with_cover_uri(cover);
        }
        descriptor
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantBody {
    codec: String,
    bitrate_in_kbps: u32,
    download_info_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StorageInfo {
    pub(crate) host: String,
    pub(crate) path: String,
    pub(crate) ts: String,
    pub(crate) s: String,
}

#[async_trait]
impl MusicService for YandexMusicClient {
    fn name(&self) -> &str {
        "yandex-music"
    }

    async fn authenticate(&self) -> Result<AccountInfo, ServiceError> {
        self.account
            .get_or_try_init(|| self.fetch_account())
            .await
            .cloned()
    }

    async fn liked_tracks(&self) -> Result<Vec<TrackId>, ServiceError> {
        let account = self.authenticate().await?;
        log::debug!("Fetching liked tracks for uid {}", account.uid);

        let likes: Likes = self
            .get_result(&format!("/users/{}/likes/tracks", account.uid))
            .await?;
        Ok(likes
            .library
            .tracks
            .into_iter()
            .map(TrackShort::into_track_id)
            .collect())
    }

    async fn tracks(&self, ids: &[TrackId]) -> Result<Vec<TrackDescriptor>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.iter().map(TrackId::track_part).collect::<Vec<_>>().join(",");
        let request = self
            .authorized(self.client.post(self.url("/tracks")))?
            .form(&[("track-ids", joined.as_str()), ("with-positions", "true")]);
        let response = check_status(request.send().await?, "/tracks")?;
        let envelope: Envelope<Vec<TrackBody>> = response
            .json()
            .await
            .map_err(|e| ServiceError::Protocol(format!("/tracks: {}", e)))?;

        Ok(envelope.result.into_iter().map(TrackBody::into_descriptor).collect())
    }

    async fn download_info(&self, id: &TrackId) -> Result<Vec<DownloadVariant>, ServiceError> {
        let bodies: Vec<VariantBody> = self
            .get_result(&format!("/tracks/{}/download-info", id.track_part()))
            .await?;

        // Variants we cannot name (flac, he-aac, odd bitrates) are ignored
        Ok(bodies
            .into_iter()
            .filter_map(|body| {
                let codec = match body.codec.as_str() {
                    "mp3" => Codec::Mp3,
                    "aac" => Codec::Aac,
                    _ => return None,
                };
                let bitrate = Bitrate::try_from(body.bitrate_in_kbps).ok()?;
                Some(DownloadVariant {
                    codec,
                    bitrate,
                    info_url: body.download_info_url,
                })
            })
            .collect())
    }

    async fn direct_link(&self, variant: &DownloadVariant) -> Result<String, ServiceError> {
        let mut url = Url::parse(&variant.info_url)
            .map_err(|e| ServiceError::Protocol(format!("bad download info url: {}", e)))?;
        url.query_pairs_mut().append_pair("format", "json");

        let request = self.authorized(self.client.get(url))?;
        let response = check_status(request.send().await?, "download info")?;
        let info: StorageInfo = response
            .json()
            .await
            .map_err(|e| ServiceError::Protocol(format!("download info: {}", e)))?;

        Ok(build_direct_link(variant.codec, &info))
    }

    async fn download_to(&self, link: &str, path: &Path) -> Result<u64, ServiceError> {
        let response = check_status(self.client.get(link).send().await?, "audio download")?;

        let mut file = fs_err::tokio::File::create(path).await?;
        let result = write_body(response, &mut file).await;
        drop(file);

        if result.is_err() {
            // A truncated file would count as downloaded on the next run
            if let Err(e) = fs_err::tokio::remove_file(path).await {
                log::warn!("Failed to remove partial download: {}", e);
            }
        }
        result
    }
}

async fn write_body(mut response: Response, file: &mut fs_err::tokio::File) -> Result<u64, ServiceError> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_path_strips_leading_slash() {
        assert_eq!(sign_path("/a/b", "secret"), sign_path("a/b", "secret"));
        assert_eq!(sign_path("/a/b", "secret").len(), 32);
        assert_ne!(sign_path("/a/b", "secret"), sign_path("/a/b", "other"));
    }

    #[test]
    fn test_build_direct_link() {
        let info = StorageInfo {
            host: "s1.storage.yandex.net".into(),
            path: "/rmusic/U2FsdGVk".into(),
            ts: "0005f4c1a2b3".into(),
            s: "abc".into(),
        };
        let link = build_direct_link(Codec::Mp3, &info);
        let sign = sign_path(&info.path, &info.s);
        assert_eq!(
            link,
            format!("https://s1.storage.yandex.net/get-mp3/{}/0005f4c1a2b3/rmusic/U2FsdGVk", sign)
        );
    }

    #[test]
    fn test_track_body_into_descriptor() {
        let body: TrackBody = serde_json::from_value(serde_json::json!({
            "id": "1710808",
            "title": "Example",
            "artists": [{"name": "A"}, {"name": "B"}],
            "albums": [{"id": 3192570, "title": "Alb", "trackCount": 12}],
            "coverUri": "avatars.yandex.net/get-music-content/x/%%"
        }))
        .unwrap();

        let track = body.into_descriptor();
        assert_eq!(track.id.as_str(), "3192570:1710808");
        assert_eq!(track.title, "Example");
        assert_eq!(track.artist_line(), "A, B");
        assert_eq!(track.album_title, "Alb");
        assert_eq!(track.album_track_count, Some(12));
        assert!(track.cover_url().is_some());
    }

    #[test]
    fn test_track_short_without_album() {
        let short: TrackShort = serde_json::from_value(serde_json::json!({"id": 42})).unwrap();
        assert_eq!(short.into_track_id().as_str(), "42");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let client = YandexMusicClient::new(None, "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let result = client.authenticate().await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }
}
