//! Transport that records sends instead of talking to Telegram

#![allow(dead_code)]

use async_trait::async_trait;
use likesync::core::error::{AppError, AppResult};
use likesync::core::types::ChatTarget;
use likesync::telegram::{AudioTransport, LinkedAudio};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingTransport {
    /// File names the transport refuses
    pub refuse: HashSet<String>,
    /// Reject link sends that carry a thumbnail
    pub refuse_thumbnails: bool,
    pub files: Mutex<Vec<(ChatTarget, PathBuf)>>,
    pub links: Mutex<Vec<(ChatTarget, LinkedAudio)>>,
}

impl RecordingTransport {
    pub fn refusing<I: IntoIterator<Item = &'static str>>(names: I) -> Self {
        Self {
            refuse: names.into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }

    pub fn sent_files(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, p)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    pub fn sent_links(&self) -> Vec<LinkedAudio> {
        self.links.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }
}

#[async_trait]
impl AudioTransport for RecordingTransport {
    async fn send_audio_file(&self, chat: &ChatTarget, path: &Path) -> AppResult<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.refuse.contains(&name) {
            return Err(AppError::Validation(format!("refused {}", name)));
        }
        self.files.lock().unwrap().push((chat.clone(), path.to_path_buf()));
        Ok(())
    }

    async fn send_audio_link(&self, chat: &ChatTarget, audio: &LinkedAudio) -> AppResult<()> {
        if self.refuse_thumbnails && audio.thumbnail.is_some() {
            return Err(AppError::Validation("thumbnail must be uploaded".to_string()));
        }
        self.links.lock().unwrap().push((chat.clone(), audio.clone()));
        Ok(())
    }
}
