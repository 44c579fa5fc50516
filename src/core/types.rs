use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Audio codec a track is requested in.
///
/// `acc` is accepted as a spelling of `aac`; older configs carried that typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    #[default]
    Mp3,
    Aac,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            Codec::Aac => "aac",
        }
    }

    /// File extension used for files of this codec (without the dot).
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Codec::Mp3),
            "aac" => Ok(Codec::Aac),
            "acc" => {
                log::warn!("Codec \"acc\" treated as \"aac\"");
                Ok(Codec::Aac)
            }
            _ => Err(format!("Unknown codec: {}", s)),
        }
    }
}

/// Encoding bitrate in kbps. Only the four values the service serves are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Bitrate {
    Kbps64,
    Kbps128,
    #[default]
    Kbps192,
    Kbps320,
}

impl Bitrate {
    pub const ALL: [Bitrate; 4] = [Bitrate::Kbps64, Bitrate::Kbps128, Bitrate::Kbps192, Bitrate::Kbps320];

    pub fn kbps(&self) -> u32 {
        match self {
            Bitrate::Kbps64 => 64,
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps192 => 192,
            Bitrate::Kbps320 => 320,
        }
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = String;

    fn try_from(kbps: u32) -> Result<Self, Self::Error> {
        Bitrate::ALL
            .into_iter()
            .find(|b| b.kbps() == kbps)
            .ok_or_else(|| format!("Unsupported bitrate: {} kbps", kbps))
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kbps", self.kbps())
    }
}

/// How a track reaches the chat: uploaded bytes or a playable link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, strum::EnumString, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportMode {
    #[default]
    File,
    Link,
}

/// Telegram destination: a numeric chat id or a public `@channel` username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl ChatTarget {
    /// Empty usernames and a zero id are placeholders from an unfilled config.
    pub fn is_configured(&self) -> bool {
        match self {
            ChatTarget::Id(id) => *id != 0,
            ChatTarget::Username(name) => !name.trim().is_empty(),
        }
    }
}

impl Default for ChatTarget {
    fn default() -> Self {
        ChatTarget::Id(0)
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{}", id),
            ChatTarget::Username(name) => f.write_str(name),
        }
    }
}

impl FromStr for ChatTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty chat id".to_string());
        }
        match s.parse::<i64>() {
            Ok(id) => Ok(ChatTarget::Id(id)),
            Err(_) => Ok(ChatTarget::Username(s.to_string())),
        }
    }
}

impl From<i64> for ChatTarget {
    fn from(id: i64) -> Self {
        ChatTarget::Id(id)
    }
}

/// Where and how to relay audio.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryTarget {
    pub chat: ChatTarget,
    pub mode: TransportMode,
}

/// Positional window over an ordered sequence. `count == 0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: usize,
    pub count: usize,
}

impl Window {
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    /// The whole sequence.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.count == 0
    }

    /// Applies the window to a slice.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let rest = &items[start..];
        if self.is_unbounded() {
            rest
        } else {
            &rest[..self.count.min(rest.len())]
        }
    }
}
