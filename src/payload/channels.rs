use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A named sensor position on the shoe.
///
/// The declaration order is the canonical channel order used by readings,
/// payloads and presenters. Adding a sensor means adding a variant here plus
/// its key list in [`CHANNEL_KEYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Toe,
    Inside,
    Laces,
    Vrist2,
    Inside2,
    Bridge,
}

impl Channel {
    pub const COUNT: usize = 6;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Toe,
        Channel::Inside,
        Channel::Laces,
        Channel::Vrist2,
        Channel::Inside2,
        Channel::Bridge,
    ];

    /// The three sensors of the first shoe revision.
    pub const PRIMARY: [Channel; 3] = [Channel::Toe, Channel::Inside, Channel::Laces];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Toe => "toe",
            Channel::Inside => "inside",
            Channel::Laces => "laces",
            Channel::Vrist2 => "vrist2",
            Channel::Inside2 => "inside2",
            Channel::Bridge => "bridge",
        }
    }

    /// Record keys accepted for this channel, canonical name first.
    pub fn keys(self) -> &'static [&'static str] {
        CHANNEL_KEYS[self.index()].1
    }

    /// Resolve a canonical or legacy key to its channel.
    pub fn from_key(key: &str) -> Option<Channel> {
        let key = key.trim().to_ascii_lowercase();
        CHANNEL_KEYS
            .iter()
            .find(|(_, keys)| keys.contains(&key.as_str()))
            .map(|(channel, _)| *channel)
    }
}

/// Candidate record keys per channel, resolved first-match-wins.
pub const CHANNEL_KEYS: [(Channel, &[&str]); Channel::COUNT] = [
    (Channel::Toe, &["toe"]),
    (Channel::Inside, &["inside"]),
    (Channel::Laces, &["laces"]),
    (Channel::Vrist2, &["vrist2", "wrist2", "heel"]),
    (Channel::Inside2, &["inside2", "innside2", "outside"]),
    (Channel::Bridge, &["bridge"]),
];

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::from_key(s).ok_or_else(|| {
            format!(
                "unknown channel '{s}' (expected one of {})",
                Channel::ALL.map(Channel::as_str).join(", ")
            )
        })
    }
}
