//! # Staging Data Model
//!
//! Song records, lineups, the baseline snapshot and the payloads exchanged
//! with the song API.
//!
//! Lineup positions follow the API's loose conventions on input: `null`, a
//! missing field and `0` all mean "not in this lineup". On output an absent
//! position is simply omitted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StagingError;

// ============================================================================
// Lineups
// ============================================================================

/// One of the four ordered song lists a record can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lineup {
    Swc,
    Tnl,
    Event,
    Active,
}

impl Lineup {
    pub const ALL: [Lineup; 4] = [Lineup::Swc, Lineup::Tnl, Lineup::Event, Lineup::Active];

    /// Field name used on the wire
    pub fn key(self) -> &'static str {
        match self {
            Lineup::Swc => "swc",
            Lineup::Tnl => "tnl",
            Lineup::Event => "event",
            Lineup::Active => "active",
        }
    }

    /// Heading shown for the lineup. The event lineup is named after the
    /// configured event.
    pub fn title(self, event_title: &str) -> String {
        match self {
            Lineup::Swc => "Sunday Worship Celebration".to_string(),
            Lineup::Tnl => "Thursday Night Live".to_string(),
            Lineup::Event => event_title.to_string(),
            Lineup::Active => "Active Songs".to_string(),
        }
    }
}

impl fmt::Display for Lineup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Lineup {
    type Err = StagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swc" => Ok(Lineup::Swc),
            "tnl" => Ok(Lineup::Tnl),
            "event" => Ok(Lineup::Event),
            "active" => Ok(Lineup::Active),
            other => Err(StagingError::invalid_input(
                "lineup",
                format!("unknown lineup '{}'", other),
            )),
        }
    }
}

// ============================================================================
// Songs
// ============================================================================

/// A song record as stored by the song API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "position::deserialize"
    )]
    pub swc: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "position::deserialize"
    )]
    pub tnl: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "position::deserialize"
    )]
    pub event: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "position::deserialize"
    )]
    pub active: Option<u32>,
}

impl Song {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            lyrics: None,
            swc: None,
            tnl: None,
            event: None,
            active: None,
        }
    }

    /// Builder-style position setter, mostly for fixtures.
    pub fn with_position(mut self, lineup: Lineup, position: u32) -> Self {
        self.set_position(lineup, Some(position));
        self
    }

    pub fn position(&self, lineup: Lineup) -> Option<u32> {
        match lineup {
            Lineup::Swc => self.swc,
            Lineup::Tnl => self.tnl,
            Lineup::Event => self.event,
            Lineup::Active => self.active,
        }
    }

    /// Sets or clears the position. `Some(0)` is treated as clearing.
    pub fn set_position(&mut self, lineup: Lineup, position: Option<u32>) {
        let position = position.filter(|p| *p > 0);
        match lineup {
            Lineup::Swc => self.swc = position,
            Lineup::Tnl => self.tnl = position,
            Lineup::Event => self.event = position,
            Lineup::Active => self.active = position,
        }
    }

    pub fn is_member(&self, lineup: Lineup) -> bool {
        self.position(lineup).is_some()
    }

    /// True when the song belongs to no lineup at all.
    pub fn is_unassigned(&self) -> bool {
        Lineup::ALL.iter().all(|lineup| !self.is_member(*lineup))
    }

    /// Copy of the record with the lyric text dropped.
    pub fn without_lyrics(&self) -> Song {
        Song {
            lyrics: None,
            ..self.clone()
        }
    }
}

/// User input for a brand new song. The id is derived, never typed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongDraft {
    pub title: String,
    pub artist: String,
    pub lyrics: Option<String>,
}

impl SongDraft {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            lyrics: None,
        }
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }

    /// Turns the draft into a record carrying its generated id.
    pub fn into_song(self) -> Song {
        let id = crate::identity::generate_song_id(&self.title, &self.artist);
        Song {
            lyrics: self.lyrics,
            ..Song::new(id, self.title, self.artist)
        }
    }
}

// ============================================================================
// Baseline
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    #[serde(default)]
    pub title: String,
}

/// The last server-confirmed state of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default)]
    pub info: EventInfo,
}

impl BaselineSnapshot {
    pub fn new(songs: Vec<Song>, event_title: impl Into<String>) -> Self {
        Self {
            songs,
            info: EventInfo {
                title: event_title.into(),
            },
        }
    }

    pub fn find(&self, id: &str) -> Option<&Song> {
        self.songs.iter().find(|song| song.id == id)
    }

    pub fn event_title(&self) -> &str {
        &self.info.title
    }
}

// ============================================================================
// Diff records and remote payloads
// ============================================================================

/// Attributes that changed between a baseline record and its edit.
///
/// The outer `Option` says whether the attribute changed. For lineups the
/// inner `None` means the song left the lineup and is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SongPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swc: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tnl: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<Option<u32>>,
}

impl SongPatch {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    pub fn lineup(&self, lineup: Lineup) -> Option<Option<u32>> {
        match lineup {
            Lineup::Swc => self.swc,
            Lineup::Tnl => self.tnl,
            Lineup::Event => self.event,
            Lineup::Active => self.active,
        }
    }

    pub(crate) fn set_lineup(&mut self, lineup: Lineup, change: Option<u32>) {
        let slot = match lineup {
            Lineup::Swc => &mut self.swc,
            Lineup::Tnl => &mut self.tnl,
            Lineup::Event => &mut self.event,
            Lineup::Active => &mut self.active,
        };
        *slot = Some(change);
    }

    /// Wire names of the attributes this patch touches, in field order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.artist.is_some() {
            fields.push("artist");
        }
        for lineup in Lineup::ALL {
            if self.lineup(lineup).is_some() {
                fields.push(lineup.key());
            }
        }
        fields
    }

    /// Replays the patch onto a record.
    pub fn apply(&self, song: &mut Song) {
        if let Some(title) = &self.title {
            song.title = title.clone();
        }
        if let Some(artist) = &self.artist {
            song.artist = artist.clone();
        }
        for lineup in Lineup::ALL {
            if let Some(position) = self.lineup(lineup) {
                song.set_position(lineup, position);
            }
        }
    }
}

/// One entry of a commit: either the changed attributes of a baselined
/// record, or a whole new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DiffRecord {
    Patch {
        id: String,
        #[serde(flatten)]
        patch: SongPatch,
    },
    New(Song),
}

impl DiffRecord {
    pub fn id(&self) -> &str {
        match self {
            DiffRecord::Patch { id, .. } => id,
            DiffRecord::New(song) => &song.id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, DiffRecord::New(_))
    }
}

/// Body of `POST /api/songs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRequest {
    pub songs: Vec<DiffRecord>,
    pub event_title: String,
}

/// Body of `POST /api/songTxt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextUpload {
    pub filename: String,
    pub text: String,
}

/// Where an uploaded lyric text ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Blob path, `txt/{sanitized}.txt`
    pub pathname: String,
    /// Public URL, when the storage service reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

mod position {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
            Some(Value::Number(number)) => {
                if let Some(int) = number.as_u64() {
                    return positive(int).map_err(D::Error::custom);
                }
                match number.as_f64() {
                    Some(float) if float == 0.0 => Ok(None),
                    Some(float) if float > 0.0 && float.fract() == 0.0 => {
                        positive(float as u64).map_err(D::Error::custom)
                    }
                    _ => Err(D::Error::custom(format!(
                        "invalid lineup position: {}",
                        number
                    ))),
                }
            }
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => text
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid lineup position: {:?}", text))
                .and_then(positive)
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!(
                "invalid lineup position: {}",
                other
            ))),
        }
    }

    fn positive(value: u64) -> Result<Option<u32>, String> {
        if value == 0 {
            return Ok(None);
        }
        u32::try_from(value)
            .map(Some)
            .map_err(|_| format!("lineup position out of range: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_positions_are_absent() {
        let song: Song = serde_json::from_value(json!({
            "id": "a",
            "title": "A Song",
            "artist": "Someone",
            "swc": 0,
            "tnl": null,
            "active": 3,
            "unknown": "ignored"
        }))
        .unwrap();

        assert_eq!(song.swc, None);
        assert_eq!(song.tnl, None);
        assert_eq!(song.event, None);
        assert_eq!(song.active, Some(3));
    }

    #[test]
    fn test_lenient_position_encodings() {
        let song: Song = serde_json::from_value(json!({
            "id": "a",
            "swc": 2.0,
            "tnl": "4",
            "event": ""
        }))
        .unwrap();

        assert_eq!(song.swc, Some(2));
        assert_eq!(song.tnl, Some(4));
        assert_eq!(song.event, None);
        assert_eq!(song.title, "");

        let bad = serde_json::from_value::<Song>(json!({"id": "a", "swc": -1}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_absent_positions_are_omitted() {
        let song = Song::new("a", "A Song", "Someone").with_position(Lineup::Swc, 1);
        let value = serde_json::to_value(&song).unwrap();

        assert_eq!(
            value,
            json!({"id": "a", "title": "A Song", "artist": "Someone", "swc": 1})
        );
    }

    #[test]
    fn test_patch_serializes_removed_lineup_as_null() {
        let mut patch = SongPatch::default();
        patch.set_lineup(Lineup::Tnl, Some(1));
        patch.set_lineup(Lineup::Swc, None);

        let record = DiffRecord::Patch {
            id: "a".into(),
            patch,
        };
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value, json!({"id": "a", "swc": null, "tnl": 1}));
    }

    #[test]
    fn test_new_record_serializes_in_full() {
        let record = DiffRecord::New(Song::new("b", "B Song", "Other").with_position(Lineup::Event, 2));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            json!({"id": "b", "title": "B Song", "artist": "Other", "event": 2})
        );
        assert!(record.is_new());
        assert_eq!(record.id(), "b");
    }

    #[test]
    fn test_patch_apply_and_fields() {
        let mut song = Song::new("a", "A Song", "Someone").with_position(Lineup::Swc, 1);
        let patch = SongPatch {
            title: Some("A Better Song".into()),
            swc: Some(None),
            active: Some(Some(2)),
            ..SongPatch::default()
        };

        patch.apply(&mut song);

        assert_eq!(song.title, "A Better Song");
        assert_eq!(song.swc, None);
        assert_eq!(song.active, Some(2));
        assert_eq!(patch.changed_fields(), vec!["title", "swc", "active"]);
        assert!(!patch.is_empty());
        assert!(SongPatch::default().is_empty());
    }

    #[test]
    fn test_lineup_keys_and_titles() {
        assert_eq!(Lineup::Swc.to_string(), "swc");
        assert_eq!("ACTIVE".parse::<Lineup>().unwrap(), Lineup::Active);
        assert!("choir".parse::<Lineup>().is_err());
        assert_eq!(Lineup::Event.title("Easter Sunrise"), "Easter Sunrise");
        assert_eq!(Lineup::Tnl.title("ignored"), "Thursday Night Live");
    }

    #[test]
    fn test_membership_helpers() {
        let mut song = Song::new("a", "A Song", "Someone");
        assert!(song.is_unassigned());

        song.set_position(Lineup::Event, Some(0));
        assert!(song.is_unassigned());

        song.set_position(Lineup::Event, Some(5));
        assert!(song.is_member(Lineup::Event));
        assert!(!song.is_unassigned());
    }

    #[test]
    fn test_snapshot_defaults_and_lookup() {
        let snapshot: BaselineSnapshot =
            serde_json::from_value(json!({"songs": [{"id": "a", "title": "A"}]})).unwrap();

        assert_eq!(snapshot.event_title(), "");
        assert!(snapshot.find("a").is_some());
        assert!(snapshot.find("z").is_none());
    }
}
