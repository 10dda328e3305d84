use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{
    validate_color, Availability, AvailabilityStatus, AvailabilityUpdate, Event, EventListing,
    NewEvent, NewParticipant, Participant,
};
use crate::timekey::TimeKey;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("event {0} not found")]
    EventNotFound(Uuid),

    #[error("participant {0} not found")]
    ParticipantNotFound(Uuid),

    #[error("event is full ({max} participants)")]
    EventFull { max: u32 },

    #[error("nickname '{0}' is already taken in this event")]
    DuplicateNickname(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize store snapshot: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    events: Vec<Event>,
    participants: Vec<Participant>,
}

impl Snapshot {
    fn event(&self, id: Uuid) -> Result<&Event> {
        self.events
            .iter()
            .find(|e| e.id == id)
            .ok_or(StoreError::EventNotFound(id))
    }

    fn participants_of(&self, event_id: Uuid) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |p| p.event_id == event_id)
    }
}

/// Events, participants and their availability.
///
/// Every mutation rewrites the whole snapshot to the data file, if one is set.
/// A mutation whose write fails is rolled back before the error is returned.
/// Participants only ever replace their own availability map, so concurrent
/// edits resolve as last-write-wins per participant.
pub struct Store {
    path: Option<PathBuf>,
    inner: Mutex<Snapshot>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(Snapshot::default()),
        }
    }

    /// Load the snapshot at `path`; a missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        info!(
            "Store: loaded {} events, {} participants from {}",
            snapshot.events.len(),
            snapshot.participants.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path),
            inner: Mutex::new(snapshot),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Store: wrote snapshot to {}", path.display());
        Ok(())
    }

    /// Newest first.
    pub fn list_events(&self) -> Vec<EventListing> {
        let snapshot = self.lock();
        snapshot
            .events
            .iter()
            .rev()
            .map(|event| EventListing {
                event: event.clone(),
                participant_count: snapshot.participants_of(event.id).count(),
            })
            .collect()
    }

    pub fn get_event(&self, id: Uuid) -> Result<Event> {
        self.lock().event(id).cloned()
    }

    /// Create an event and join its creator as the first participant.
    pub fn create_event(&self, new: NewEvent) -> Result<(Event, Participant)> {
        let title = non_empty(&new.title, "title")?;
        let creator_name = non_empty(&new.creator_name, "creator name")?;
        validate_color(&new.creator_color)?;
        if new.max_participants == 0 {
            return Err(ValidationError::InvalidCapacity.into());
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title,
            description: new.description.trim().to_string(),
            time_unit: new.time_unit,
            max_participants: new.max_participants,
            creator_name: creator_name.clone(),
            creator_color: new.creator_color.clone(),
            created_at: now,
        };
        let creator = Participant {
            id: Uuid::new_v4(),
            event_id: event.id,
            nickname: creator_name,
            color: new.creator_color,
            joined_at: now,
            availability: Availability::new(),
        };

        let mut snapshot = self.lock();
        snapshot.events.push(event.clone());
        snapshot.participants.push(creator.clone());
        if let Err(e) = self.persist(&snapshot) {
            snapshot.events.pop();
            snapshot.participants.pop();
            return Err(e);
        }
        info!("Store: created event {} ({})", event.id, event.title);
        Ok((event, creator))
    }

    /// Participants of an event in join order.
    pub fn participants(&self, event_id: Uuid) -> Result<Vec<Participant>> {
        let snapshot = self.lock();
        snapshot.event(event_id)?;
        Ok(snapshot.participants_of(event_id).cloned().collect())
    }

    pub fn join(&self, event_id: Uuid, new: NewParticipant) -> Result<Participant> {
        let nickname = non_empty(&new.name, "name")?;
        validate_color(&new.color)?;

        let mut snapshot = self.lock();
        let max = snapshot.event(event_id)?.max_participants;
        let mut count = 0usize;
        for p in snapshot.participants_of(event_id) {
            if p.nickname == nickname {
                return Err(StoreError::DuplicateNickname(nickname));
            }
            count += 1;
        }
        if count >= max as usize {
            return Err(StoreError::EventFull { max });
        }

        let participant = Participant {
            id: Uuid::new_v4(),
            event_id,
            nickname,
            color: new.color,
            joined_at: Utc::now(),
            availability: Availability::new(),
        };
        snapshot.participants.push(participant.clone());
        if let Err(e) = self.persist(&snapshot) {
            snapshot.participants.pop();
            return Err(e);
        }
        info!(
            "Store: {} joined event {} ({}/{})",
            participant.nickname,
            event_id,
            count + 1,
            max
        );
        Ok(participant)
    }

    /// Replace a participant's whole availability map.
    ///
    /// Every entry is checked against the event's granularity before anything
    /// is written; a later duplicate key overrides an earlier one.
    pub fn replace_availability(&self, update: &AvailabilityUpdate) -> Result<Participant> {
        let mut snapshot = self.lock();
        let index = snapshot
            .participants
            .iter()
            .position(|p| p.id == update.participant_id)
            .ok_or(StoreError::ParticipantNotFound(update.participant_id))?;
        let unit = snapshot
            .event(snapshot.participants[index].event_id)?
            .time_unit;

        let mut availability = Availability::new();
        for entry in &update.availability {
            let status: AvailabilityStatus = entry.status.parse()?;
            TimeKey::parse_for(&entry.date_time, unit)?;
            availability.insert(entry.date_time.clone(), status);
        }

        let previous =
            std::mem::replace(&mut snapshot.participants[index].availability, availability);
        if let Err(e) = self.persist(&snapshot) {
            snapshot.participants[index].availability = previous;
            return Err(e);
        }
        let participant = snapshot.participants[index].clone();
        info!(
            "Store: {} saved {} availability entries",
            participant.nickname,
            participant.availability.len()
        );
        Ok(participant)
    }
}

fn non_empty(value: &str, field: &'static str) -> std::result::Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityEntry, TimeUnit};

    fn new_event(unit: TimeUnit, max: u32) -> NewEvent {
        NewEvent {
            title: "Weekend meetup".into(),
            description: "Pick a date".into(),
            time_unit: unit,
            max_participants: max,
            creator_name: "Alice".into(),
            creator_color: "#8B5CF6".into(),
        }
    }

    fn joiner(name: &str) -> NewParticipant {
        NewParticipant {
            name: name.into(),
            color: "#FBCFE8".into(),
        }
    }

    fn entry(key: &str, status: &str) -> AvailabilityEntry {
        AvailabilityEntry {
            date_time: key.into(),
            status: status.into(),
        }
    }

    #[test]
    fn test_create_event_joins_creator() {
        let store = Store::in_memory();
        let (event, creator) = store.create_event(new_event(TimeUnit::Day, 5)).unwrap();
        assert_eq!(creator.nickname, "Alice");
        assert_eq!(store.participants(event.id).unwrap(), vec![creator]);
        assert_eq!(store.list_events()[0].participant_count, 1);
    }

    #[test]
    fn test_create_event_validates_input() {
        let store = Store::in_memory();
        let mut bad = new_event(TimeUnit::Day, 0);
        assert!(matches!(
            store.create_event(bad.clone()),
            Err(StoreError::Invalid(ValidationError::InvalidCapacity))
        ));
        bad.max_participants = 3;
        bad.title = "   ".into();
        assert!(matches!(
            store.create_event(bad),
            Err(StoreError::Invalid(ValidationError::Empty("title")))
        ));
    }

    #[test]
    fn test_list_events_newest_first() {
        let store = Store::in_memory();
        let (first, _) = store.create_event(new_event(TimeUnit::Day, 5)).unwrap();
        let (second, _) = store.create_event(new_event(TimeUnit::Hour, 5)).unwrap();
        let ids: Vec<Uuid> = store.list_events().iter().map(|l| l.event.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_join_respects_capacity_and_nicknames() {
        let store = Store::in_memory();
        let (event, _) = store.create_event(new_event(TimeUnit::Day, 2)).unwrap();
        assert!(matches!(
            store.join(event.id, joiner("Alice")),
            Err(StoreError::DuplicateNickname(name)) if name == "Alice"
        ));
        store.join(event.id, joiner("Bob")).unwrap();
        assert!(matches!(
            store.join(event.id, joiner("Carol")),
            Err(StoreError::EventFull { max: 2 })
        ));
        assert_eq!(store.participants(event.id).unwrap().len(), 2);
    }

    #[test]
    fn test_join_unknown_event() {
        let store = Store::in_memory();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.join(id, joiner("Bob")),
            Err(StoreError::EventNotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_replace_availability_replaces_whole_map() {
        let store = Store::in_memory();
        let (_, creator) = store.create_event(new_event(TimeUnit::Day, 5)).unwrap();
        store
            .replace_availability(&AvailabilityUpdate {
                participant_id: creator.id,
                availability: vec![entry("2024-01-20", "available"), entry("2024-01-21", "maybe")],
            })
            .unwrap();
        let updated = store
            .replace_availability(&AvailabilityUpdate {
                participant_id: creator.id,
                availability: vec![entry("2024-01-22", "unavailable")],
            })
            .unwrap();
        assert_eq!(updated.availability.len(), 1);
        assert_eq!(
            updated.availability.get("2024-01-22"),
            Some(&AvailabilityStatus::Unavailable)
        );
    }

    #[test]
    fn test_replace_availability_rejects_bad_entries_atomically() {
        let store = Store::in_memory();
        let (event, creator) = store.create_event(new_event(TimeUnit::Day, 5)).unwrap();
        let err = store
            .replace_availability(&AvailabilityUpdate {
                participant_id: creator.id,
                availability: vec![
                    entry("2024-01-20", "available"),
                    entry("2024-01-20T09:00-10:00", "available"),
                ],
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invalid(ValidationError::GranularityMismatch { .. })
        ));

        let err = store
            .replace_availability(&AvailabilityUpdate {
                participant_id: creator.id,
                availability: vec![entry("2024-01-20", "pending")],
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(ValidationError::UnknownStatus(_))));
        let people = store.participants(event.id).unwrap();
        assert!(people[0].availability.is_empty());
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.json");

        let store = Store::open(&path).unwrap();
        let (event, creator) = store.create_event(new_event(TimeUnit::Hour, 4)).unwrap();
        let bob = store.join(event.id, joiner("Bob")).unwrap();
        store
            .replace_availability(&AvailabilityUpdate {
                participant_id: bob.id,
                availability: vec![entry("2024-01-20T09:00-10:00", "maybe")],
            })
            .unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get_event(event.id).unwrap(), event);
        let people = reopened.participants(event.id).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].id, creator.id);
        assert_eq!(
            people[1].availability.get("2024-01-20T09:00-10:00"),
            Some(&AvailabilityStatus::Maybe)
        );
    }

    #[test]
    fn test_open_rejects_unknown_status_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.json");
        let event_id = Uuid::new_v4();
        let json = serde_json::json!({
            "events": [],
            "participants": [{
                "id": Uuid::new_v4(),
                "eventId": event_id,
                "nickname": "Mallory",
                "color": "#000000",
                "joinedAt": "2024-01-15T00:00:00Z",
                "availability": { "2024-01-20": "pending" }
            }]
        });
        std::fs::write(&path, json.to_string()).unwrap();
        assert!(matches!(Store::open(&path), Err(StoreError::Serde(_))));
    }

    #[test]
    fn test_failed_create_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("missing-dir").join("planner.json")).unwrap();
        let err = store
            .create_event(new_event(TimeUnit::Day, 5))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.list_events().is_empty());
    }

    #[test]
    fn test_failed_writes_are_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let store = Store::open(data_dir.join("planner.json")).unwrap();
        let (event, creator) = store.create_event(new_event(TimeUnit::Day, 5)).unwrap();
        store
            .replace_availability(&AvailabilityUpdate {
                participant_id: creator.id,
                availability: vec![entry("2024-01-20", "available")],
            })
            .unwrap();

        std::fs::remove_dir_all(&data_dir).unwrap();

        let err = store.join(event.id, joiner("Bob")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        let err = store
            .replace_availability(&AvailabilityUpdate {
                participant_id: creator.id,
                availability: vec![entry("2024-01-21", "maybe")],
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        let people = store.participants(event.id).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(
            people[0].availability,
            Availability::from([("2024-01-20".to_string(), AvailabilityStatus::Available)])
        );
        assert_eq!(store.list_events()[0].participant_count, 1);

        // Once the directory is back, retrying the same join succeeds.
        std::fs::create_dir(&data_dir).unwrap();
        let bob = store.join(event.id, joiner("Bob")).unwrap();
        assert_eq!(bob.nickname, "Bob");
    }
}
