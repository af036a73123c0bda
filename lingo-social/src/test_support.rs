//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::blobs::{new_storage_key, BlobStore, MemoryBlobStore};
use crate::config::AppConfig;
use crate::events::EventPublisher;
use crate::models::Profile;
use crate::store::{MemoryStore, SocialStore};
use crate::AppState;

/// An adult profile with a picture key, not yet stored anywhere.
pub fn profile_fixture(username: &str, gender: &str) -> Profile {
    let user_id = Uuid::now_v7();
    let now = Utc::now();
    Profile {
        user_id,
        name: username.to_string(),
        username: username.to_string(),
        gender: gender.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1995, 3, 14).unwrap(),
        age: 30,
        age_group: "18-100".to_string(),
        country_code: "FR".to_string(),
        spoken_languages: vec!["fr".to_string()],
        learning_languages: vec!["en".to_string()],
        bio: String::new(),
        hobbies: Vec::new(),
        visited_countries: Vec::new(),
        wanted_countries: Vec::new(),
        favorite_books: Vec::new(),
        profile_picture: Some(new_storage_key(user_id)),
        gender_preference: false,
        is_admin: false,
        last_active_at: now,
        created_at: now,
        updated_at: now,
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    seeded: AtomicI64,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = Arc::new(AppState::new(
            store.clone() as Arc<dyn SocialStore>,
            blobs.clone() as Arc<dyn BlobStore>,
            EventPublisher::disabled(),
            AppConfig::in_memory(),
        ));
        Self { state, store, blobs, seeded: AtomicI64::new(0) }
    }

    /// Stores a discoverable profile whose picture has been uploaded.
    /// Each seeded profile is more recently active than the previous one.
    pub fn seed(&self, username: &str, gender: &str) -> Profile {
        self.seed_with(username, gender, |_| {})
    }

    pub fn seed_with(&self, username: &str, gender: &str, edit: impl FnOnce(&mut Profile)) -> Profile {
        let n = self.seeded.fetch_add(1, Ordering::SeqCst);
        let mut profile = profile_fixture(username, gender);
        profile.last_active_at = Utc::now() + Duration::seconds(n);
        edit(&mut profile);
        if let Some(key) = &profile.profile_picture {
            self.blobs.put(key);
        }
        self.store.insert_profile(&profile).unwrap();
        profile
    }
}
