use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{blocked_users, comments, friend_requests, friendships, likes, posts, profiles};

// --- Enumerations stored as text ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

/// Coarse discovery partition, fixed when the profile is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "13-17")]
    Teen,
    #[serde(rename = "18-100")]
    Adult,
}

impl AgeGroup {
    pub const MIN_AGE: i32 = 13;
    pub const MAX_AGE: i32 = 100;

    pub fn from_age(age: i32) -> Option<Self> {
        match age {
            13..=17 => Some(AgeGroup::Teen),
            18..=100 => Some(AgeGroup::Adult),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Teen => "13-17",
            AgeGroup::Adult => "18-100",
        }
    }
}

// --- Profile ---

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = profiles)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub username: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub age_group: String,
    pub country_code: String,
    pub spoken_languages: Vec<String>,
    pub learning_languages: Vec<String>,
    pub bio: String,
    pub hobbies: Vec<String>,
    pub visited_countries: Vec<String>,
    pub wanted_countries: Vec<String>,
    pub favorite_books: Vec<String>,
    pub profile_picture: Option<String>,
    pub gender_preference: bool,
    pub is_admin: bool,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable profile fields. Username, gender and birth date are fixed at creation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub country_code: Option<String>,
    pub spoken_languages: Option<Vec<String>>,
    pub learning_languages: Option<Vec<String>>,
    pub bio: Option<String>,
    pub hobbies: Option<Vec<String>>,
    pub visited_countries: Option<Vec<String>>,
    pub wanted_countries: Option<Vec<String>>,
    pub favorite_books: Option<Vec<String>>,
    pub profile_picture: Option<String>,
    pub gender_preference: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileChanges {
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = &self.name {
            profile.name = v.clone();
        }
        if let Some(v) = &self.country_code {
            profile.country_code = v.clone();
        }
        if let Some(v) = &self.spoken_languages {
            profile.spoken_languages = v.clone();
        }
        if let Some(v) = &self.learning_languages {
            profile.learning_languages = v.clone();
        }
        if let Some(v) = &self.bio {
            profile.bio = v.clone();
        }
        if let Some(v) = &self.hobbies {
            profile.hobbies = v.clone();
        }
        if let Some(v) = &self.visited_countries {
            profile.visited_countries = v.clone();
        }
        if let Some(v) = &self.wanted_countries {
            profile.wanted_countries = v.clone();
        }
        if let Some(v) = &self.favorite_books {
            profile.favorite_books = v.clone();
        }
        if let Some(v) = &self.profile_picture {
            profile.profile_picture = Some(v.clone());
        }
        if let Some(v) = self.gender_preference {
            profile.gender_preference = v;
        }
        profile.updated_at = self.updated_at;
    }
}

// --- Friendship ---

/// One record per pair, always stored with `user_id1 < user_id2`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = friendships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Friendship {
    pub id: Uuid,
    pub user_id1: Uuid,
    pub user_id2: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Order-independent key for a pair of users.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

impl Friendship {
    pub fn between(a: Uuid, b: Uuid) -> Self {
        let (user_id1, user_id2) = canonical_pair(a, b);
        Self {
            id: Uuid::now_v7(),
            user_id1,
            user_id2,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_id1 == user_id || self.user_id2 == user_id
    }

    /// The member of the pair that is not `user_id`.
    pub fn other(&self, user_id: Uuid) -> Uuid {
        if self.user_id1 == user_id { self.user_id2 } else { self.user_id1 }
    }
}

// --- FriendRequest ---

/// A pending request; the record existing is the pending state.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = friend_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.receiver_id == b) || (self.sender_id == b && self.receiver_id == a)
    }
}

// --- BlockedUser ---

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = blocked_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlockedUser {
    pub id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// --- Post ---

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Comment ---

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// --- Like ---

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Like {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_group_buckets() {
        assert_eq!(AgeGroup::from_age(12), None);
        assert_eq!(AgeGroup::from_age(13), Some(AgeGroup::Teen));
        assert_eq!(AgeGroup::from_age(17), Some(AgeGroup::Teen));
        assert_eq!(AgeGroup::from_age(18), Some(AgeGroup::Adult));
        assert_eq!(AgeGroup::from_age(100), Some(AgeGroup::Adult));
        assert_eq!(AgeGroup::from_age(101), None);
    }

    #[test]
    fn friendship_is_stored_in_canonical_order() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let ab = Friendship::between(a, b);
        let ba = Friendship::between(b, a);
        assert_eq!((ab.user_id1, ab.user_id2), (ba.user_id1, ba.user_id2));
        assert!(ab.user_id1 < ab.user_id2);
        assert_eq!(ab.other(a), b);
        assert_eq!(ab.other(b), a);
    }
}
