//! Discovery: who a viewer may be shown, and in what order.

pub mod exclusion;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lingo_shared::errors::{AppError, AppResult, ErrorCode};
use lingo_shared::types::PaginationParams;

use crate::models::Profile;
use crate::store::CandidateQuery;
use crate::validation;

pub use exclusion::ExclusionSet;

/// Optional attribute criteria of the filter mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverFilter {
    pub country: Option<String>,
    pub spoken_language: Option<String>,
    pub learning_language: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DiscoverFilter {
    pub fn is_empty(&self) -> bool {
        non_blank(&self.country).is_none()
            && non_blank(&self.spoken_language).is_none()
            && non_blank(&self.learning_language).is_none()
    }

    /// Drops blank criteria and normalizes codes to their stored casing.
    pub fn normalized(&self) -> AppResult<Self> {
        if self.is_empty() {
            return Err(AppError::new(
                ErrorCode::MissingDiscoveryFilter,
                "at least one filter (country, spoken_language, learning_language) is required",
            ));
        }
        let country = non_blank(&self.country).map(validation::country_code).transpose()?;
        let spoken_language = non_blank(&self.spoken_language)
            .map(|l| single_language(l, "spoken_language"))
            .transpose()?;
        let learning_language = non_blank(&self.learning_language)
            .map(|l| single_language(l, "learning_language"))
            .transpose()?;
        Ok(Self {
            country,
            spoken_language,
            learning_language,
        })
    }
}

fn single_language(code: &str, field: &str) -> AppResult<String> {
    let mut codes = validation::language_codes(&[code.to_string()], field)?;
    Ok(codes.remove(0))
}

/// The three independent ways of browsing candidates.
#[derive(Debug, Clone)]
pub enum DiscoveryMode {
    Browse,
    Search(String),
    Filter(DiscoverFilter),
}

/// Builds the store lookup for `viewer`: same age group, same gender when the
/// viewer asked for it, nobody in the exclusion set.
pub fn candidate_query(
    viewer: &Profile,
    exclusions: &ExclusionSet,
    mode: &DiscoveryMode,
    page: &PaginationParams,
) -> CandidateQuery {
    let mut query = CandidateQuery {
        age_group: viewer.age_group.clone(),
        gender: viewer.gender_preference.then(|| viewer.gender.clone()),
        excluded: exclusions.to_sorted_vec(),
        text: None,
        country_code: None,
        spoken_language: None,
        learning_language: None,
        offset: page.offset(),
        limit: page.limit(),
    };

    match mode {
        DiscoveryMode::Browse => {}
        DiscoveryMode::Search(text) => query.text = Some(text.trim().to_lowercase()),
        DiscoveryMode::Filter(filter) => {
            query.country_code = filter.country.clone();
            query.spoken_language = filter.spoken_language.clone();
            query.learning_language = filter.learning_language.clone();
        }
    }
    query
}

/// Display-ready candidate card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverUser {
    pub user_id: Uuid,
    pub name: String,
    pub username: String,
    pub age: i32,
    pub gender: String,
    pub country_code: String,
    pub spoken_languages: Vec<String>,
    pub learning_languages: Vec<String>,
    pub bio: String,
    pub hobbies: Vec<String>,
    pub profile_picture_url: String,
    pub last_active_at: DateTime<Utc>,
}

impl DiscoverUser {
    pub fn new(profile: Profile, profile_picture_url: String) -> Self {
        Self {
            user_id: profile.user_id,
            name: profile.name,
            username: profile.username,
            age: profile.age,
            gender: profile.gender,
            country_code: profile.country_code,
            spoken_languages: profile.spoken_languages,
            learning_languages: profile.learning_languages,
            bio: profile.bio,
            hobbies: profile.hobbies,
            profile_picture_url,
            last_active_at: profile.last_active_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RelationshipIds;
    use crate::test_support::profile_fixture;

    #[test]
    fn filter_without_criteria_is_rejected() {
        let err = DiscoverFilter::default().normalized().unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MissingDiscoveryFilter));

        let blank = DiscoverFilter {
            country: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank.is_empty());
    }

    #[test]
    fn filter_normalizes_codes() {
        let filter = DiscoverFilter {
            country: Some("jp".into()),
            spoken_language: None,
            learning_language: Some("EN".into()),
        }
        .normalized()
        .unwrap();
        assert_eq!(filter.country.as_deref(), Some("JP"));
        assert_eq!(filter.learning_language.as_deref(), Some("en"));
    }

    #[test]
    fn gender_preference_restricts_the_pool() {
        let mut viewer = profile_fixture("viewer", "female");
        let exclusions = ExclusionSet::build(viewer.user_id, &RelationshipIds::default());
        let page = PaginationParams::default();

        let query = candidate_query(&viewer, &exclusions, &DiscoveryMode::Browse, &page);
        assert_eq!(query.gender, None);
        assert_eq!(query.age_group, "18-100");

        viewer.gender_preference = true;
        let query = candidate_query(&viewer, &exclusions, &DiscoveryMode::Browse, &page);
        assert_eq!(query.gender.as_deref(), Some("female"));
        assert_eq!(query.excluded, vec![viewer.user_id]);
    }

    #[test]
    fn search_text_is_lowercased() {
        let viewer = profile_fixture("viewer", "male");
        let exclusions = ExclusionSet::build(viewer.user_id, &RelationshipIds::default());
        let query = candidate_query(
            &viewer,
            &exclusions,
            &DiscoveryMode::Search("  MaRi ".into()),
            &PaginationParams::new(2, 10),
        );
        assert_eq!(query.text.as_deref(), Some("mari"));
        assert_eq!((query.offset, query.limit), (10, 10));
    }
}
