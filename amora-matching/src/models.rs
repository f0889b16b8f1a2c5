use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{matches, messages, swipes, user_ratings, users};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub bio: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub is_verified: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub pref_gender: Vec<String>,
    pub pref_age_min: i32,
    pub pref_age_max: i32,
    pub pref_distance_km: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub birthdate: NaiveDate,
    pub gender: String,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = users)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub pref_gender: Option<Vec<String>>,
    pub pref_age_min: Option<i32>,
    pub pref_age_max: Option<i32>,
    pub pref_distance_km: Option<i32>,
}

// --- UserRating ---

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct UserRating {
    pub user_id: Uuid,
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_ratings)]
pub struct NewUserRating {
    pub user_id: Uuid,
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
}

// --- Swipe ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Swipe {
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub direction: String,
    pub created_at: DateTime<Utc>,
}

impl Swipe {
    pub fn is_right(&self) -> bool {
        self.direction == SwipeDirection::Right.as_str()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = swipes)]
pub struct NewSwipe {
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub direction: String,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other side of the pair. Callers must check `involves` first.
    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_participant_helpers() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let record = Match {
            id: Uuid::new_v4(),
            user1_id: a,
            user2_id: b,
            created_at: Utc::now(),
        };

        assert!(record.involves(a));
        assert!(record.involves(b));
        assert!(!record.involves(stranger));
        assert_eq!(record.counterpart_of(a), b);
        assert_eq!(record.counterpart_of(b), a);
    }
}
