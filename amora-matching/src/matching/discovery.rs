use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Match, User, UserRating};
use crate::schema::{blocks, matches, swipes, user_ratings, users};

/// Hard cap on rows pulled from the candidate pool before scoring.
const CANDIDATE_POOL_CAP: i64 = 500;
/// Sentinel in pref_gender meaning "no gender filter".
const PREF_GENDER_ALL: &str = "all";
/// Rating gap at which the ranking signal bottoms out.
const MAX_RATING_DIFF: f64 = 1000.0;
/// Activity signal decays linearly to zero over one week.
const ACTIVITY_DECAY_HOURS: f64 = 168.0;
/// Neutral placeholder until interest overlap is computed from real data.
const INTEREST_NEUTRAL: f64 = 0.5;

// -- Composite weights, sum to 1.0 --
const W_RANKING: f64 = 0.30;
const W_DISTANCE: f64 = 0.40;
const W_ACTIVITY: f64 = 0.20;
const W_INTERESTS: f64 = 0.10;

pub const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
pub struct ScoredProfile {
    #[serde(flatten)]
    pub user: User,
    pub rating: Option<UserRating>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Haversine distance in km between two lat/lon points.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const R: f64 = 6371.0; // Earth radius in km
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    R * c
}

fn age_in_years(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let days = (today - birthdate).num_days() as f64;
    (days / 365.25).floor() as i32
}

/// Weighted sum of the normalized sub-signals. A missing optional signal
/// contributes zero instead of failing the candidate.
fn composite_score(
    requester_rating: Option<f64>,
    candidate_rating: Option<f64>,
    distance_km: Option<f64>,
    max_distance_km: f64,
    hours_since_active: Option<f64>,
) -> f64 {
    let mut score = 0.0;

    // 1. Ranking: similarity in Glicko ratings
    if let (Some(a), Some(b)) = (requester_rating, candidate_rating) {
        let ranking = 1.0 - (a - b).abs() / MAX_RATING_DIFF;
        score += W_RANKING * ranking.max(0.0);
    }

    // 2. Distance: closer is better, normalized by the requester's radius
    if let Some(d) = distance_km {
        let proximity = 1.0 - d / max_distance_km;
        score += W_DISTANCE * proximity.max(0.0);
    }

    // 3. Activity: recency of the candidate's last profile activity
    if let Some(h) = hours_since_active {
        let activity = 1.0 - h / ACTIVITY_DECAY_HOURS;
        score += W_ACTIVITY * activity.max(0.0);
    }

    // 4. Interest overlap: not computed yet, neutral contribution
    score += W_INTERESTS * INTEREST_NEUTRAL;

    score
}

/// Rank the discoverable pool for one requester.
///
/// Read only. Requester must exist; every other absent signal degrades to a
/// zero contribution rather than failing the request.
pub fn discover_profiles(
    conn: &mut PgConnection,
    requester_id: Uuid,
    limit: i64,
) -> AppResult<Vec<ScoredProfile>> {
    let requester = users::table
        .find(requester_id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "requester not found"))?;

    let requester_rating = user_ratings::table
        .find(requester_id)
        .first::<UserRating>(conn)
        .optional()?;

    // Exclusion set: everyone already swiped, matched or blocked, plus self.
    let swiped_ids: Vec<Uuid> = swipes::table
        .filter(swipes::swiper_id.eq(requester_id))
        .select(swipes::swiped_id)
        .load(conn)?;

    let matched: Vec<Match> = matches::table
        .filter(
            matches::user1_id
                .eq(requester_id)
                .or(matches::user2_id.eq(requester_id)),
        )
        .load(conn)?;

    let blocked_ids: Vec<Uuid> = blocks::table
        .filter(blocks::blocker_id.eq(requester_id))
        .select(blocks::blocked_id)
        .load(conn)?;

    let mut excluded = swiped_ids;
    excluded.extend(matched.iter().map(|m| m.counterpart_of(requester_id)));
    excluded.extend(blocked_ids);
    excluded.push(requester_id);

    let mut candidate_query = users::table
        .filter(users::id.ne_all(&excluded))
        .into_boxed();

    if !requester.pref_gender.iter().any(|g| g == PREF_GENDER_ALL) {
        candidate_query = candidate_query.filter(users::gender.eq_any(&requester.pref_gender));
    }

    let candidates: Vec<User> = candidate_query.limit(CANDIDATE_POOL_CAP).load(conn)?;

    // One batched ratings fetch instead of a lookup per candidate.
    let candidate_ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let ratings_by_user: HashMap<Uuid, UserRating> = user_ratings::table
        .filter(user_ratings::user_id.eq_any(&candidate_ids))
        .load::<UserRating>(conn)?
        .into_iter()
        .map(|r| (r.user_id, r))
        .collect();

    let now = Utc::now();
    let today = now.date_naive();
    let max_distance_km = requester.pref_distance_km as f64;

    let mut scored = Vec::new();
    for candidate in candidates {
        let age = age_in_years(candidate.birthdate, today);
        if age < requester.pref_age_min || age > requester.pref_age_max {
            continue;
        }

        // Distance filtering only applies when both sides share coordinates;
        // a candidate exactly at the radius stays in.
        let mut distance_km = None;
        if let (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) = (
            requester.location_lat,
            requester.location_lon,
            candidate.location_lat,
            candidate.location_lon,
        ) {
            let d = haversine_km(lat1, lon1, lat2, lon2);
            if d > max_distance_km {
                continue;
            }
            distance_km = Some(d);
        }

        let hours_since_active = candidate
            .last_active
            .map(|t| (now - t).num_seconds() as f64 / 3600.0);
        let rating = ratings_by_user.get(&candidate.id).cloned();

        let score = composite_score(
            requester_rating.as_ref().map(|r| r.rating),
            rating.as_ref().map(|r| r.rating),
            distance_km,
            max_distance_km,
            hours_since_active,
        );

        scored.push(ScoredProfile {
            user: candidate,
            rating,
            score,
            distance_km,
        });
    }

    // Stable sort keeps pool order on equal scores.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit.max(0) as usize);

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(48.8566, 2.3522, 48.8566, 2.3522) < 1e-9);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        // One degree of latitude is roughly 111.2 km everywhere.
        let d = haversine_km(10.0, 20.0, 11.0, 20.0);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn haversine_known_city_pair() {
        // Paris to London, ~344 km great-circle.
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 344.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn age_counts_completed_years() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let on_birthday = NaiveDate::from_ymd_opt(1994, 6, 15).unwrap();
        let day_after = NaiveDate::from_ymd_opt(1994, 6, 16).unwrap();

        assert_eq!(age_in_years(on_birthday, today), 30);
        assert_eq!(age_in_years(day_after, today), 29);
    }

    #[test]
    fn all_signals_present_scores_near_top() {
        // Identical ratings, zero distance, active right now.
        let score = composite_score(Some(1500.0), Some(1500.0), Some(0.0), 50.0, Some(0.0));
        let expected = W_RANKING + W_DISTANCE + W_ACTIVITY + W_INTERESTS * INTEREST_NEUTRAL;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn missing_signals_leave_only_the_interest_floor() {
        let score = composite_score(None, None, None, 50.0, None);
        assert!((score - W_INTERESTS * INTEREST_NEUTRAL).abs() < 1e-12);
    }

    #[test]
    fn score_is_bounded() {
        let cases = [
            composite_score(Some(1500.0), Some(900.0), Some(49.9), 50.0, Some(500.0)),
            composite_score(Some(100.0), Some(3000.0), Some(0.0), 50.0, Some(0.0)),
            composite_score(None, Some(1500.0), None, 50.0, Some(10_000.0)),
        ];
        for score in cases {
            assert!((0.0..=1.0).contains(&score), "got {score}");
        }
    }

    #[test]
    fn closer_candidates_score_higher() {
        let near = composite_score(None, None, Some(5.0), 50.0, None);
        let far = composite_score(None, None, Some(45.0), 50.0, None);
        assert!(near > far);
    }

    #[test]
    fn similar_ratings_score_higher() {
        let close = composite_score(Some(1500.0), Some(1550.0), None, 50.0, None);
        let apart = composite_score(Some(1500.0), Some(2100.0), None, 50.0, None);
        assert!(close > apart);
    }

    #[test]
    fn recently_active_scores_higher() {
        let fresh = composite_score(None, None, None, 50.0, Some(1.0));
        let stale = composite_score(None, None, None, 50.0, Some(150.0));
        let dead = composite_score(None, None, None, 50.0, Some(400.0));
        assert!(fresh > stale);
        // Past one week the activity term is exhausted entirely.
        assert!((dead - composite_score(None, None, None, 50.0, None)).abs() < 1e-12);
    }

    #[test]
    fn rating_gap_beyond_cutoff_contributes_nothing() {
        let gapped = composite_score(Some(1000.0), Some(2500.0), None, 50.0, None);
        let absent = composite_score(None, None, None, 50.0, None);
        assert!((gapped - absent).abs() < 1e-12);
    }
}
