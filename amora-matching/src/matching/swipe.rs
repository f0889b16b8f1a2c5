use chrono::Utc;
use diesel::dsl::{exists, select};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use super::glicko::{self, GlickoRating, Outcome};
use crate::models::{Match, NewMatch, NewSwipe, Swipe, SwipeDirection, UserRating};
use crate::schema::{matches, swipes, user_ratings, users};

#[derive(Debug, Serialize)]
pub struct SwipeOutcome {
    pub swipe: Swipe,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_record: Option<Match>,
    pub is_match: bool,
}

/// Record one swipe and run the transitions that hang off it: the rating
/// exchange on a like, mutual-like detection, and match creation.
pub fn record_swipe(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    swiped_id: Uuid,
    direction: SwipeDirection,
) -> AppResult<SwipeOutcome> {
    if swiper_id == swiped_id {
        return Err(AppError::new(
            ErrorCode::CannotSwipeSelf,
            "cannot swipe on yourself",
        ));
    }

    let target_exists: bool =
        select(exists(users::table.find(swiped_id))).get_result(conn)?;
    if !target_exists {
        return Err(AppError::new(
            ErrorCode::ProfileNotFound,
            "swiped user not found",
        ));
    }

    // One swipe per ordered pair, ever.
    let already = swipes::table
        .find((swiper_id, swiped_id))
        .first::<Swipe>(conn)
        .optional()?;
    if already.is_some() {
        return Err(AppError::new(
            ErrorCode::AlreadySwiped,
            "already swiped on this user",
        ));
    }

    let swipe: Swipe = diesel::insert_into(swipes::table)
        .values(&NewSwipe {
            swiper_id,
            swiped_id,
            direction: direction.as_str().to_string(),
        })
        .get_result(conn)
        .map_err(|e| match e {
            // Two identical swipes racing past the pre-check: the primary
            // key settles it, the loser gets the same Conflict.
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => AppError::new(ErrorCode::AlreadySwiped, "already swiped on this user"),
            other => AppError::Database(other),
        })?;

    if direction == SwipeDirection::Left {
        return Ok(SwipeOutcome {
            swipe,
            match_record: None,
            is_match: false,
        });
    }

    exchange_ratings(conn, swiper_id, swiped_id)?;

    // Mutual like: the reverse right-swipe must already be on record.
    let reverse = swipes::table
        .find((swiped_id, swiper_id))
        .first::<Swipe>(conn)
        .optional()?;
    if !reverse.map(|s| s.is_right()).unwrap_or(false) {
        return Ok(SwipeOutcome {
            swipe,
            match_record: None,
            is_match: false,
        });
    }

    let match_record = create_match_once(conn, swiper_id, swiped_id)?;

    tracing::info!(
        match_id = %match_record.id,
        user1 = %match_record.user1_id,
        user2 = %match_record.user2_id,
        "mutual like, match created"
    );

    Ok(SwipeOutcome {
        swipe,
        match_record: Some(match_record),
        is_match: true,
    })
}

/// Apply the Glicko-2 exchange for a like: the swiper takes the win, the
/// swiped profile takes the loss, both computed from the same pre-update
/// snapshot. Rows are locked in sorted id order inside one transaction so
/// concurrent likes touching the same user never lose an update.
fn exchange_ratings(conn: &mut PgConnection, swiper_id: Uuid, swiped_id: Uuid) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let (lo, hi) = canonical_pair(swiper_id, swiped_id);
        let lo_row = lock_rating(conn, lo)?;
        let hi_row = lock_rating(conn, hi)?;

        let (swiper_row, swiped_row) = if lo == swiper_id {
            (lo_row, hi_row)
        } else {
            (hi_row, lo_row)
        };

        // Either side missing a rating row: skip the exchange, the swipe stands.
        let (Some(swiper_row), Some(swiped_row)) = (swiper_row, swiped_row) else {
            tracing::warn!(
                swiper = %swiper_id,
                swiped = %swiped_id,
                "rating row missing, skipping rating exchange"
            );
            return Ok(());
        };

        let swiper_before = as_glicko(&swiper_row);
        let swiped_before = as_glicko(&swiped_row);

        let swiper_after = glicko::update(swiper_before, swiped_before, Outcome::Win);
        let swiped_after = glicko::update(swiped_before, swiper_before, Outcome::Loss);

        store_rating(conn, swiper_id, swiper_after)?;
        store_rating(conn, swiped_id, swiped_after)?;

        Ok(())
    })
}

fn lock_rating(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<UserRating>> {
    let row = user_ratings::table
        .find(user_id)
        .for_update()
        .first::<UserRating>(conn)
        .optional()?;
    Ok(row)
}

fn as_glicko(row: &UserRating) -> GlickoRating {
    GlickoRating {
        rating: row.rating,
        deviation: row.deviation,
        volatility: row.volatility,
    }
}

fn store_rating(conn: &mut PgConnection, user_id: Uuid, updated: GlickoRating) -> AppResult<()> {
    diesel::update(user_ratings::table.find(user_id))
        .set((
            user_ratings::rating.eq(updated.rating),
            user_ratings::deviation.eq(updated.deviation),
            user_ratings::volatility.eq(updated.volatility),
            user_ratings::last_updated.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Canonical unordered pair: smaller uuid first. Matches are stored this way
/// so the unique index on (user1_id, user2_id) leaves exactly one match per
/// pair even when both reciprocal swipes land at the same time.
pub(crate) fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn create_match_once(conn: &mut PgConnection, a: Uuid, b: Uuid) -> AppResult<Match> {
    let (user1_id, user2_id) = canonical_pair(a, b);

    diesel::insert_into(matches::table)
        .values(&NewMatch { user1_id, user2_id })
        .on_conflict((matches::user1_id, matches::user2_id))
        .do_nothing()
        .execute(conn)?;

    // Read back whichever insert won the race.
    let record = matches::table
        .filter(matches::user1_id.eq(user1_id))
        .filter(matches::user2_id.eq(user2_id))
        .first::<Match>(conn)?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_sorts_and_is_symmetric() {
        let a = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let b = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();

        assert_eq!(canonical_pair(a, b), (a, b));
        assert_eq!(canonical_pair(b, a), (a, b));
    }

    #[test]
    fn direction_serde_round_trip() {
        let right: SwipeDirection = serde_json::from_str("\"right\"").unwrap();
        let left: SwipeDirection = serde_json::from_str("\"left\"").unwrap();

        assert_eq!(right, SwipeDirection::Right);
        assert_eq!(left, SwipeDirection::Left);
        assert_eq!(right.as_str(), "right");
        assert_eq!(left.as_str(), "left");
        assert!(serde_json::from_str::<SwipeDirection>("\"up\"").is_err());
    }
}
