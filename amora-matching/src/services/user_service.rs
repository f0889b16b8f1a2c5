use diesel::prelude::*;

use amora_shared::clients::db::DbPool;
use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::event::payloads::UserRegistered;

use crate::matching::glicko;
use crate::models::{NewUser, NewUserRating, User};
use crate::schema::{user_ratings, users};

/// Creates the user row and its default rating for a newly registered
/// account. Called from the RabbitMQ subscriber when a `user.registered`
/// event arrives. The rating row lives and dies with the user.
pub fn create_user_with_rating(pool: &DbPool, data: &UserRegistered) -> AppResult<User> {
    let mut conn = pool.get().map_err(|e| AppError::internal(e.to_string()))?;

    conn.transaction::<_, AppError, _>(|conn| {
        let user: User = diesel::insert_into(users::table)
            .values(&NewUser {
                id: data.user_id,
                email: data.email.clone(),
                name: data.name.clone(),
                birthdate: data.birthdate,
                gender: data.gender.clone(),
            })
            .get_result(conn)?;

        diesel::insert_into(user_ratings::table)
            .values(&NewUserRating {
                user_id: user.id,
                rating: glicko::DEFAULT_RATING,
                deviation: glicko::DEFAULT_DEVIATION,
                volatility: glicko::DEFAULT_VOLATILITY,
            })
            .execute(conn)?;

        tracing::info!(user_id = %user.id, "user and default rating created");

        Ok(user)
    })
}
