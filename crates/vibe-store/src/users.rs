//! User storage: fetch or create by email.

use crate::error::Result;
use crate::store::{parse_id, parse_timestamp, timestamp, SqliteStore};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use vibe_core::site::{avatar_url, display_name_from_email, STARTER_CREDITS};
use vibe_core::{User, UserId};

impl SqliteStore {
    /// Find a user by email or create it with starter credits and an
    /// empty profile.
    pub fn fetch_or_create_user(&self, email: &str) -> Result<User> {
        let email = email.trim();
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                "SELECT id, email, name, avatar_url, credits, created_at FROM users WHERE email = ?1",
                [email],
                raw_user,
            )
            .optional()?;
        if let Some(raw) = existing {
            return user_from_raw(raw);
        }

        let name = display_name_from_email(email);
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            avatar_url: avatar_url(&name),
            name,
            credits: STARTER_CREDITS,
            created_at: Utc::now(),
        };
        tx.execute(
            "INSERT INTO users (id, email, name, avatar_url, credits, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                user.id.to_string(),
                &user.email,
                &user.name,
                &user.avatar_url,
                user.credits,
                timestamp(user.created_at),
            ],
        )?;
        tx.execute(
            "INSERT INTO user_profiles (user_id, updated_at) VALUES (?1, ?2)",
            rusqlite::params![user.id.to_string(), timestamp(user.created_at)],
        )?;
        tx.commit()?;

        tracing::info!("Created user {} ({})", user.id.short(), user.email);
        Ok(user)
    }
}

type RawUser = (String, String, String, String, i64, String);

fn raw_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn user_from_raw((id, email, name, avatar_url, credits, created_at): RawUser) -> Result<User> {
    Ok(User {
        id: parse_id("user id", &id)?,
        email,
        name,
        avatar_url,
        credits,
        created_at: parse_timestamp("user created_at", &created_at)?,
    })
}
