use strum_macros::{AsRefStr, Display, EnumIter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Resource,
    StatusUpdates,
    Upvotes,
    User,
}

impl Table {
    /// Column sets that the store keeps unique, besides the `id` primary key.
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Upvotes => &[&["resource_id", "user_id"]],
            Self::User => &[&["email"]],
            Self::Resource | Self::StatusUpdates => &[],
        }
    }
}

/// DDL for the hosted database. Tables are created in dependency order.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "user" (
    id      uuid PRIMARY KEY REFERENCES auth.users(id) ON DELETE CASCADE,
    email   text NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS resource (
    id          uuid PRIMARY KEY,
    name        text NOT NULL,
    image_url   text NOT NULL DEFAULT '',
    created_by  uuid NOT NULL REFERENCES "user"(id)
);

CREATE TABLE IF NOT EXISTS status_updates (
    id               uuid PRIMARY KEY,
    resource_id      uuid NOT NULL REFERENCES resource(id) ON DELETE CASCADE,
    crowd_level      text NOT NULL DEFAULT '',
    chips_available  text NOT NULL DEFAULT '',
    queue_length     text NOT NULL DEFAULT '',
    status_message   text NOT NULL DEFAULT '',
    created_at       timestamptz NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS status_updates_resource_created_idx
    ON status_updates (resource_id, created_at DESC);

CREATE TABLE IF NOT EXISTS upvotes (
    id           uuid PRIMARY KEY,
    resource_id  uuid NOT NULL REFERENCES resource(id) ON DELETE CASCADE,
    user_id      uuid NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
    CONSTRAINT upvotes_resource_user_key UNIQUE (resource_id, user_id)
);
"#;
