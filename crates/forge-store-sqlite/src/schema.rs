//! SQL schema for the FlavorForge SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    points        INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    level         INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
    badges        TEXT NOT NULL DEFAULT '[]',  -- JSON array, grant order
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipes (
    recipe_id   TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(user_id),
    title       TEXT NOT NULL,
    description TEXT,
    category    TEXT NOT NULL,
    servings    INTEGER NOT NULL DEFAULT 4 CHECK (servings > 0),
    ingredients TEXT NOT NULL DEFAULT '[]',    -- JSON array of Ingredient
    steps       TEXT NOT NULL DEFAULT '[]',    -- JSON array of strings
    -- Derived from `reviews`; rewritten only by the review transaction.
    rating      REAL NOT NULL DEFAULT 0,
    num_reviews INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id  TEXT PRIMARY KEY,
    recipe_id  TEXT NOT NULL REFERENCES recipes(recipe_id) ON DELETE CASCADE,
    user_id    TEXT NOT NULL,
    name       TEXT NOT NULL,
    rating     INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    comment    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (recipe_id, user_id)
);

CREATE TABLE IF NOT EXISTS meal_plans (
    plan_id    TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    week_start TEXT NOT NULL,                  -- Monday, YYYY-MM-DD
    days       TEXT NOT NULL,                  -- JSON array of 7 PlannedDay
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (user_id, week_start)
);

CREATE INDEX IF NOT EXISTS recipes_owner_idx    ON recipes(owner_id);
CREATE INDEX IF NOT EXISTS recipes_category_idx ON recipes(category);
CREATE INDEX IF NOT EXISTS reviews_recipe_idx   ON reviews(recipe_id);

PRAGMA user_version = 1;
";
