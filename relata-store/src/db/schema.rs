/// SQL schema for the relata store.
/// People own things (delete restricted while things remain); users own posts
/// and likes (deletes cascade).
pub const SCHEMA: &str = r#"
-- People table
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER
);

-- Things table, each owned by one person
CREATE TABLE IF NOT EXISTS things (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    value REAL,
    owner INTEGER NOT NULL,
    FOREIGN KEY (owner) REFERENCES people(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_things_owner ON things(owner);

-- Users table. Email uniqueness is checked on create, not by an index.
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    profile_name TEXT NOT NULL,
    email TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email COLLATE NOCASE);

-- Posts table
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id);
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);

-- Likes: one per (user, post)
CREATE TABLE IF NOT EXISTS likes (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    post_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, post_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_likes_user_id ON likes(user_id);
CREATE INDEX IF NOT EXISTS idx_likes_post_id ON likes(post_id);
"#;

/// Sample people and things. Ids are fixed so the owner references line up.
pub const SAMPLE_DATA: &str = r#"
INSERT OR IGNORE INTO people (id, name, age) VALUES
    (1, 'Mike', 30),
    (2, 'Bob', 35),
    (3, 'Anna', 38),
    (4, 'John', 50),
    (5, 'Clara', 42);

INSERT OR IGNORE INTO things (id, owner, description, value) VALUES
    (1, 2, 'laptop', 800.50),
    (2, 2, 'Mouse', 50.50),
    (3, 2, 'Keyboard', 100.50),
    (4, 3, 'Book', 30),
    (5, 4, 'Bottle', 10.50),
    (6, 5, 'Speakers', 80.50);
"#;
