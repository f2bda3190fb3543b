use crate::models::{
    Comment, Follower, Media, MediaType, NewComment, NewMedia, NewPost, NewUser, Post, User,
};
use crate::registry::SchemaRegistry;
use crate::schema::{comment, follower, media, post, user};
use anyhow::{anyhow, Context, Result};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Integer, Text};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use strum::Display;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA busy_timeout = 2000;")?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")?;
    conn.batch_execute("PRAGMA synchronous = NORMAL;")?;
    conn.batch_execute("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<usize> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("failed to run migrations: {e}"))?;
    for version in &applied {
        tracing::debug!(%version, "applied migration");
    }
    Ok(applied.len())
}

/// Opens `database_url`, turns on foreign keys and brings the schema up to date.
pub fn open(database_url: &str) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)
        .with_context(|| format!("failed to open database {database_url}"))?;
    configure_connection(&mut conn).context("failed to configure SQLite connection")?;
    let applied = run_migrations(&mut conn)?;
    tracing::info!(database_url, applied, "database ready");
    Ok(conn)
}

pub fn create_user(conn: &mut SqliteConnection, new_user: &NewUser) -> QueryResult<User> {
    diesel::insert_into(user::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
}

pub fn create_post(conn: &mut SqliteConnection, author_id: i32) -> QueryResult<Post> {
    diesel::insert_into(post::table)
        .values(&NewPost { user_id: author_id })
        .returning(Post::as_returning())
        .get_result(conn)
}

pub fn create_comment(
    conn: &mut SqliteConnection,
    new_comment: &NewComment,
) -> QueryResult<Comment> {
    diesel::insert_into(comment::table)
        .values(new_comment)
        .returning(Comment::as_returning())
        .get_result(conn)
}

pub fn create_media(conn: &mut SqliteConnection, new_media: &NewMedia) -> QueryResult<Media> {
    diesel::insert_into(media::table)
        .values(new_media)
        .returning(Media::as_returning())
        .get_result(conn)
}

pub fn follow(conn: &mut SqliteConnection, from_id: i32, to_id: i32) -> QueryResult<Follower> {
    diesel::insert_into(follower::table)
        .values(&Follower {
            user_from_id: from_id,
            user_to_id: to_id,
        })
        .returning(Follower::as_returning())
        .get_result(conn)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Constraint {
    #[strum(serialize = "unique")]
    Unique,
    #[strum(serialize = "foreign-key")]
    ForeignKey,
    #[strum(serialize = "check")]
    Check,
    #[strum(serialize = "not-null")]
    NotNull,
}

/// Which storage constraint rejected a write, if any.
pub fn violated_constraint(err: &DieselError) -> Option<Constraint> {
    let DieselError::DatabaseError(kind, info) = err else {
        return None;
    };

    match kind {
        DatabaseErrorKind::UniqueViolation => Some(Constraint::Unique),
        DatabaseErrorKind::ForeignKeyViolation => Some(Constraint::ForeignKey),
        DatabaseErrorKind::CheckViolation => Some(Constraint::Check),
        DatabaseErrorKind::NotNullViolation => Some(Constraint::NotNull),
        _ => {
            let message = info.message();
            if message.starts_with("UNIQUE constraint failed") {
                Some(Constraint::Unique)
            } else if message.starts_with("FOREIGN KEY constraint failed") {
                Some(Constraint::ForeignKey)
            } else if message.starts_with("CHECK constraint failed") {
                Some(Constraint::Check)
            } else if message.starts_with("NOT NULL constraint failed") {
                Some(Constraint::NotNull)
            } else {
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleRows {
    pub user: User,
    pub post: Post,
    pub comment: Comment,
    pub media: Media,
}

const SAMPLE_USER: NewUser<'static> = NewUser {
    username: "ada",
    firstname: "Ada",
    lastname: "Lovelace",
    email: "ada@example.com",
};

/// Ensures one linked user, post, comment and media row exist.
///
/// Rows left by an earlier run are reused, so a file-backed database can be
/// seeded on every start.
pub fn seed_sample(conn: &mut SqliteConnection) -> QueryResult<SampleRows> {
    conn.transaction(|conn| {
        let existing_user = user::table
            .filter(user::username.eq(SAMPLE_USER.username))
            .select(User::as_select())
            .first(conn)
            .optional()?;
        let user = match existing_user {
            Some(user) => user,
            None => create_user(conn, &SAMPLE_USER)?,
        };

        let existing_post = Post::belonging_to(&user)
            .select(Post::as_select())
            .order(post::id)
            .first(conn)
            .optional()?;
        let post = match existing_post {
            Some(post) => post,
            None => create_post(conn, user.id)?,
        };

        let existing_comment = Comment::belonging_to(&post)
            .filter(comment::author_id.eq(user.id))
            .select(Comment::as_select())
            .order(comment::id)
            .first(conn)
            .optional()?;
        let comment = match existing_comment {
            Some(comment) => comment,
            None => create_comment(
                conn,
                &NewComment {
                    comment_text: "First!",
                    author_id: user.id,
                    post_id: post.id,
                },
            )?,
        };

        let existing_media = Media::belonging_to(&post)
            .select(Media::as_select())
            .order(media::id)
            .first(conn)
            .optional()?;
        let media = match existing_media {
            Some(media) => media,
            None => create_media(
                conn,
                &NewMedia {
                    media_type: MediaType::Image,
                    url: "https://example.com/engine.png",
                    post_id: post.id,
                },
            )?,
        };

        Ok(SampleRows {
            user,
            post,
            comment,
            media,
        })
    })
}

#[derive(QueryableByName, Debug)]
struct TableColumn {
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Integer)]
    notnull: i32,
    #[diesel(sql_type = Integer)]
    pk: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDrift {
    MissingTable(String),
    MissingColumn { table: String, column: String },
    ExtraColumn { table: String, column: String },
    Nullability { table: String, column: String, declared_nullable: bool },
    PrimaryKey { table: String, column: String, declared_primary: bool },
}

/// Compares the declared tables against what the database actually has.
pub fn schema_drift(
    conn: &mut SqliteConnection,
    schema: &SchemaRegistry,
) -> QueryResult<Vec<SchemaDrift>> {
    let mut drift = Vec::new();

    for table in schema.tables() {
        let rows: Vec<TableColumn> =
            diesel::sql_query("SELECT name, \"notnull\", pk FROM pragma_table_info(?)")
                .bind::<Text, _>(table.name)
                .load(conn)?;

        if rows.is_empty() {
            drift.push(SchemaDrift::MissingTable(table.name.to_string()));
            continue;
        }

        let live: HashMap<&str, &TableColumn> =
            rows.iter().map(|c| (c.name.as_str(), c)).collect();

        for column in &table.columns {
            let Some(found) = live.get(column.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table.name.to_string(),
                    column: column.name.to_string(),
                });
                continue;
            };
            if column.nullable == (found.notnull != 0) {
                drift.push(SchemaDrift::Nullability {
                    table: table.name.to_string(),
                    column: column.name.to_string(),
                    declared_nullable: column.nullable,
                });
            }
            if column.primary_key != (found.pk > 0) {
                drift.push(SchemaDrift::PrimaryKey {
                    table: table.name.to_string(),
                    column: column.name.to_string(),
                    declared_primary: column.primary_key,
                });
            }
        }

        for row in rows.iter().filter(|r| table.column(&r.name).is_none()) {
            drift.push(SchemaDrift::ExtraColumn {
                table: table.name.to_string(),
                column: row.name.clone(),
            });
        }
    }

    Ok(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::declare_schema;
    use crate::registry::{ColumnDef, TableDef};

    fn test_conn() -> SqliteConnection {
        open(":memory:").expect("in-memory database")
    }

    fn new_user<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            firstname: "Grace",
            lastname: "Hopper",
            email,
        }
    }

    fn expect_violation<T: std::fmt::Debug>(result: QueryResult<T>) -> Constraint {
        let err = result.expect_err("write should be rejected");
        violated_constraint(&err).unwrap_or_else(|| panic!("not a constraint violation: {err}"))
    }

    #[test]
    fn test_all_entities_insert_with_required_fields() {
        let mut conn = test_conn();
        let sample = seed_sample(&mut conn).unwrap();

        assert_eq!(sample.post.user_id, sample.user.id);
        assert_eq!(sample.comment.author_id, sample.user.id);
        assert_eq!(sample.comment.post_id, sample.post.id);
        assert_eq!(sample.media.post_id, sample.post.id);
        assert_eq!(sample.media.media_type, MediaType::Image);

        let other = create_user(&mut conn, &new_user("grace", "grace@example.com")).unwrap();
        let edge = follow(&mut conn, other.id, sample.user.id).unwrap();
        assert_eq!(edge.user_from_id, other.id);
        assert_ne!(other.id, sample.user.id);
    }

    #[test]
    fn test_missing_required_field_fails_on_write() {
        let mut conn = test_conn();
        let result = diesel::insert_into(user::table)
            .values((
                user::username.eq("grace"),
                user::firstname.eq("Grace"),
                user::lastname.eq("Hopper"),
            ))
            .execute(&mut conn);
        assert_eq!(expect_violation(result), Constraint::NotNull);
    }

    #[test]
    fn test_missing_required_field_fails_on_write_for_every_table() {
        let mut conn = test_conn();
        let sample = seed_sample(&mut conn).unwrap();

        let post_without_author = diesel::insert_into(post::table)
            .default_values()
            .execute(&mut conn);
        assert_eq!(expect_violation(post_without_author), Constraint::NotNull);

        let comment_without_text = diesel::insert_into(comment::table)
            .values((
                comment::author_id.eq(sample.user.id),
                comment::post_id.eq(sample.post.id),
            ))
            .execute(&mut conn);
        assert_eq!(expect_violation(comment_without_text), Constraint::NotNull);

        let media_without_url = diesel::insert_into(media::table)
            .values((
                media::media_type.eq(MediaType::Video),
                media::post_id.eq(sample.post.id),
            ))
            .execute(&mut conn);
        assert_eq!(expect_violation(media_without_url), Constraint::NotNull);

        let follower_without_target = diesel::insert_into(follower::table)
            .values(follower::user_from_id.eq(sample.user.id))
            .execute(&mut conn);
        assert_eq!(
            expect_violation(follower_without_target),
            Constraint::NotNull
        );
    }

    #[test]
    fn test_seed_sample_reuses_existing_rows() {
        let mut conn = test_conn();
        let first = seed_sample(&mut conn).unwrap();
        let second = seed_sample(&mut conn).unwrap();

        assert_eq!(first.user, second.user);
        assert_eq!(first.post, second.post);
        assert_eq!(first.comment, second.comment);
        assert_eq!(first.media, second.media);

        let users: i64 = user::table.count().get_result(&mut conn).unwrap();
        let posts: i64 = post::table.count().get_result(&mut conn).unwrap();
        let comments: i64 = comment::table.count().get_result(&mut conn).unwrap();
        let media_rows: i64 = media::table.count().get_result(&mut conn).unwrap();
        assert_eq!((users, posts, comments, media_rows), (1, 1, 1, 1));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut conn = test_conn();
        create_user(&mut conn, &new_user("grace", "grace@example.com")).unwrap();
        let result = create_user(&mut conn, &new_user("grace", "other@example.com"));
        assert_eq!(expect_violation(result), Constraint::Unique);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let mut conn = test_conn();
        create_user(&mut conn, &new_user("grace", "grace@example.com")).unwrap();
        let result = create_user(&mut conn, &new_user("hopper", "grace@example.com"));
        assert_eq!(expect_violation(result), Constraint::Unique);
    }

    #[test]
    fn test_media_type_outside_enum_rejected() {
        let mut conn = test_conn();
        let sample = seed_sample(&mut conn).unwrap();
        let result = diesel::sql_query("INSERT INTO media (type, url, post_id) VALUES (?, ?, ?)")
            .bind::<Text, _>("audio")
            .bind::<Text, _>("https://example.com/theme.ogg")
            .bind::<Integer, _>(sample.post.id)
            .execute(&mut conn);
        assert_eq!(expect_violation(result), Constraint::Check);

        let video = create_media(
            &mut conn,
            &NewMedia {
                media_type: MediaType::Video,
                url: "https://example.com/trailer.mp4",
                post_id: sample.post.id,
            },
        )
        .unwrap();
        assert_eq!(video.media_type, MediaType::Video);
    }

    #[test]
    fn test_empty_comment_rejected() {
        let mut conn = test_conn();
        let sample = seed_sample(&mut conn).unwrap();
        let result = create_comment(
            &mut conn,
            &NewComment {
                comment_text: "",
                author_id: sample.user.id,
                post_id: sample.post.id,
            },
        );
        assert_eq!(expect_violation(result), Constraint::Check);
    }

    #[test]
    fn test_comment_foreign_keys_enforced() {
        let mut conn = test_conn();
        let sample = seed_sample(&mut conn).unwrap();

        let missing_post = create_comment(
            &mut conn,
            &NewComment {
                comment_text: "hello",
                author_id: sample.user.id,
                post_id: 999,
            },
        );
        assert_eq!(expect_violation(missing_post), Constraint::ForeignKey);

        let missing_author = create_comment(
            &mut conn,
            &NewComment {
                comment_text: "hello",
                author_id: 999,
                post_id: sample.post.id,
            },
        );
        assert_eq!(expect_violation(missing_author), Constraint::ForeignKey);
    }

    #[test]
    fn test_post_requires_existing_user() {
        let mut conn = test_conn();
        assert_eq!(
            expect_violation(create_post(&mut conn, 42)),
            Constraint::ForeignKey
        );
    }

    #[test]
    fn test_follower_edges_are_directional() {
        let mut conn = test_conn();
        let a = create_user(&mut conn, &new_user("a", "a@example.com")).unwrap();
        let b = create_user(&mut conn, &new_user("b", "b@example.com")).unwrap();

        follow(&mut conn, a.id, b.id).unwrap();
        follow(&mut conn, b.id, a.id).unwrap();

        let edges: i64 = follower::table.count().get_result(&mut conn).unwrap();
        assert_eq!(edges, 2);

        assert_eq!(
            expect_violation(follow(&mut conn, a.id, b.id)),
            Constraint::Unique
        );
    }

    #[test]
    fn test_self_follow_is_allowed() {
        let mut conn = test_conn();
        let a = create_user(&mut conn, &new_user("a", "a@example.com")).unwrap();
        let edge = follow(&mut conn, a.id, a.id).unwrap();
        assert_eq!(edge.user_from_id, edge.user_to_id);
    }

    #[test]
    fn test_follow_requires_existing_users() {
        let mut conn = test_conn();
        let a = create_user(&mut conn, &new_user("a", "a@example.com")).unwrap();
        assert_eq!(
            expect_violation(follow(&mut conn, a.id, 77)),
            Constraint::ForeignKey
        );
    }

    #[test]
    fn test_associations_load_children() {
        let mut conn = test_conn();
        let sample = seed_sample(&mut conn).unwrap();

        let posts = Post::belonging_to(&sample.user)
            .select(Post::as_select())
            .load(&mut conn)
            .unwrap();
        assert_eq!(posts, vec![sample.post.clone()]);

        let media = Media::belonging_to(&sample.post)
            .select(Media::as_select())
            .load(&mut conn)
            .unwrap();
        assert_eq!(media, vec![sample.media.clone()]);
    }

    #[test]
    fn test_violated_constraint_ignores_other_errors() {
        assert_eq!(violated_constraint(&DieselError::NotFound), None);
    }

    #[test]
    fn test_declared_schema_matches_database() {
        let mut conn = test_conn();
        let schema = declare_schema().unwrap();
        assert_eq!(schema_drift(&mut conn, &schema).unwrap(), vec![]);
    }

    #[test]
    fn test_schema_drift_detects_differences() {
        let mut conn = test_conn();
        let mut schema = SchemaRegistry::new();
        schema
            .register_table(TableDef::new(
                "user",
                vec![
                    ColumnDef::integer("id").primary_key(),
                    ColumnDef::text("username").nullable(),
                    ColumnDef::text("nickname"),
                ],
            ))
            .unwrap();
        schema
            .register_table(TableDef::new(
                "reaction",
                vec![ColumnDef::integer("id").primary_key()],
            ))
            .unwrap();

        let drift = schema_drift(&mut conn, &schema).unwrap();
        assert!(drift.contains(&SchemaDrift::Nullability {
            table: "user".into(),
            column: "username".into(),
            declared_nullable: true,
        }));
        assert!(drift.contains(&SchemaDrift::MissingColumn {
            table: "user".into(),
            column: "nickname".into(),
        }));
        assert!(drift.contains(&SchemaDrift::ExtraColumn {
            table: "user".into(),
            column: "email".into(),
        }));
        assert!(drift.contains(&SchemaDrift::MissingTable("reaction".into())));
    }
}
