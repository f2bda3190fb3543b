use crate::registry::{ColumnDef, Entity, SchemaError, SchemaRegistry};
use crate::schema::{comment, follower, media, post, user};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use strum::{AsRefStr, Display, EnumString, VariantNames};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
    AsExpression,
    FromSqlRow,
)]
#[strum(serialize_all = "lowercase")]
#[diesel(sql_type = Text)]
pub enum MediaType {
    Image,
    Video,
}

impl ToSql<Text, Sqlite> for MediaType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_ref());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for MediaType {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let value = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        value
            .parse()
            .map_err(|_| format!("unrecognized media type: {value}").into())
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = user)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = user)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub email: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = post)]
#[diesel(belongs_to(User))]
pub struct Post {
    pub id: i32,
    pub user_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = post)]
pub struct NewPost {
    pub user_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = comment)]
#[diesel(belongs_to(Post))]
#[diesel(belongs_to(User, foreign_key = author_id))]
pub struct Comment {
    pub id: i32,
    pub comment_text: String,
    pub author_id: i32,
    pub post_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = comment)]
pub struct NewComment<'a> {
    pub comment_text: &'a str,
    pub author_id: i32,
    pub post_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = media)]
#[diesel(belongs_to(Post))]
pub struct Media {
    pub id: i32,
    pub media_type: MediaType,
    pub url: String,
    pub post_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = media)]
pub struct NewMedia<'a> {
    pub media_type: MediaType,
    pub url: &'a str,
    pub post_id: i32,
}

/// Directed edge: `user_from_id` follows `user_to_id`.
#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(table_name = follower)]
#[diesel(primary_key(user_from_id, user_to_id))]
pub struct Follower {
    pub user_from_id: i32,
    pub user_to_id: i32,
}

impl Entity for User {
    const TABLE: &'static str = "user";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::integer("id").primary_key(),
            ColumnDef::text("username").unique(),
            ColumnDef::text("firstname"),
            ColumnDef::text("lastname"),
            ColumnDef::text("email").unique(),
        ]
    }
}

impl Entity for Post {
    const TABLE: &'static str = "post";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::integer("id").primary_key(),
            ColumnDef::integer("user_id").references(User::TABLE, "id"),
        ]
    }
}

impl Entity for Comment {
    const TABLE: &'static str = "comment";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::integer("id").primary_key(),
            ColumnDef::text("comment_text").non_empty(),
            ColumnDef::integer("author_id").references(User::TABLE, "id"),
            ColumnDef::integer("post_id").references(Post::TABLE, "id"),
        ]
    }
}

impl Entity for Media {
    const TABLE: &'static str = "media";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::integer("id").primary_key(),
            ColumnDef::enumeration("type", "media_type", MediaType::VARIANTS),
            ColumnDef::text("url"),
            ColumnDef::integer("post_id").references(Post::TABLE, "id"),
        ]
    }
}

impl Entity for Follower {
    const TABLE: &'static str = "follower";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::integer("user_from_id")
                .primary_key()
                .references(User::TABLE, "id"),
            ColumnDef::integer("user_to_id")
                .primary_key()
                .references(User::TABLE, "id"),
        ]
    }
}

/// Builds the registry holding the five social tables.
pub fn declare_schema() -> Result<SchemaRegistry, SchemaError> {
    let mut registry = SchemaRegistry::new();
    registry.register::<User>()?;
    registry.register::<Post>()?;
    registry.register::<Comment>()?;
    registry.register::<Media>()?;
    registry.register::<Follower>()?;
    registry.validate()?;
    Ok(registry)
}
