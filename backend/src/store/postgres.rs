use super::{
    Constraint, NewUser, ParticipationRecord, QuestData, QuestFilter, QuestRecord, QuestRow, Store,
    StoreError, StoreResult, UserRecord,
};
use crate::config;
use crate::error::Entity;
use crate::schema::{quest_participants, quests, users};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{QuestId, UserId};
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};
use diesel::{
    Connection, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, Queryable,
    RunQueryDsl, Selectable, SelectableHelper,
};
use std::collections::HashMap;
use std::time::Duration;

type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

const USERS_EMAIL_KEY: &str = "users_email_key";
const MEMBERSHIP_KEY: &str = "quest_participants_user_quest_key";
const CAPACITY_CHECK: &str = "quest_participants_capacity";
const FROZEN_CAPACITY_CHECK: &str = "quests_capacity_frozen";

#[derive(Queryable, Selectable)]
#[diesel(table_name = users, check_for_backend(diesel::pg::Pg))]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId(row.id),
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = quests, check_for_backend(diesel::pg::Pg))]
struct QuestDbRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    category: String,
    max_participants: i32,
    deadline: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    image: Option<Vec<u8>>,
    url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QuestDbRow> for QuestRecord {
    fn from(row: QuestDbRow) -> Self {
        Self {
            id: QuestId(row.id),
            owner: UserId(row.user_id),
            data: QuestData {
                title: row.title,
                description: row.description,
                category: row.category,
                // the column has CHECK (max_participants >= 1)
                max_participants: row.max_participants.max(1) as u32,
                deadline: row.deadline,
                start_time: row.start_time,
                end_time: row.end_time,
                image: row.image,
                url: row.url,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = quest_participants, check_for_backend(diesel::pg::Pg))]
struct ParticipationRow {
    id: i64,
    joined_at: DateTime<Utc>,
    user_id: i64,
    quest_id: i64,
}

impl From<ParticipationRow> for ParticipationRecord {
    fn from(row: ParticipationRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId(row.user_id),
            quest_id: QuestId(row.quest_id),
            joined_at: row.joined_at,
        }
    }
}

fn classify(kind: &DatabaseErrorKind, info: &dyn DatabaseErrorInformation) -> StoreError {
    let constraint = info.constraint_name().unwrap_or_default();
    match kind {
        DatabaseErrorKind::UniqueViolation if constraint == USERS_EMAIL_KEY => {
            StoreError::Conflict(Constraint::UserEmail)
        }
        DatabaseErrorKind::UniqueViolation if constraint == MEMBERSHIP_KEY => {
            StoreError::Conflict(Constraint::Membership)
        }
        DatabaseErrorKind::CheckViolation if constraint == CAPACITY_CHECK => {
            StoreError::Conflict(Constraint::Capacity)
        }
        DatabaseErrorKind::CheckViolation if constraint == FROZEN_CAPACITY_CHECK => {
            StoreError::Conflict(Constraint::FrozenCapacity)
        }
        DatabaseErrorKind::ForeignKeyViolation if constraint.ends_with("quest_id_fkey") => {
            StoreError::MissingReference(Entity::Quest)
        }
        DatabaseErrorKind::ForeignKeyViolation => StoreError::MissingReference(Entity::User),
        _ if info.message().contains("statement timeout") => StoreError::Timeout,
        _ => StoreError::Backend(info.message().to_owned()),
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::DatabaseError(kind, info) => classify(&kind, info.as_ref()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Makes the server abort any statement that runs longer than the store timeout,
/// rolling back its transaction.
#[derive(Debug)]
struct StatementTimeout(Duration);

impl CustomizeConnection<PgConnection, r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        diesel::sql_query(format!("SET statement_timeout = {}", self.0.as_millis()))
            .execute(conn)
            .map(|_| ())
            .map_err(r2d2::Error::QueryError)
    }
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(database: &config::Database) -> StoreResult<Self> {
        let timeout = Duration::from_millis(database.timeout_ms);
        let manager = ConnectionManager::<PgConnection>::new(database.url());
        let pool = r2d2::Pool::builder()
            .max_size(database.pool_size)
            .connection_timeout(timeout)
            .connection_customizer(Box::new(StatementTimeout(timeout)))
            .build(manager)
            .map_err(|error| StoreError::Backend(error.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Runs blocking diesel work off the async runtime. Waiting for a pooled
    /// connection is bounded by the pool's connection timeout.
    async fn run<T, F>(&self, job: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|error| {
                tracing::warn!(%error, "no database connection available");
                StoreError::Timeout
            })?;
            job(&mut conn)
        })
        .await
        .map_err(|error| StoreError::Backend(error.to_string()))?
    }
}

fn count_participants(conn: &mut PgConnection, quest_id: i64) -> StoreResult<u32> {
    let count = quest_participants::table
        .filter(quest_participants::quest_id.eq(quest_id))
        .count()
        .get_result::<i64>(conn)?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

fn capacity_column(data: &QuestData) -> i32 {
    i32::try_from(data.max_participants).unwrap_or(i32::MAX)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser<'_>) -> StoreResult<UserRecord> {
        let email = user.email.to_owned();
        let username = user.username.to_owned();
        let password_hash = user.password_hash.to_owned();
        self.run(move |conn| {
            let row = diesel::insert_into(users::table)
                .values((
                    users::email.eq(email),
                    users::username.eq(username),
                    users::password_hash.eq(password_hash),
                ))
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
        .await
    }

    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<UserRecord>> {
        self.run(move |conn| {
            let row = users::table
                .find(user_id.0)
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(UserRecord::from))
        })
        .await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let email = email.to_owned();
        self.run(move |conn| {
            let row = users::table
                .filter(users::email.eq(email))
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(UserRecord::from))
        })
        .await
    }

    async fn update_username(&self, user_id: UserId, username: &str) -> StoreResult<bool> {
        let username = username.to_owned();
        self.run(move |conn| {
            let updated_rows = diesel::update(users::table.find(user_id.0))
                .set((
                    users::username.eq(username),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            Ok(updated_rows == 1)
        })
        .await
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let owned = quests::table
                    .filter(quests::user_id.eq(user_id.0))
                    .select(quests::id);
                diesel::delete(
                    quest_participants::table.filter(quest_participants::quest_id.eq_any(owned)),
                )
                .execute(conn)?;
                diesel::delete(
                    quest_participants::table.filter(quest_participants::user_id.eq(user_id.0)),
                )
                .execute(conn)?;
                diesel::delete(quests::table.filter(quests::user_id.eq(user_id.0)))
                    .execute(conn)?;
                let deleted = diesel::delete(users::table.find(user_id.0)).execute(conn)?;
                Ok(deleted == 1)
            })
        })
        .await
    }

    async fn insert_quest(
        &self,
        owner: UserId,
        data: &QuestData,
        now: DateTime<Utc>,
    ) -> StoreResult<QuestRecord> {
        let data = data.clone();
        self.run(move |conn| {
            let capacity = capacity_column(&data);
            let row = diesel::insert_into(quests::table)
                .values((
                    quests::user_id.eq(owner.0),
                    quests::title.eq(data.title),
                    quests::description.eq(data.description),
                    quests::category.eq(data.category),
                    quests::max_participants.eq(capacity),
                    quests::deadline.eq(data.deadline),
                    quests::start_time.eq(data.start_time),
                    quests::end_time.eq(data.end_time),
                    quests::image.eq(data.image),
                    quests::url.eq(data.url),
                    quests::created_at.eq(now),
                    quests::updated_at.eq(now),
                ))
                .returning(QuestDbRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
        .await
    }

    async fn quest_by_id(&self, quest_id: QuestId) -> StoreResult<Option<QuestRow>> {
        self.run(move |conn| {
            let Some(row) = quests::table
                .find(quest_id.0)
                .select(QuestDbRow::as_select())
                .first(conn)
                .optional()?
            else {
                return Ok(None);
            };
            let participants = count_participants(conn, quest_id.0)?;
            Ok(Some(QuestRow {
                quest: row.into(),
                participants,
            }))
        })
        .await
    }

    async fn update_quest(
        &self,
        quest_id: QuestId,
        owner: UserId,
        data: &QuestData,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<QuestRecord>> {
        let data = data.clone();
        self.run(move |conn| {
            let capacity = capacity_column(&data);
            let row = diesel::update(
                quests::table
                    .filter(quests::id.eq(quest_id.0))
                    .filter(quests::user_id.eq(owner.0)),
            )
            .set((
                quests::title.eq(data.title),
                quests::description.eq(data.description),
                quests::category.eq(data.category),
                quests::max_participants.eq(capacity),
                quests::deadline.eq(data.deadline),
                quests::start_time.eq(data.start_time),
                quests::end_time.eq(data.end_time),
                quests::image.eq(data.image),
                quests::url.eq(data.url),
                quests::updated_at.eq(now),
            ))
            .returning(QuestDbRow::as_returning())
            .get_result(conn)
            .optional()?;
            Ok(row.map(QuestRecord::from))
        })
        .await
    }

    async fn delete_quest(&self, quest_id: QuestId, owner: UserId) -> StoreResult<bool> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let owned = quests::table
                    .filter(quests::id.eq(quest_id.0))
                    .filter(quests::user_id.eq(owner.0))
                    .select(quests::id)
                    .for_update()
                    .first::<i64>(conn)
                    .optional()?;
                if owned.is_none() {
                    return Ok(false);
                }
                diesel::delete(
                    quest_participants::table.filter(quest_participants::quest_id.eq(quest_id.0)),
                )
                .execute(conn)?;
                diesel::delete(quests::table.find(quest_id.0)).execute(conn)?;
                Ok(true)
            })
        })
        .await
    }

    async fn list_quests(&self, filter: QuestFilter) -> StoreResult<Vec<QuestRow>> {
        self.run(move |conn| {
            let mut query = quests::table
                .select(QuestDbRow::as_select())
                .order((quests::created_at.desc(), quests::id.desc()))
                .into_boxed();
            match filter {
                QuestFilter::All => {}
                QuestFilter::OwnedBy(owner) => {
                    query = query.filter(quests::user_id.eq(owner.0));
                }
                QuestFilter::JoinedBy(member) => {
                    query = query.filter(
                        quests::id.eq_any(
                            quest_participants::table
                                .filter(quest_participants::user_id.eq(member.0))
                                .select(quest_participants::quest_id),
                        ),
                    );
                }
            }
            let rows: Vec<QuestDbRow> = query.load(conn)?;

            let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
            let counts: HashMap<i64, i64> = quest_participants::table
                .filter(quest_participants::quest_id.eq_any(&ids))
                .group_by(quest_participants::quest_id)
                .select((quest_participants::quest_id, diesel::dsl::count_star()))
                .load::<(i64, i64)>(conn)?
                .into_iter()
                .collect();

            Ok(rows
                .into_iter()
                .map(|row| {
                    let participants = counts.get(&row.id).copied().unwrap_or(0);
                    QuestRow {
                        quest: row.into(),
                        participants: u32::try_from(participants).unwrap_or(u32::MAX),
                    }
                })
                .collect())
        })
        .await
    }

    async fn participant_count(&self, quest_id: QuestId) -> StoreResult<u32> {
        self.run(move |conn| count_participants(conn, quest_id.0))
            .await
    }

    async fn participation(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> StoreResult<Option<ParticipationRecord>> {
        self.run(move |conn| {
            let row = quest_participants::table
                .filter(quest_participants::user_id.eq(user_id.0))
                .filter(quest_participants::quest_id.eq(quest_id.0))
                .select(ParticipationRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(ParticipationRecord::from))
        })
        .await
    }

    async fn insert_participation(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        now: DateTime<Utc>,
    ) -> StoreResult<ParticipationRecord> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                // concurrent joins of the same quest queue up on this row lock
                let capacity = quests::table
                    .find(quest_id.0)
                    .select(quests::max_participants)
                    .for_update()
                    .first::<i32>(conn)
                    .optional()?
                    .ok_or(StoreError::MissingReference(Entity::Quest))?;

                let joined = quest_participants::table
                    .filter(quest_participants::user_id.eq(user_id.0))
                    .filter(quest_participants::quest_id.eq(quest_id.0))
                    .select(quest_participants::id)
                    .first::<i64>(conn)
                    .optional()?;
                if joined.is_some() {
                    return Err(StoreError::Conflict(Constraint::Membership));
                }

                if i64::from(count_participants(conn, quest_id.0)?) >= i64::from(capacity) {
                    return Err(StoreError::Conflict(Constraint::Capacity));
                }

                // unique key and capacity trigger still guard this insert
                let row = diesel::insert_into(quest_participants::table)
                    .values((
                        quest_participants::user_id.eq(user_id.0),
                        quest_participants::quest_id.eq(quest_id.0),
                        quest_participants::joined_at.eq(now),
                    ))
                    .returning(ParticipationRow::as_returning())
                    .get_result(conn)?;
                Ok(row.into())
            })
        })
        .await
    }

    async fn delete_participation(&self, user_id: UserId, quest_id: QuestId) -> StoreResult<bool> {
        self.run(move |conn| {
            let deleted = diesel::delete(
                quest_participants::table
                    .filter(quest_participants::user_id.eq(user_id.0))
                    .filter(quest_participants::quest_id.eq(quest_id.0)),
            )
            .execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Info {
        message: &'static str,
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.message
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn classified(kind: DatabaseErrorKind, constraint: Option<&'static str>) -> StoreError {
        StoreError::from(diesel::result::Error::DatabaseError(
            kind,
            Box::new(Info {
                message: "boom",
                constraint,
            }),
        ))
    }

    #[test]
    fn constraint_names_map_to_domain_conflicts() {
        assert_eq!(
            classified(DatabaseErrorKind::UniqueViolation, Some(USERS_EMAIL_KEY)),
            StoreError::Conflict(Constraint::UserEmail)
        );
        assert_eq!(
            classified(DatabaseErrorKind::UniqueViolation, Some(MEMBERSHIP_KEY)),
            StoreError::Conflict(Constraint::Membership)
        );
        assert_eq!(
            classified(DatabaseErrorKind::CheckViolation, Some(CAPACITY_CHECK)),
            StoreError::Conflict(Constraint::Capacity)
        );
        assert_eq!(
            classified(DatabaseErrorKind::CheckViolation, Some(FROZEN_CAPACITY_CHECK)),
            StoreError::Conflict(Constraint::FrozenCapacity)
        );
    }

    #[test]
    fn foreign_keys_name_the_missing_entity() {
        assert_eq!(
            classified(
                DatabaseErrorKind::ForeignKeyViolation,
                Some("quest_participants_quest_id_fkey")
            ),
            StoreError::MissingReference(Entity::Quest)
        );
        assert_eq!(
            classified(
                DatabaseErrorKind::ForeignKeyViolation,
                Some("quests_user_id_fkey")
            ),
            StoreError::MissingReference(Entity::User)
        );
    }

    #[test]
    fn statement_timeout_is_a_timeout() {
        let error = StoreError::from(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new(Info {
                message: "canceling statement due to statement timeout",
                constraint: None,
            }),
        ));
        assert_eq!(error, StoreError::Timeout);
    }

    #[test]
    fn unknown_errors_keep_their_message() {
        assert_eq!(
            classified(DatabaseErrorKind::UniqueViolation, Some("something_else")),
            StoreError::Backend(String::from("boom"))
        );
        assert_eq!(
            StoreError::from(diesel::result::Error::NotFound),
            StoreError::Backend(diesel::result::Error::NotFound.to_string())
        );
    }

    #[tokio::test]
    async fn unreachable_database_is_a_timeout() {
        let manager = ConnectionManager::<PgConnection>::new("postgres://u:p@127.0.0.1:1/x");
        let pool = r2d2::Pool::builder()
            .connection_timeout(Duration::from_millis(200))
            .build_unchecked(manager);
        let store = PgStore::new(pool);

        assert_eq!(store.user_by_id(UserId(1)).await, Err(StoreError::Timeout));
        assert_eq!(
            store
                .insert_participation(UserId(1), QuestId(1), Utc::now())
                .await,
            Err(StoreError::Timeout)
        );
    }
}
