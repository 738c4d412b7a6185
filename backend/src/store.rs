use sqlx::error::ErrorKind;
use sqlx::{Any, AnyPool};
use tracing::{debug, instrument};
use shared::models::*;
use crate::db::{Database, Dialect};

const COLUMNS: &str = "name, tiny, small, medium, large, huge";

// Not-null violation codes, for drivers that do not classify them.
const PG_NOT_NULL_VIOLATION: &str = "23502";
const SQLITE_CONSTRAINT_NOTNULL: &str = "1299";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_missing_required_field(&self) -> bool {
        matches!(self, StoreError::MissingRequiredField(_))
    }

    fn missing_name() -> Self {
        StoreError::MissingRequiredField("name".into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let not_null = matches!(db.kind(), ErrorKind::NotNullViolation)
                || matches!(
                    db.code().as_deref(),
                    Some(PG_NOT_NULL_VIOLATION | SQLITE_CONSTRAINT_NOTNULL)
                );
            if not_null {
                return StoreError::MissingRequiredField(db.message().to_string());
            }
        }
        StoreError::Database(e.to_string())
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    size: String,
    value: String,
    voters: String,
}

impl TryFrom<GroupRow> for ValueGroup {
    type Error = StoreError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let size: Size = row.size.parse().map_err(StoreError::Database)?;
        let mut voters: Vec<String> = serde_json::from_str(&row.voters)
            .map_err(|e| StoreError::Database(format!("malformed voter list: {e}")))?;
        voters.sort();
        Ok(ValueGroup { size, value: row.value, voters })
    }
}

/// Reads and writes the votes of one board.
#[derive(Debug, Clone)]
pub struct VoteStore {
    pool: AnyPool,
    dialect: Dialect,
    board: Board,
}

impl VoteStore {
    pub fn new(db: &Database, board: Board) -> Self {
        Self {
            pool: db.pool().clone(),
            dialect: db.dialect(),
            board,
        }
    }

    fn table(&self) -> &'static str {
        self.board.table_name()
    }

    #[instrument(skip(self), fields(board = self.board.as_str()))]
    pub async fn get(&self, name: &str) -> Result<Option<Vote>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE name = $1", self.table());
        let vote = sqlx::query_as::<Any, Vote>(&sql)
            .bind(name.to_owned())
            .fetch_optional(&self.pool)
            .await?;
        Ok(vote)
    }

    pub async fn get_all(&self) -> Result<Vec<Vote>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY name", self.table());
        let votes = sqlx::query_as::<Any, Vote>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(votes)
    }

    /// Inserts the name and the present size fields of `vote`.
    #[instrument(skip(self, vote), fields(board = self.board.as_str(), name = ?vote.name))]
    pub async fn insert(&self, vote: &VoteInput) -> Result<UpsertResult, StoreError> {
        let columns: Vec<&str> = std::iter::once("name")
            .chain(vote.fields.iter().map(|(size, _)| size.as_str()))
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING name",
            self.table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query_scalar::<Any, String>(&sql).bind(vote.name.clone());
        for (_, value) in &vote.fields {
            query = query.bind(value.clone());
        }
        let name = query.fetch_one(&self.pool).await?;

        debug!("Inserted vote");
        Ok(UpsertResult { name, created: true })
    }

    /// Overwrites only the size fields present in `vote`.
    ///
    /// Reports `created: false` even when no row has that name.
    #[instrument(skip(self, vote), fields(board = self.board.as_str(), name = ?vote.name))]
    pub async fn update(&self, vote: &VoteInput) -> Result<UpsertResult, StoreError> {
        let name = vote.name.as_deref().ok_or_else(StoreError::missing_name)?;
        if self.update_returning(name, &vote.fields).await?.is_none() {
            debug!("Update matched no vote");
        }
        Ok(UpsertResult { name: name.to_owned(), created: false })
    }

    /// Inserts `vote` when its name is unknown, updates it otherwise.
    ///
    /// The lookup and the write are separate statements; a concurrent insert
    /// of the same name fails on the primary key and is not retried.
    #[instrument(skip(self, vote), fields(board = self.board.as_str(), name = ?vote.name))]
    pub async fn replace(&self, vote: &VoteInput) -> Result<UpsertResult, StoreError> {
        let name = vote.name.as_deref().ok_or_else(StoreError::missing_name)?;
        match self.get(name).await? {
            Some(_) => self.update(vote).await,
            None => self.insert(vote).await,
        }
    }

    /// Updates the present fields of `name`'s vote and returns the stored
    /// sizes, or `None` when `name` has not voted.
    #[instrument(skip(self, vote), fields(board = self.board.as_str()))]
    pub async fn patch(&self, name: &str, vote: &VoteInput) -> Result<Option<SizeValues>, StoreError> {
        let updated = self.update_returning(name, &vote.fields).await?;
        Ok(updated.map(|vote| vote.sizes))
    }

    async fn update_returning(
        &self,
        name: &str,
        fields: &[(Size, Option<String>)],
    ) -> Result<Option<Vote>, StoreError> {
        if fields.is_empty() {
            return self.get(name).await;
        }

        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (size, _))| format!("{} = ${}", size.as_str(), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE name = ${} RETURNING {COLUMNS}",
            self.table(),
            assignments.join(", "),
            fields.len() + 1
        );

        let mut query = sqlx::query_as::<Any, Vote>(&sql);
        for (_, value) in fields {
            query = query.bind(value.clone());
        }
        let vote = query
            .bind(name.to_owned())
            .fetch_optional(&self.pool)
            .await?;
        Ok(vote)
    }

    /// Groups every non-null size value with the names of its voters.
    ///
    /// Groups come ordered by size from `tiny` down to `huge`, then by value.
    #[instrument(skip(self), fields(board = self.board.as_str()))]
    pub async fn aggregate(&self) -> Result<Vec<ValueGroup>, StoreError> {
        let sql = Size::ALL
            .iter()
            .map(|size| self.group_query(*size))
            .collect::<Vec<_>>()
            .join(" UNION ");

        let rows = sqlx::query_as::<Any, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        let mut groups = rows
            .into_iter()
            .map(ValueGroup::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        groups.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.value.cmp(&b.value)));

        debug!(groups = groups.len(), "Aggregated votes");
        Ok(groups)
    }

    fn group_query(&self, size: Size) -> String {
        let column = size.as_str();
        format!(
            "SELECT '{column}' AS size, {column} AS value, {names} AS voters \
             FROM {table} WHERE {column} IS NOT NULL GROUP BY {column}",
            names = self.dialect.collect_names(),
            table = self.table(),
        )
    }
}
