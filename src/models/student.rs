//! Student model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

use crate::scoring::Gender;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub student_id: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub grade: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub photo: Option<String>,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    #[validate(length(min = 3, max = 50))]
    pub name: String,
    #[validate(length(min = 3, max = 20))]
    pub student_id: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 1, max = 50))]
    pub grade: String,
    #[serde(rename = "class")]
    #[validate(length(min = 1, max = 50))]
    pub class_name: String,
    #[validate(length(max = 500))]
    pub photo: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    #[validate(length(min = 3, max = 50))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 20))]
    pub student_id: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(min = 1, max = 50))]
    pub grade: Option<String>,
    #[serde(rename = "class")]
    #[validate(length(min = 1, max = 50))]
    pub class_name: Option<String>,
    #[validate(length(max = 500))]
    pub photo: Option<String>,
}

/// Columns clients may sort by, mapped to SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentSort {
    Name,
    StudentId,
    Grade,
    CreatedAt,
}

impl StudentSort {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("studentId") => Self::StudentId,
            Some("grade") => Self::Grade,
            Some("createdAt") => Self::CreatedAt,
            _ => Self::Name,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::StudentId => "student_id",
            Self::Grade => "grade",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    pub search: Option<String>,
    pub grade: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl StudentQuery {
    pub const MAX_LIMIT: i64 = 100;

    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(10).min(Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    fn descending(&self) -> bool {
        self.order.as_deref().is_some_and(|o| o.eq_ignore_ascii_case("desc"))
    }

    fn trimmed(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Append WHERE clauses shared by the list and count queries
    fn push_filters<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>, owner: Option<Uuid>) {
        builder.push(" WHERE TRUE");

        if let Some(owner) = owner {
            builder.push(" AND user_id = ").push_bind(owner);
        }

        if let Some(search) = Self::trimmed(&self.search) {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR student_id ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(grade) = Self::trimmed(&self.grade) {
            builder.push(" AND grade = ").push_bind(grade);
        }

        if let Some(class_name) = Self::trimmed(&self.class_name) {
            builder.push(" AND class_name = ").push_bind(class_name);
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        Self {
            total,
            total_pages: if limit > 0 { (total + limit - 1) / limit } else { 0 },
            current_page: page,
            limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentPage {
    pub students: Vec<Student>,
    pub pagination: Pagination,
}

impl Student {
    pub fn gender(&self) -> Gender {
        Gender::parse(&self.gender).unwrap_or(Gender::Male)
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, data: CreateStudent) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (name, student_id, gender, date_of_birth, grade, class_name, photo, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#
        )
        .bind(&data.name)
        .bind(&data.student_id)
        .bind(data.gender.as_str())
        .bind(data.date_of_birth)
        .bind(&data.grade)
        .bind(&data.class_name)
        .bind(&data.photo)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Find a student, restricted to `owner` when given
    pub async fn find_scoped(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)"
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await
    }

    /// True when another student already uses this external ID
    pub async fn student_id_taken(pool: &PgPool, student_id: &str, exclude: Option<Uuid>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = $1 AND ($2::uuid IS NULL OR id <> $2))"
        )
        .bind(student_id)
        .bind(exclude)
        .fetch_one(pool)
        .await
    }

    pub async fn list(pool: &PgPool, owner: Option<Uuid>, query: &StudentQuery) -> Result<StudentPage, sqlx::Error> {
        let page = query.page();
        let limit = query.limit();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students");
        query.push_filters(&mut count, owner);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM students");
        query.push_filters(&mut select, owner);
        select
            .push(" ORDER BY ")
            .push(StudentSort::parse(query.sort.as_deref()).column())
            .push(if query.descending() { " DESC" } else { " ASC" })
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(query.offset());

        let students = select.build_query_as::<Student>().fetch_all(pool).await?;

        Ok(StudentPage {
            students,
            pagination: Pagination::new(total, page, limit),
        })
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateStudent) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = COALESCE($2, name),
                student_id = COALESCE($3, student_id),
                gender = COALESCE($4, gender),
                date_of_birth = COALESCE($5, date_of_birth),
                grade = COALESCE($6, grade),
                class_name = COALESCE($7, class_name),
                photo = COALESCE($8, photo),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.student_id)
        .bind(data.gender.map(|g| g.as_str()))
        .bind(data.date_of_birth)
        .bind(&data.grade)
        .bind(&data.class_name)
        .bind(&data.photo)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool, owner: Option<Uuid>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM students WHERE ($1::uuid IS NULL OR user_id = $1)"
        )
        .bind(owner)
        .fetch_one(pool)
        .await
    }
}
