use sqlx::SqlitePool;

use super::error::ServiceError;
use crate::routes::models::{ContentItem, Course};

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: i64,
    public_id: String,
    title: String,
    description: String,
    image: Option<String>,
    instructor: String,
}

const COURSE_SELECT: &str = r#"
    SELECT c.id, c.public_id, c.title, c.description, c.image, u.public_id AS instructor
    FROM courses c
    JOIN users u ON u.id = c.instructor_id
"#;

/// Resolve a course public ID to its database ID.
pub async fn resolve_course(pool: &SqlitePool, public_id: &str) -> Result<i64, ServiceError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE public_id = ?")
        .bind(public_id)
        .fetch_optional(pool)
        .await?;

    id.ok_or_else(|| ServiceError::not_found("Course not found"))
}

pub async fn create_course(
    pool: &SqlitePool,
    instructor_id: i64,
    title: &str,
    description: &str,
) -> Result<Course, ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::bad_request("Title is required"));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let public_id = cuid2::create_id();

    sqlx::query(
        r#"
        INSERT INTO courses (public_id, title, description, instructor_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(title)
    .bind(description)
    .bind(instructor_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_course(pool, &public_id).await
}

pub async fn get_course(pool: &SqlitePool, public_id: &str) -> Result<Course, ServiceError> {
    let query = format!("{COURSE_SELECT} WHERE c.public_id = ?");
    let row = sqlx::query_as::<_, CourseRow>(&query)
        .bind(public_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Course not found"))?;

    assemble(pool, row).await
}

pub async fn list_courses(pool: &SqlitePool) -> Result<Vec<Course>, ServiceError> {
    let query = format!("{COURSE_SELECT} ORDER BY c.created_at ASC");
    let rows = sqlx::query_as::<_, CourseRow>(&query).fetch_all(pool).await?;
    assemble_all(pool, rows).await
}

pub async fn search_courses(pool: &SqlitePool, term: &str) -> Result<Vec<Course>, ServiceError> {
    let query = format!(
        "{COURSE_SELECT} WHERE c.title LIKE ? COLLATE NOCASE ORDER BY c.created_at ASC"
    );
    let rows = sqlx::query_as::<_, CourseRow>(&query)
        .bind(format!("%{}%", term))
        .fetch_all(pool)
        .await?;
    assemble_all(pool, rows).await
}

pub async fn update_course(
    pool: &SqlitePool,
    public_id: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<Course, ServiceError> {
    let course_id = resolve_course(pool, public_id).await?;

    if let Some(title) = title {
        if title.trim().is_empty() {
            return Err(ServiceError::bad_request("Title is required"));
        }
        sqlx::query("UPDATE courses SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(course_id)
            .execute(pool)
            .await?;
    }

    if let Some(description) = description {
        sqlx::query("UPDATE courses SET description = ?, updated_at = ? WHERE id = ?")
            .bind(description)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(course_id)
            .execute(pool)
            .await?;
    }

    get_course(pool, public_id).await
}

pub async fn delete_course(pool: &SqlitePool, public_id: &str) -> Result<(), ServiceError> {
    let course_id = resolve_course(pool, public_id).await?;

    sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn enroll(
    pool: &SqlitePool,
    user_id: i64,
    course_public_id: &str,
) -> Result<(), ServiceError> {
    let course_id = resolve_course(pool, course_public_id).await?;

    // Enrolling twice is a no-op, not an error.
    sqlx::query(
        "INSERT OR IGNORE INTO enrollments (user_id, course_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn enrolled_courses(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<Course>, ServiceError> {
    let query = format!(
        "{COURSE_SELECT} JOIN enrollments e ON e.course_id = c.id WHERE e.user_id = ? ORDER BY e.created_at ASC"
    );
    let rows = sqlx::query_as::<_, CourseRow>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    assemble_all(pool, rows).await
}

pub async fn user_courses(
    pool: &SqlitePool,
    instructor_id: i64,
) -> Result<Vec<Course>, ServiceError> {
    let query = format!("{COURSE_SELECT} WHERE c.instructor_id = ? ORDER BY c.created_at ASC");
    let rows = sqlx::query_as::<_, CourseRow>(&query)
        .bind(instructor_id)
        .fetch_all(pool)
        .await?;
    assemble_all(pool, rows).await
}

/// Append an uploaded file to the course's content sequence. Replays of
/// an idempotency key return the already-stored item so client retries
/// never duplicate content.
pub async fn append_content(
    pool: &SqlitePool,
    course_public_id: &str,
    kind: &str,
    title: &str,
    url: &str,
    idempotency_key: &str,
) -> Result<ContentItem, ServiceError> {
    let course_id = resolve_course(pool, course_public_id).await?;

    let existing = sqlx::query_as::<_, ContentItem>(
        "SELECT public_id AS id, kind, title, url FROM course_content WHERE idempotency_key = ?",
    )
    .bind(idempotency_key)
    .fetch_optional(pool)
    .await?;

    if let Some(item) = existing {
        tracing::info!(key = idempotency_key, "replayed upload, returning existing item");
        return Ok(item);
    }

    let public_id = cuid2::create_id();
    sqlx::query(
        r#"
        INSERT INTO course_content (public_id, course_id, kind, title, url, idempotency_key, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?,
            (SELECT COALESCE(MAX(position) + 1, 0) FROM course_content WHERE course_id = ?),
            ?)
        "#,
    )
    .bind(&public_id)
    .bind(course_id)
    .bind(kind)
    .bind(title)
    .bind(url)
    .bind(idempotency_key)
    .bind(course_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(ContentItem {
        id: public_id,
        kind: kind.to_owned(),
        title: title.to_owned(),
        url: url.to_owned(),
    })
}

pub async fn set_course_image(
    pool: &SqlitePool,
    course_public_id: &str,
    url: &str,
) -> Result<(), ServiceError> {
    let course_id = resolve_course(pool, course_public_id).await?;

    sqlx::query("UPDATE courses SET image = ?, updated_at = ? WHERE id = ?")
        .bind(url)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(course_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn update_video_title(
    pool: &SqlitePool,
    course_public_id: &str,
    video_public_id: &str,
    title: &str,
) -> Result<Course, ServiceError> {
    let course_id = resolve_course(pool, course_public_id).await?;

    let updated = sqlx::query(
        "UPDATE course_content SET title = ? WHERE public_id = ? AND course_id = ? AND kind = 'video'",
    )
    .bind(title)
    .bind(video_public_id)
    .bind(course_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ServiceError::not_found("Video not found"));
    }

    get_course(pool, course_public_id).await
}

pub async fn delete_video(
    pool: &SqlitePool,
    course_public_id: &str,
    video_public_id: &str,
) -> Result<(), ServiceError> {
    let course_id = resolve_course(pool, course_public_id).await?;

    let deleted = sqlx::query(
        "DELETE FROM course_content WHERE public_id = ? AND course_id = ? AND kind = 'video'",
    )
    .bind(video_public_id)
    .bind(course_id)
    .execute(pool)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(ServiceError::not_found("Video not found"));
    }

    Ok(())
}

async fn assemble(pool: &SqlitePool, row: CourseRow) -> Result<Course, ServiceError> {
    let content = sqlx::query_as::<_, ContentItem>(
        "SELECT public_id AS id, kind, title, url FROM course_content WHERE course_id = ? ORDER BY position ASC",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    Ok(Course {
        id: row.public_id,
        title: row.title,
        description: row.description,
        image: row.image,
        instructor: row.instructor,
        content,
    })
}

async fn assemble_all(
    pool: &SqlitePool,
    rows: Vec<CourseRow>,
) -> Result<Vec<Course>, ServiceError> {
    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        courses.push(assemble(pool, row).await?);
    }
    Ok(courses)
}
