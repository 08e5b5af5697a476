//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Postgres prepared statements hold a single command each
    for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Users (teachers and admins)
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(20) NOT NULL DEFAULT 'teacher' CHECK (role IN ('admin', 'teacher')),
    profile_picture VARCHAR(500),
    active BOOLEAN NOT NULL DEFAULT true,
    last_login TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Students
CREATE TABLE IF NOT EXISTS students (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    student_id VARCHAR(50) NOT NULL UNIQUE,
    gender VARCHAR(10) NOT NULL CHECK (gender IN ('male', 'female')),
    date_of_birth DATE NOT NULL,
    grade VARCHAR(50) NOT NULL,
    class_name VARCHAR(50) NOT NULL,
    photo VARCHAR(500),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Predictions
CREATE TABLE IF NOT EXISTS predictions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    hours_studied DOUBLE PRECISION NOT NULL,
    attendance DOUBLE PRECISION NOT NULL,
    extracurricular_activities BOOLEAN NOT NULL,
    sleep_hours DOUBLE PRECISION NOT NULL,
    previous_scores DOUBLE PRECISION NOT NULL,
    motivation_level DOUBLE PRECISION NOT NULL,
    tutoring_sessions INT NOT NULL,
    teacher_quality DOUBLE PRECISION NOT NULL,
    physical_activity DOUBLE PRECISION NOT NULL,
    learning_disabilities BOOLEAN NOT NULL,
    exam_score DOUBLE PRECISION,
    prediction_score DOUBLE PRECISION NOT NULL,
    prediction_status VARCHAR(10) NOT NULL CHECK (prediction_status IN ('success', 'at_risk', 'fail')),
    intervention_recommendations JSONB NOT NULL DEFAULT '[]'::jsonb,
    model_used VARCHAR(100) NOT NULL,
    semester VARCHAR(50) NOT NULL,
    academic_year VARCHAR(20) NOT NULL,
    created_by UUID REFERENCES users(id) ON DELETE SET NULL,
    prediction_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_students_user ON students(user_id);
CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_name);
CREATE INDEX IF NOT EXISTS idx_predictions_student ON predictions(student_id, created_at);
CREATE INDEX IF NOT EXISTS idx_predictions_status ON predictions(prediction_status);
"#;
