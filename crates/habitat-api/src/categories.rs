use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use habitat_db::is_constraint_violation;
use habitat_types::api::{CategoryCreated, CategoryRequest, Claims};
use habitat_types::models::{Category, is_known_color};

use crate::auth::AppState;
use crate::habits::DEFAULT_COLOR;
use crate::{internal_error, run_blocking};

const MAX_NAME_LEN: usize = 50;

/// Trimmed name and palette color of a category body.
fn validate(req: CategoryRequest) -> Result<(String, String), StatusCode> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    let color = req.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
    if !is_known_color(&color) {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok((name, color))
}

fn conflict_or_internal(e: anyhow::Error) -> StatusCode {
    if is_constraint_violation(&e) {
        StatusCode::CONFLICT
    } else {
        internal_error(e)
    }
}

/// GET /categories
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let categories =
        run_blocking(move || db.db.list_categories(&user_id).map_err(internal_error)).await?;
    Ok(Json(categories))
}

/// POST /categories: 409 if the caller already has a category of that name.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let (name, color) = validate(req)?;
    let category = Category {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        name,
        color,
        created_at: Utc::now(),
    };

    let db = state.clone();
    let id = category.id.clone();
    run_blocking(move || db.db.create_category(&category).map_err(conflict_or_internal)).await?;

    info!(category_id = %id, user_id = %claims.sub, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryCreated { id })))
}

/// PUT /categories/{category_id}: the new color is pushed to the category's habits.
pub async fn update(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let (name, color) = validate(req)?;

    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        let updated = db
            .db
            .update_category(&user_id, &category_id, &name, &color)
            .map_err(conflict_or_internal)?;
        if updated {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    })
    .await
}

/// DELETE /categories/{category_id}: habits in it are kept, uncategorized.
pub async fn delete(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        if db.db.delete_category(&user_id, &category_id).map_err(internal_error)? {
            info!(category_id = %category_id, "Category deleted");
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, color: Option<&str>) -> CategoryRequest {
        CategoryRequest {
            name: name.into(),
            color: color.map(Into::into),
        }
    }

    #[test]
    fn names_are_trimmed_and_color_defaults() {
        assert_eq!(
            validate(req("  Sport ", None)),
            Ok(("Sport".to_string(), "purple".to_string()))
        );
        assert_eq!(validate(req("   ", None)), Err(StatusCode::BAD_REQUEST));
        assert_eq!(validate(req(&"x".repeat(51), None)), Err(StatusCode::BAD_REQUEST));
        assert_eq!(validate(req("Sport", Some("mauve"))), Err(StatusCode::BAD_REQUEST));
    }
}
