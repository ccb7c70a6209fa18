use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Creates or repairs the default instructor account configured through
/// `FIRST_INSTRUCTOR_EMAIL` / `FIRST_INSTRUCTOR_PASSWORD`.
pub(crate) async fn ensure_default_instructor(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_instructor_password.is_empty() {
        tracing::warn!("FIRST_INSTRUCTOR_PASSWORD not configured; skipping instructor bootstrap");
        return Ok(());
    }

    let email = &admin.first_instructor_email;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), email).await? {
        let verified =
            security::verify_password(&admin.first_instructor_password, &user.hashed_password)
                .unwrap_or(false);

        if verified && user.is_active && user.role == UserRole::Instructor {
            tracing::info!("Default instructor already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            None
        } else {
            Some(security::hash_password(&admin.first_instructor_password)?)
        };

        repositories::users::update(
            state.db(),
            &user.id,
            repositories::users::UpdateUser {
                full_name: None,
                is_active: Some(true),
                hashed_password,
                updated_at: now,
            },
        )
        .await?;

        tracing::info!("Updated default instructor {email}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_instructor_password)?;

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            hashed_password,
            full_name: "LearnHub Instructor",
            role: UserRole::Instructor,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!("Created default instructor {email}");
    Ok(())
}
