use chrono::Utc;
use sea_orm::{EntityTrait, Set};
use sea_orm::sea_query::OnConflict;

use crate::{
    audit,
    dto::season::UpdateSeasonRequest,
    entity::settings::{ActiveModel as SettingActive, Column as SettingCol, Entity as Settings},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Season, SeasonMode},
    response::{ApiResponse, Meta},
    state::AppState,
};

const SEASON_KEY: &str = "season";

/// The merchandising mode currently in force; a missing or unreadable row means normal.
pub async fn current_mode(state: &AppState) -> AppResult<Season> {
    let row = Settings::find_by_id(SEASON_KEY.to_string())
        .one(&state.orm)
        .await?;
    let season = match row {
        Some(row) => Season {
            mode: row
                .value
                .get("mode")
                .cloned()
                .and_then(|mode| serde_json::from_value(mode).ok())
                .unwrap_or(SeasonMode::Normal),
            updated_at: Some(row.updated_at.with_timezone(&Utc)),
        },
        None => Season {
            mode: SeasonMode::Normal,
            updated_at: None,
        },
    };
    Ok(season)
}

pub async fn get_season(state: &AppState) -> AppResult<ApiResponse<Season>> {
    let season = current_mode(state).await?;
    Ok(ApiResponse::success("Season", season, Some(Meta::empty())))
}

pub async fn update_season(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateSeasonRequest,
) -> AppResult<ApiResponse<Season>> {
    ensure_admin(state, user).await?;

    let row = SettingActive {
        key: Set(SEASON_KEY.to_string()),
        value: Set(serde_json::json!({ "mode": payload.mode })),
        updated_at: Set(Utc::now().into()),
    };
    Settings::insert(row)
        .on_conflict(
            OnConflict::column(SettingCol::Key)
                .update_columns([SettingCol::Value, SettingCol::UpdatedAt])
                .to_owned(),
        )
        .exec(&state.orm)
        .await?;

    tracing::info!(mode = ?payload.mode, "season switched");
    audit::record(
        &state.pool,
        user.user_id,
        "season_update",
        "settings",
        serde_json::json!({ "mode": payload.mode }),
    )
    .await;

    let season = current_mode(state).await?;
    Ok(ApiResponse::success("Season updated", season, Some(Meta::empty())))
}
