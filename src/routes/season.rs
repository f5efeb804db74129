use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult,
    models::Season,
    response::ApiResponse,
    services::season_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_season))
}

#[utoipa::path(
    get,
    path = "/api/season",
    responses(
        (status = 200, description = "Current merchandising season", body = ApiResponse<Season>)
    ),
    tag = "Season"
)]
pub async fn get_season(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Season>>> {
    let resp = season_service::get_season(&state).await?;
    Ok(Json(resp))
}
