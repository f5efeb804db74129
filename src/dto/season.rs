use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::SeasonMode;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSeasonRequest {
    pub mode: SeasonMode,
}
