use axum::{Json, extract::State, http::StatusCode};

use crate::db::models::tax_rate::{CreateTaxRate, TaxRate};
use crate::handlers::invoices::check_tax_rate;
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::{DeskError, router::DeskState};

impl Validate for CreateTaxRate {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("name", &self.name)?;
        check_tax_rate(self.rate)
    }
}

pub async fn list(State(state): State<DeskState>) -> Result<Json<Vec<TaxRate>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(TaxRate::list(&mut conn).await?))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateTaxRate>,
) -> Result<(StatusCode, Json<TaxRate>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let rate = TaxRate::create(&mut tx, &data).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(rate)))
}
