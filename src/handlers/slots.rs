use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde_json::{json, Value};

use crate::db::queries::{self, SlotDeletion};
use crate::errors::AppError;
use crate::extract::StaffUser;
use crate::models::{Identity, TimeSlot};
use crate::services::forms::{self, FieldErrors, SlotForm, MSG_DUPLICATE_LABEL};
use crate::state::AppState;

// GET /slots/
pub async fn slot_list(
    State(state): State<Arc<AppState>>,
    StaffUser(identity): StaffUser,
) -> Result<Html<String>, AppError> {
    let conn = state.db.lock().unwrap();
    let slots = queries::list_slots(&conn)?;
    Ok(slot_page(&state, &identity, json!({}), &FieldErrors::new(), "", &slots))
}

// POST /slots/create/
pub async fn slot_create(
    State(state): State<Arc<AppState>>,
    StaffUser(identity): StaffUser,
    Form(form): Form<SlotForm>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();

    match forms::validate_slot(&form) {
        Ok(slot) => {
            if queries::create_slot(&conn, &slot)? {
                tracing::info!(label = %slot.label, "time slot created");
                Ok(Redirect::to("/slots/").into_response())
            } else {
                let mut errors = FieldErrors::new();
                errors
                    .entry("label".to_string())
                    .or_default()
                    .push(MSG_DUPLICATE_LABEL.to_string());
                let slots = queries::list_slots(&conn)?;
                Ok(slot_page(&state, &identity, form_values(&form), &errors, "", &slots)
                    .into_response())
            }
        }
        Err(errors) => {
            let slots = queries::list_slots(&conn)?;
            Ok(slot_page(&state, &identity, form_values(&form), &errors, "", &slots)
                .into_response())
        }
    }
}

// POST /slots/:id/delete/
pub async fn slot_delete(
    State(state): State<Arc<AppState>>,
    StaffUser(identity): StaffUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();

    match queries::delete_slot(&conn, &id)? {
        SlotDeletion::Deleted => {
            tracing::info!(slot_id = %id, "time slot deleted");
            Ok(Redirect::to("/slots/").into_response())
        }
        SlotDeletion::NotFound => Err(AppError::NotFound(format!("time slot {id}"))),
        SlotDeletion::Protected => {
            let slots = queries::list_slots(&conn)?;
            let page = slot_page(
                &state,
                &identity,
                json!({}),
                &FieldErrors::new(),
                "Cannot delete this time slot because bookings still reference it.",
                &slots,
            );
            Ok((StatusCode::CONFLICT, page).into_response())
        }
    }
}

fn slot_page(
    state: &AppState,
    identity: &Identity,
    form: Value,
    errors: &FieldErrors,
    alert: &str,
    slots: &[TimeSlot],
) -> Html<String> {
    let rows: Vec<Value> = slots
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "label": s.label,
                "window": format!(
                    "{}-{}",
                    s.start_time.format("%H:%M"),
                    s.end_time.format("%H:%M")
                ),
            })
        })
        .collect();

    let context = json!({
        "username": identity.username,
        "is_staff": true,
        "slots": rows,
        "form": form,
        "errors": errors,
        "alert": alert,
    });
    Html(state.renderer.render("bookings/slot_list.html", &context))
}

fn form_values(form: &SlotForm) -> Value {
    json!({
        "label": form.label,
        "start_time": form.start_time,
        "end_time": form.end_time,
    })
}
