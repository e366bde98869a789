use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde_json::{json, Value};

use crate::db::queries;
use crate::errors::AppError;
use crate::extract::CurrentUser;
use crate::models::{Booking, Identity, ServiceType, TimeSlot};
use crate::services::forms::{self, BookingForm, FieldErrors};
use crate::services::listing;
use crate::services::policy::{self, BookingAction};
use crate::state::AppState;

const DATE_FMT: &str = "%Y-%m-%d";

// GET /bookings/
pub async fn booking_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Html<String>, AppError> {
    let conn = state.db.lock().unwrap();
    let details = listing::visible_bookings(&conn, &identity)?;

    let bookings: Vec<Value> = details
        .iter()
        .map(|d| {
            json!({
                "id": d.booking.id,
                "preferred_date": d.booking.preferred_date.format(DATE_FMT).to_string(),
                "slot": d.slot.display(),
                "service": d.booking.service_type.label(),
                "car_model": d.booking.car_model,
                "customer_name": d.booking.customer_name,
                "owner": d.owner_username,
            })
        })
        .collect();

    let context = json!({
        "username": identity.username,
        "is_staff": identity.is_elevated(),
        "bookings": bookings,
    });
    Ok(Html(state.renderer.render("bookings/booking_list.html", &context)))
}

// GET /bookings/create/
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Html<String>, AppError> {
    let conn = state.db.lock().unwrap();
    let slots = queries::list_slots(&conn)?;

    // New bookings start with the customer name pre-filled from the account.
    let form = json!({ "customer_name": identity.username });
    Ok(form_page(
        &state,
        &identity,
        "Create Booking",
        "/bookings/create/submit/",
        form,
        &FieldErrors::new(),
        &slots,
    ))
}

// POST /bookings/create/submit/
pub async fn create_submit(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Form(form): Form<BookingForm>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();
    let slots = queries::list_slots(&conn)?;

    match forms::validate(&form, &slots) {
        Ok(valid) => {
            // Ownership always comes from the session, never from the form.
            let booking = valid.into_booking(&identity.user_id);
            queries::create_booking(&conn, &booking)?;
            tracing::info!(booking_id = %booking.id, user = %identity.username, "booking created");
            Ok(Redirect::to("/bookings/").into_response())
        }
        Err(errors) => Ok(form_page(
            &state,
            &identity,
            "Create Booking",
            "/bookings/create/submit/",
            form_values(&form),
            &errors,
            &slots,
        )
        .into_response()),
    }
}

// GET /bookings/:id/edit/
pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let conn = state.db.lock().unwrap();
    let booking = fetch_authorized(&conn, &id, &identity, BookingAction::Edit)?;
    let slots = queries::list_slots(&conn)?;

    let post_url = format!("/bookings/{id}/edit/submit/");
    Ok(form_page(
        &state,
        &identity,
        "Edit Booking",
        &post_url,
        stored_values(&booking),
        &FieldErrors::new(),
        &slots,
    ))
}

// POST /bookings/:id/edit/submit/
pub async fn edit_submit(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<BookingForm>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();
    let mut booking = fetch_authorized(&conn, &id, &identity, BookingAction::Edit)?;
    let slots = queries::list_slots(&conn)?;

    match forms::validate(&form, &slots) {
        Ok(valid) => {
            valid.apply_to(&mut booking);
            queries::update_booking(&conn, &booking)?;
            tracing::info!(booking_id = %booking.id, user = %identity.username, "booking updated");
            Ok(Redirect::to("/bookings/").into_response())
        }
        Err(errors) => {
            let post_url = format!("/bookings/{id}/edit/submit/");
            Ok(form_page(
                &state,
                &identity,
                "Edit Booking",
                &post_url,
                form_values(&form),
                &errors,
                &slots,
            )
            .into_response())
        }
    }
}

// GET /bookings/:id/delete/
pub async fn delete_confirm_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let conn = state.db.lock().unwrap();
    let booking = fetch_authorized(&conn, &id, &identity, BookingAction::Delete)?;
    let slot_display = queries::get_slot(&conn, &booking.slot_id)?
        .map(|s| s.display())
        .unwrap_or_default();

    let context = json!({
        "username": identity.username,
        "is_staff": identity.is_elevated(),
        "post_url": format!("/bookings/{id}/delete/confirm/"),
        "booking": {
            "customer_name": booking.customer_name,
            "preferred_date": booking.preferred_date.format(DATE_FMT).to_string(),
            "slot": slot_display,
        },
    });
    Ok(Html(
        state
            .renderer
            .render("bookings/booking_confirm_delete.html", &context),
    ))
}

// POST /bookings/:id/delete/confirm/
pub async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();
    let booking = fetch_authorized(&conn, &id, &identity, BookingAction::Delete)?;
    queries::delete_booking(&conn, &booking.id)?;
    tracing::info!(booking_id = %booking.id, user = %identity.username, "booking deleted");
    Ok(Redirect::to("/bookings/").into_response())
}

/// Load a booking and gate it behind the access policy. Existence is
/// checked first, so probing someone else's id space yields 404, not 403.
fn fetch_authorized(
    conn: &rusqlite::Connection,
    id: &str,
    who: &Identity,
    action: BookingAction,
) -> Result<Booking, AppError> {
    let Some(booking) = queries::get_booking(conn, id)? else {
        return Err(AppError::NotFound(format!("booking {id}")));
    };
    if !policy::can_access(&booking, who, action) {
        return Err(AppError::Forbidden);
    }
    Ok(booking)
}

fn form_page(
    state: &AppState,
    identity: &Identity,
    title: &str,
    post_url: &str,
    form: Value,
    errors: &FieldErrors,
    slots: &[TimeSlot],
) -> Html<String> {
    let service_types: Vec<Value> = ServiceType::ALL
        .iter()
        .map(|st| json!({ "value": st.as_str(), "label": st.label() }))
        .collect();
    let slot_choices: Vec<Value> = slots
        .iter()
        .map(|s| json!({ "id": s.id, "display": s.display() }))
        .collect();

    let context = json!({
        "username": identity.username,
        "is_staff": identity.is_elevated(),
        "title": title,
        "post_url": post_url,
        "form": form,
        "errors": errors,
        "service_types": service_types,
        "slots": slot_choices,
    });
    Html(state.renderer.render("bookings/booking_form.html", &context))
}

/// Echo the submitted values back into the form context for a re-render.
fn form_values(form: &BookingForm) -> Value {
    json!({
        "customer_name": form.customer_name,
        "email": form.email,
        "phone": form.phone,
        "car_model": form.car_model,
        "service_type": form.service_type,
        "preferred_date": form.preferred_date,
        "slot": form.slot,
        "notes": form.notes,
    })
}

fn stored_values(booking: &Booking) -> Value {
    json!({
        "customer_name": booking.customer_name,
        "email": booking.email,
        "phone": booking.phone,
        "car_model": booking.car_model,
        "service_type": booking.service_type.as_str(),
        "preferred_date": booking.preferred_date.format(DATE_FMT).to_string(),
        "slot": booking.slot_id,
        "notes": booking.notes.clone().unwrap_or_default(),
    })
}
