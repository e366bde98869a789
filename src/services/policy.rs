use crate::models::{Booking, Identity};

/// Single-record actions gated by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    View,
    Edit,
    Delete,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::View => "view",
            BookingAction::Edit => "edit",
            BookingAction::Delete => "delete",
        }
    }
}

/// Staff and superusers may act on any booking, everyone else only on
/// bookings they own. Callers must check the booking exists first so a
/// stranger probing a missing id gets not-found rather than forbidden.
pub fn can_access(booking: &Booking, who: &Identity, action: BookingAction) -> bool {
    let allowed = who.is_elevated() || booking.user_id == who.user_id;
    if !allowed {
        tracing::debug!(
            booking_id = %booking.id,
            user = %who.username,
            action = action.as_str(),
            "booking access denied"
        );
    }
    allowed
}

/// Coarse rule for list views: staff see everything, others only their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    All,
    OwnedBy(String),
}

pub fn list_scope(who: &Identity) -> ListScope {
    if who.is_elevated() {
        ListScope::All
    } else {
        ListScope::OwnedBy(who.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::models::ServiceType;

    fn identity(user_id: &str, is_staff: bool, is_superuser: bool) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            username: format!("user-{user_id}"),
            is_staff,
            is_superuser,
        }
    }

    fn booking_owned_by(owner_id: &str) -> Booking {
        Booking {
            id: "b1".to_string(),
            user_id: owner_id.to_string(),
            customer_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "5551234567".to_string(),
            car_model: "Volvo V60".to_string(),
            service_type: ServiceType::Exterior,
            preferred_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            slot_id: "ts-morning".to_string(),
            notes: None,
            created_at: NaiveDateTime::parse_from_str("2030-01-01 09:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        }
    }

    #[test]
    fn owner_may_act_on_own_booking() {
        let booking = booking_owned_by("u1");
        let owner = identity("u1", false, false);
        for action in [BookingAction::View, BookingAction::Edit, BookingAction::Delete] {
            assert!(can_access(&booking, &owner, action));
        }
    }

    #[test]
    fn stranger_is_denied_every_action() {
        let booking = booking_owned_by("u1");
        let stranger = identity("u2", false, false);
        for action in [BookingAction::View, BookingAction::Edit, BookingAction::Delete] {
            assert!(!can_access(&booking, &stranger, action));
        }
    }

    #[test]
    fn staff_may_act_on_any_booking() {
        let booking = booking_owned_by("u1");
        assert!(can_access(&booking, &identity("u2", true, false), BookingAction::Edit));
        assert!(can_access(&booking, &identity("u3", false, true), BookingAction::Delete));
    }

    #[test]
    fn staff_list_everything_others_only_their_own() {
        assert_eq!(list_scope(&identity("u1", true, false)), ListScope::All);
        assert_eq!(list_scope(&identity("u2", false, true)), ListScope::All);
        assert_eq!(
            list_scope(&identity("u3", false, false)),
            ListScope::OwnedBy("u3".to_string())
        );
    }
}
