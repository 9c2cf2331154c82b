//! Role and ownership predicates.
//!
//! Pure functions over the already-authenticated actor and the rows they are
//! touching. Handlers decide what to load; these decide whether the actor may
//! have it. List endpoints narrow at the query instead, via the repository
//! filter types.

use crate::{
    api::models::users::{CurrentUser, Role},
    db::models::{routes::RouteDBResponse, schools::SchoolDBResponse, students::StudentDBResponse},
    errors::{Error, Result},
};

/// Staff (admins and operators) see any student; parents only their own.
pub fn can_view_student(actor: &CurrentUser, student: &StudentDBResponse) -> bool {
    actor.role.is_staff() || student.parent_id == actor.id
}

/// Same circle as viewing: parents manage their own children, staff manage
/// everyone's.
pub fn can_manage_student(actor: &CurrentUser, student: &StudentDBResponse) -> bool {
    can_view_student(actor, student)
}

/// Boardings are verified by an admin, or by the operator who runs the route
/// the event is recorded against.
pub fn can_verify_boarding(actor: &CurrentUser, route: &RouteDBResponse) -> bool {
    actor.role == Role::Admin || (actor.role == Role::Operator && route.operator_id == actor.id)
}

/// Only staff send or broadcast notifications.
pub fn can_send_notifications(actor: &CurrentUser) -> bool {
    actor.role.is_staff()
}

/// Routes are mutated by an admin or their owning operator.
pub fn can_manage_route(actor: &CurrentUser, route: &RouteDBResponse) -> bool {
    actor.role == Role::Admin || (actor.role == Role::Operator && route.operator_id == actor.id)
}

/// Schools are mutated by an admin or their owning operator. Schools without
/// an operator are admin-only.
pub fn can_manage_school(actor: &CurrentUser, school: &SchoolDBResponse) -> bool {
    actor.role == Role::Admin || (actor.role == Role::Operator && school.operator_id == Some(actor.id))
}

pub fn require_admin(actor: &CurrentUser, resource: &str) -> Result<()> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(Error::InsufficientScope {
            action: "manage".to_string(),
            resource: resource.to_string(),
        })
    }
}

pub fn require_staff(actor: &CurrentUser, action: &str, resource: &str) -> Result<()> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(Error::InsufficientScope {
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::routes::RouteStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn actor(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "actor@example.com".to_string(),
            first_name: "Actor".to_string(),
            last_name: "Test".to_string(),
            phone: None,
            role,
        }
    }

    fn student_of(parent_id: Uuid) -> StudentDBResponse {
        StudentDBResponse {
            id: Uuid::new_v4(),
            first_name: "Kayla".to_string(),
            last_name: "Brown".to_string(),
            date_of_birth: None,
            grade: None,
            school_name: None,
            school_id: None,
            parent_id,
            route_id: None,
            card_id: Some("ABCD1234".to_string()),
            pickup_address: None,
            pickup_latitude: None,
            pickup_longitude: None,
            dropoff_address: None,
            dropoff_latitude: None,
            dropoff_longitude: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn route_of(operator_id: Uuid) -> RouteDBResponse {
        RouteDBResponse {
            id: Uuid::new_v4(),
            name: "North".to_string(),
            description: None,
            bus_id: None,
            operator_id,
            start_location: None,
            end_location: None,
            start_latitude: None,
            start_longitude: None,
            end_latitude: None,
            end_longitude: None,
            scheduled_start_time: None,
            scheduled_end_time: None,
            days_of_week: None,
            status: RouteStatus::Active,
            is_morning_route: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parents_see_only_their_own_children() {
        let parent = actor(Role::Parent);
        assert!(can_view_student(&parent, &student_of(parent.id)));
        assert!(!can_view_student(&parent, &student_of(Uuid::new_v4())));
    }

    #[test]
    fn staff_see_any_student() {
        let someone_elses = student_of(Uuid::new_v4());
        assert!(can_view_student(&actor(Role::Operator), &someone_elses));
        assert!(can_view_student(&actor(Role::Admin), &someone_elses));
    }

    #[test]
    fn boarding_verification_is_route_scoped_for_operators() {
        let operator = actor(Role::Operator);
        assert!(can_verify_boarding(&operator, &route_of(operator.id)));
        assert!(!can_verify_boarding(&operator, &route_of(Uuid::new_v4())));
        // Admins verify on any route, parents on none
        assert!(can_verify_boarding(&actor(Role::Admin), &route_of(Uuid::new_v4())));
        assert!(!can_verify_boarding(&actor(Role::Parent), &route_of(Uuid::new_v4())));
    }

    #[test]
    fn route_and_school_management_respects_ownership() {
        let operator = actor(Role::Operator);
        assert!(can_manage_route(&operator, &route_of(operator.id)));
        assert!(!can_manage_route(&operator, &route_of(Uuid::new_v4())));

        let mut school = SchoolDBResponse {
            id: Uuid::new_v4(),
            name: "Belair High".to_string(),
            address: None,
            city: "Mandeville".to_string(),
            parish: "Manchester".to_string(),
            phone: None,
            email: None,
            operator_id: Some(operator.id),
            is_active: true,
            student_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(can_manage_school(&operator, &school));

        school.operator_id = None;
        assert!(!can_manage_school(&operator, &school));
        assert!(can_manage_school(&actor(Role::Admin), &school));
    }

    #[test]
    fn parents_cannot_broadcast() {
        assert!(!can_send_notifications(&actor(Role::Parent)));
        assert!(can_send_notifications(&actor(Role::Operator)));
        assert!(can_send_notifications(&actor(Role::Admin)));
    }

    #[test]
    fn require_admin_rejects_operators() {
        assert!(require_admin(&actor(Role::Admin), "users").is_ok());
        let err = require_admin(&actor(Role::Operator), "users").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
