//! Write-access check for mutating operations.
//!
//! Fine-grained repository permissions belong to an outer layer. Here an
//! actor may write when the account exists, is active, may log in, and is
//! not an organization.

use rusqlite::Connection;

use crate::error::{MetaError, Result};
use crate::model::User;
use crate::storage::directory;

/// Resolve `actor_id` and check it may modify `item_id`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown actor, `PermissionDenied` for an
/// account that may not write, or a database error.
pub fn require_writer(conn: &Connection, actor_id: i64, item_id: i64) -> Result<User> {
    let actor = directory::require_user(conn, actor_id)?;
    if !actor.is_active || actor.prohibit_login || actor.is_org {
        return Err(MetaError::PermissionDenied {
            actor: actor.name,
            item_id,
        });
    }
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn organizations_and_blocked_users_cannot_write() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        let org = directory::create_user(&conn, "acme", true).unwrap();
        let user = directory::create_user(&conn, "bob", false).unwrap();

        assert!(require_writer(&conn, user.id, 1).is_ok());
        assert!(matches!(
            require_writer(&conn, org.id, 1),
            Err(MetaError::PermissionDenied { .. })
        ));

        directory::set_user_status(&conn, user.id, true, true).unwrap();
        assert!(matches!(
            require_writer(&conn, user.id, 1),
            Err(MetaError::PermissionDenied { .. })
        ));
        assert!(matches!(
            require_writer(&conn, 999, 1),
            Err(MetaError::NotFound { .. })
        ));
    }
}
