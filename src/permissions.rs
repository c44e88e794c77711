use axum::http::Method;

use crate::{auth::AuthUser, error::ApiError};

/// Whether a request reads or mutates the resource it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl From<&Method> for Access {
    fn from(method: &Method) -> Self {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            Access::Read
        } else {
            Access::Write
        }
    }
}

/// Object-level rule for user accounts: anyone may read an account, only the account itself
/// may change or delete it.
///
/// An anonymous write is `NotAuthenticated` (401), a write by another identity is
/// `PermissionDenied` (403).
pub fn ensure_account_owner(
    requester: Option<&AuthUser>,
    account_id: i64,
    access: Access,
) -> Result<(), ApiError> {
    match (access, requester) {
        (Access::Read, _) => Ok(()),
        (Access::Write, None) => Err(ApiError::NotAuthenticated),
        (Access::Write, Some(user)) if user.id == account_id => Ok(()),
        (Access::Write, Some(user)) => {
            tracing::info!(
                requester = user.id,
                account_id,
                "denied write on another user's account"
            );
            Err(ApiError::PermissionDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
        }
    }

    #[test]
    fn safe_methods_are_reads() {
        assert_eq!(Access::from(&Method::GET), Access::Read);
        assert_eq!(Access::from(&Method::HEAD), Access::Read);
        assert_eq!(Access::from(&Method::OPTIONS), Access::Read);
        assert_eq!(Access::from(&Method::PATCH), Access::Write);
        assert_eq!(Access::from(&Method::PUT), Access::Write);
        assert_eq!(Access::from(&Method::DELETE), Access::Write);
    }

    #[test]
    fn anyone_may_read() {
        assert!(ensure_account_owner(None, 1, Access::Read).is_ok());
        assert!(ensure_account_owner(Some(&user(2)), 1, Access::Read).is_ok());
    }

    #[test]
    fn only_the_account_itself_may_write() {
        assert!(ensure_account_owner(Some(&user(1)), 1, Access::Write).is_ok());
        assert!(matches!(
            ensure_account_owner(Some(&user(2)), 1, Access::Write),
            Err(ApiError::PermissionDenied)
        ));
        assert!(matches!(
            ensure_account_owner(None, 1, Access::Write),
            Err(ApiError::NotAuthenticated)
        ));
    }
}
