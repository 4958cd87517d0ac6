use assert_matches::assert_matches;
use fitdesk::auth::{extract_bearer_token, AuthError, JwtService, TokenSubject, TokenType, UserRole};
use uuid::Uuid;

use crate::common::TEST_JWT_SECRET;

fn subject(user_id: Uuid, tenant_id: Option<Uuid>, role: UserRole) -> TokenSubject<'static> {
    TokenSubject {
        user_id,
        email: "coach@irongym.dev",
        role,
        tenant_id,
    }
}

#[test]
fn test_access_token_carries_tenant_and_role() {
    let jwt = JwtService::new(TEST_JWT_SECRET);
    let user_id = Uuid::new_v4();
    let tenant_id = Uuid::new_v4();

    let token = jwt.create_access_token(subject(user_id, Some(tenant_id), UserRole::Trainer)).unwrap();
    let session = jwt.extract_user_session(&token).unwrap();

    assert_eq!(session.user_id, user_id);
    assert_eq!(session.tenant_id, Some(tenant_id));
    assert_eq!(session.role, UserRole::Trainer);
    assert!(session.role.is_staff());
}

#[test]
fn test_super_admin_has_no_tenant() {
    let jwt = JwtService::new(TEST_JWT_SECRET);
    let token = jwt.create_access_token(subject(Uuid::new_v4(), None, UserRole::SuperAdmin)).unwrap();

    let session = jwt.extract_user_session(&token).unwrap();
    assert!(session.is_super_admin());
    assert_matches!(session.tenant_id(), Err(AuthError::InsufficientPermissions));
}

#[test]
fn test_refresh_token_is_not_a_session() {
    let jwt = JwtService::new(TEST_JWT_SECRET);
    let (access, refresh) = jwt
        .create_token_pair(subject(Uuid::new_v4(), Some(Uuid::new_v4()), UserRole::Student))
        .unwrap();

    assert_eq!(jwt.validate_token(&refresh).unwrap().typ, TokenType::Refresh);
    assert_matches!(jwt.extract_user_session(&refresh), Err(AuthError::InvalidToken));
    assert!(jwt.extract_user_session(&access).is_ok());
}

#[test]
fn test_foreign_signature_rejected() {
    let token = JwtService::new("another-secret-entirely-different")
        .create_access_token(subject(Uuid::new_v4(), Some(Uuid::new_v4()), UserRole::Admin))
        .unwrap();

    assert_matches!(
        JwtService::new(TEST_JWT_SECRET).extract_user_session(&token),
        Err(AuthError::InvalidToken)
    );
}

#[test]
fn test_bearer_header_parsing() {
    assert_eq!(extract_bearer_token("Bearer abc.def").unwrap(), "abc.def");
    assert!(extract_bearer_token("Basic abc").is_err());
    assert!(extract_bearer_token("Bearer ").is_err());
}
