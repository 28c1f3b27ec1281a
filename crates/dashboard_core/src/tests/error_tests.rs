use super::*;

#[test]
fn api_code_overrides_status_classification() {
    let expired = TransportError::from_status(
        400,
        Some(ApiError::new(ErrorCode::Unauthorized, "session expired")),
    );
    assert_eq!(expired.kind(), TransportErrorKind::Unauthorized);
    assert!(expired.requires_reauth());
    assert_eq!(expired.message(), "session expired");
    assert_eq!(expired.status(), Some(400));

    let missing = TransportError::from_status(
        500,
        Some(ApiError::new(ErrorCode::NotFound, "period 4 not found")),
    );
    assert_eq!(missing.kind(), TransportErrorKind::NotFound);

    let throttled = TransportError::from_status(
        503,
        Some(ApiError::new(ErrorCode::RateLimited, "slow down")),
    );
    assert_eq!(throttled.kind(), TransportErrorKind::Rejected);

    let crashed = TransportError::from_status(
        422,
        Some(ApiError::new(ErrorCode::Internal, "database unavailable")),
    );
    assert_eq!(crashed.kind(), TransportErrorKind::Server);
}

#[test]
fn status_decides_when_body_has_no_code() {
    let body = ApiError {
        code: None,
        message: "  ".into(),
    };

    let forbidden = TransportError::from_status(403, Some(body));
    assert_eq!(forbidden.kind(), TransportErrorKind::Unauthorized);
    assert_eq!(forbidden.message(), "request failed with status 403");

    assert_eq!(
        TransportError::from_status(409, None).kind(),
        TransportErrorKind::Rejected
    );
    assert_eq!(
        TransportError::from_status(502, None).kind(),
        TransportErrorKind::Server
    );
}
