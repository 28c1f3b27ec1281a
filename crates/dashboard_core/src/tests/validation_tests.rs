use super::*;

#[test]
fn blank_number_is_required_not_zero() {
    let mut checks = FieldChecks::default();

    assert_eq!(checks.required_number::<i32>("level", "   "), None);

    let errors = checks.into_errors();
    assert_eq!(errors.get("level"), Some(&FieldError::Required));
}

#[test]
fn non_numeric_input_is_invalid() {
    let mut checks = FieldChecks::default();

    assert_eq!(checks.required_number::<u64>("idr_amount", "NaN"), None);
    assert_eq!(checks.required_number::<u64>("other", "-5"), None);

    let errors = checks.into_errors();
    assert!(matches!(errors.get("idr_amount"), Some(FieldError::Invalid(_))));
    assert!(matches!(errors.get("other"), Some(FieldError::Invalid(_))));
}

#[test]
fn text_is_trimmed_and_dates_are_parsed() {
    let mut checks = FieldChecks::default();

    assert_eq!(checks.required_text("name", "  Treasurer "), Some("Treasurer".into()));
    assert_eq!(
        checks.required_date("start_date", "2022-01-02"),
        NaiveDate::from_ymd_opt(2022, 1, 2)
    );
    assert_eq!(checks.optional_text("   "), None);
    assert!(checks.finish().is_ok());
}

#[test]
fn first_error_per_field_wins_and_display_lists_fields() {
    let mut checks = FieldChecks::default();
    checks.required_date("end_date", "02/01/2022");
    checks.reject("end_date", "must not be before the start date");
    checks.required_choice::<u8>("type", None);

    let errors = checks.finish().expect_err("errors");

    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors.to_string(),
        "end_date must be a YYYY-MM-DD date, type is required"
    );
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["end_date", "type"]);
}

#[test]
fn amounts_keep_their_cents() {
    let mut checks = FieldChecks::default();

    assert_eq!(checks.required_amount("a", "150000.75"), Some("150000.75".into()));
    assert_eq!(checks.required_amount("b", " 0150000 "), Some("150000.00".into()));
    assert_eq!(checks.required_amount("c", "12.5"), Some("12.50".into()));
    assert!(checks.finish().is_ok());
}

#[test]
fn malformed_amounts_are_invalid() {
    let mut checks = FieldChecks::default();

    for (field, raw) in [("a", "1.234"), ("b", "-5"), ("c", "12."), ("d", ".5"), ("e", "1,5")] {
        assert_eq!(checks.required_amount(field, raw), None, "{raw}");
    }
    assert_eq!(checks.required_amount("f", "  "), None);

    let errors = checks.into_errors();
    assert_eq!(errors.len(), 6);
    assert_eq!(errors.get("f"), Some(&FieldError::Required));
    assert!(matches!(errors.get("a"), Some(FieldError::Invalid(_))));
}
