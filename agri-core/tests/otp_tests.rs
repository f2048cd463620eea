mod common;

use std::time::Duration;

use agri_core::{validate_code, Focus, OtpInput, OtpPhase, OtpWorkflow, Status, OTP_LEN};
use proptest::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

proptest! {
    #[test]
    fn anything_but_six_digits_is_rejected(code in "\\PC*") {
        let valid = code.len() == 6 && code.chars().all(|c| c.is_ascii_digit());
        prop_assert_eq!(validate_code(&code).is_ok(), valid);
    }

    #[test]
    fn wrong_length_digit_strings_are_rejected(code in "[0-9]{0,12}") {
        prop_assume!(code.len() != 6);
        prop_assert!(validate_code(&code).is_err());
    }

    #[test]
    fn paste_fills_following_slots(
        (slot, pasted) in (0usize..OTP_LEN).prop_flat_map(|slot| {
            (Just(slot), proptest::string::string_regex(&format!("[0-9]{{1,{}}}", OTP_LEN - slot)).unwrap())
        })
    ) {
        let mut input = OtpInput::new();
        let focus = input.enter(slot, &pasted);
        let k = pasted.len();

        for (offset, ch) in pasted.chars().enumerate() {
            prop_assert_eq!(input.digits()[slot + offset], Some(ch));
        }
        for before in 0..slot {
            prop_assert_eq!(input.digits()[before], None);
        }
        if slot + k == OTP_LEN {
            prop_assert_eq!(focus, Focus::Blurred);
        } else {
            prop_assert_eq!(focus, Focus::Slot(slot + k));
        }
    }
}

#[test]
fn typing_digit_by_digit_builds_the_code() {
    let mut input = OtpInput::new();
    let mut focus = Focus::Slot(0);
    for ch in ["4", "8", "1", "5", "1", "6"] {
        let Focus::Slot(slot) = focus else {
            panic!("blurred too early");
        };
        focus = input.enter(slot, ch);
    }
    assert_eq!(focus, Focus::Blurred);
    assert!(input.is_complete());
    assert_eq!(input.code(), "481516");
}

#[test]
fn overlong_paste_is_truncated_and_non_digits_ignored() {
    let mut input = OtpInput::new();
    assert_eq!(input.enter(3, "9-8 7 6 5"), Focus::Blurred);
    assert_eq!(input.code(), "987");
    assert!(!input.is_complete());

    assert_eq!(input.enter(0, "x"), Focus::Slot(0));
    assert_eq!(input.digits()[0], None);
}

#[test]
fn backspace_moves_to_previous_slot() {
    let mut input = OtpInput::new();
    input.enter(0, "12");
    assert_eq!(input.backspace(2), Focus::Slot(1));
    assert_eq!(input.code(), "1");
    assert_eq!(input.backspace(1), Focus::Slot(0));
    assert_eq!(input.code(), "");
    input.enter(0, "123456");
    input.clear();
    assert_eq!(input.code(), "");
}

#[tokio::test]
async fn invalid_codes_never_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/42/otp/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    for code in ["", "12345", "1234567", "12a456", "١٢٣٤٥٦", " 12345"] {
        let err = otp.verify("42", code).await.unwrap_err();
        assert!(err.to_string().contains("6-digit"), "{code:?}");
    }
    let state = otp.state().await;
    assert!(!state.otp_verified);
    assert_eq!(state.verify_status, Status::Rejected);
}

async fn mount_generate(server: &MockServer, status_code: u16) {
    Mock::given(method("POST"))
        .and(path("/api/orders/42/otp/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "order_id": 42 },
            "message": "OTP sent to customer",
            "success": true
        })))
        .mount(server)
        .await;
    let status = if status_code == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "data": { "otp": "123456", "verified": false, "generated": true }
        }))
    } else {
        ResponseTemplate::new(status_code)
    };
    Mock::given(method("GET"))
        .and(path("/api/orders/42/otp/status"))
        .respond_with(status)
        .mount(server)
        .await;
}

#[tokio::test]
async fn generate_merges_best_effort_status() {
    let server = MockServer::start().await;
    mount_generate(&server, 200).await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    let generation = otp.generate("42").await.unwrap();
    assert!(generation.status.is_ok());

    let state = otp.state().await;
    assert_eq!(state.phase, OtpPhase::Generated);
    assert_eq!(state.message.as_deref(), Some("OTP sent to customer"));
    assert_eq!(state.displayed_otp().as_deref(), Some("123456"));
    assert_eq!(state.generate_status, Status::Fulfilled);
}

#[tokio::test]
async fn failed_status_lookup_does_not_fail_generate() {
    let server = MockServer::start().await;
    mount_generate(&server, 500).await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    let generation = otp.generate("42").await.unwrap();
    assert!(generation.status.is_err());

    let state = otp.state().await;
    assert_eq!(state.phase, OtpPhase::Generated);
    assert!(state.error.is_none());
    assert!(state.status_error.is_some());
    assert_eq!(state.lookup_status, Status::Rejected);
    assert!(state.displayed_otp().is_none());
}

#[tokio::test]
async fn verify_mismatch_keeps_generated_state_and_input() {
    let server = MockServer::start().await;
    mount_generate(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/orders/42/otp/verify"))
        .and(body_json(json!({ "otp": "654321" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Invalid OTP. Please try again.",
            "success": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    otp.generate("42").await.unwrap();

    let mut input = OtpInput::new();
    input.enter(0, "654321");
    let err = otp.verify_input("42", &input).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid OTP. Please try again.");
    let state = otp.state().await;
    assert!(!state.otp_verified);
    assert_eq!(state.phase, OtpPhase::Generated);
    assert_eq!(state.error.as_ref().map(ToString::to_string).as_deref(), Some("Invalid OTP. Please try again."));
    assert_eq!(input.code(), "654321");
}

#[tokio::test]
async fn verify_success_is_terminal() {
    let server = MockServer::start().await;
    mount_generate(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/orders/42/otp/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "verified": true },
            "message": "Delivery confirmed"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders/42/otp/resend"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    otp.generate("42").await.unwrap();
    otp.verify("42", "123456").await.unwrap();

    let state = otp.state().await;
    assert!(state.otp_verified);
    assert_eq!(state.phase, OtpPhase::Verified);
    assert!(otp.resend("42").await.is_err());
}

#[tokio::test]
async fn resend_only_changes_the_message() {
    let server = MockServer::start().await;
    mount_generate(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/orders/42/otp/resend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "message": "A new OTP has been sent"
        })))
        .mount(&server)
        .await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    otp.generate("42").await.unwrap();
    let before = otp.state().await;
    otp.resend("42").await.unwrap();
    let after = otp.state().await;

    assert_eq!(after.phase, OtpPhase::Generated);
    assert_eq!(after.message.as_deref(), Some("A new OTP has been sent"));
    assert_eq!(after.generated, before.generated);
    assert_eq!(after.resend_status, Status::Fulfilled);
}

async fn mount_slow_generate(server: &MockServer, order_id: &str, otp: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/api/orders/{order_id}/otp/generate")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "otp": otp }, "message": "OTP sent to customer" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{order_id}/otp/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "otp": otp, "verified": false, "generated": true }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn late_generate_for_previous_order_is_ignored() {
    let server = MockServer::start().await;
    mount_slow_generate(&server, "7", "111111").await;
    Mock::given(method("GET"))
        .and(path("/api/orders/8/otp/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "verified": false, "generated": false }
        })))
        .mount(&server)
        .await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    let pending = tokio::spawn({
        let otp = otp.clone();
        async move { otp.generate("7").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    otp.refresh_status("8").await.unwrap();

    // The caller of the superseded request still gets its own answer.
    let generation = pending.await.unwrap().unwrap();
    assert_eq!(generation.generated.data["otp"], "111111");

    let state = otp.state().await;
    assert_eq!(state.order_id.as_deref(), Some("8"));
    assert_eq!(state.phase, OtpPhase::NotGenerated);
    assert_eq!(state.generate_status, Status::Idle);
    assert_eq!(state.lookup_status, Status::Fulfilled);
    assert!(state.displayed_otp().is_none());
}

#[tokio::test]
async fn late_generate_after_reset_is_ignored() {
    let server = MockServer::start().await;
    mount_slow_generate(&server, "42", "333333").await;

    let otp = OtpWorkflow::new(common::dispatcher(&server).await);
    let pending = tokio::spawn({
        let otp = otp.clone();
        async move { otp.generate("42").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    otp.reset().await;
    pending.await.unwrap().unwrap();

    let state = otp.state().await;
    assert!(state.order_id.is_none());
    assert_eq!(state.phase, OtpPhase::NotGenerated);
    assert_eq!(state.generate_status, Status::Idle);
    assert!(state.generated.is_none());
    assert!(state.displayed_otp().is_none());
}

#[tokio::test]
async fn clearing_the_error_returns_rejected_calls_to_idle() {
    let server = MockServer::start().await;
    let otp = OtpWorkflow::new(common::dispatcher(&server).await);

    assert!(otp.verify("42", "12").await.is_err());
    assert_eq!(otp.state().await.verify_status, Status::Rejected);

    otp.clear_error().await;
    let state = otp.state().await;
    assert!(state.error.is_none());
    assert_eq!(state.verify_status, Status::Idle);
}
