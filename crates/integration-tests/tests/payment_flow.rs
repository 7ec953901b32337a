//! Payment step: charge, step-up authentication and the thank-you page.
//!
//! Run with: cargo test -p wagwell-integration-tests --test payment_flow

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use wagwell_core::{CheckoutStep, PaymentIntentId, PaymentMethodId};
use wagwell_integration_tests::{
    ChargeStep, FakeCommerce, FakeGateway, FakeHosted, information_form, one_time_line,
    payment_form, ready_cart, session,
};
use wagwell_storefront::checkout::payment::thank_you_url;
use wagwell_storefront::checkout::{
    CheckoutError, CheckoutSync, InformationStep, PaymentOutcome, PaymentStep, SyncOutcome,
    thank_you,
};
use wagwell_storefront::commerce::{ChargeInput, UserError};
use wagwell_storefront::models::Cart;

/// A cart whose custom checkout has passed the information step.
async fn cart_at_payment(commerce: &FakeCommerce) -> Cart {
    let hosted = FakeHosted::default();
    let mut cart = ready_cart(vec![one_time_line("v1")]);
    let outcome = CheckoutSync::new(commerce, &hosted, false)
        .load(&mut cart, CheckoutStep::Information)
        .await;
    assert!(matches!(outcome, SyncOutcome::Synced(_)));

    InformationStep::new(commerce)
        .submit(&mut cart, information_form())
        .await
        .unwrap();
    cart
}

#[tokio::test]
async fn successful_payment_redirects_to_thank_you() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();
    let session = session();
    let mut cart = cart_at_payment(&commerce).await;
    let id = cart.custom_checkout_id().cloned().unwrap();

    let outcome = PaymentStep::new(&commerce, &gateway)
        .submit(&mut cart, &session, payment_form())
        .await
        .unwrap();

    let PaymentOutcome::Paid { checkout, redirect } = outcome else {
        panic!("expected a paid checkout, got {outcome:?}");
    };
    assert_eq!(redirect, thank_you_url(&id));
    assert!(checkout.is_completed());
    assert_eq!(cart.completed_checkout_id, Some(id));
    assert_eq!(
        commerce.charges(),
        vec![ChargeInput::PaymentMethodId(PaymentMethodId::new("pm_1"))]
    );
    assert_eq!(gateway.payment_methods()[0].card_token, "tok_visa");
    assert!(gateway.card_actions().is_empty());
}

#[tokio::test]
async fn update_user_errors_block_the_charge() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();
    let mut cart = cart_at_payment(&commerce).await;
    commerce.fail_next_update(vec![UserError::new(
        &["input", "billingAddress", "zip"],
        "Zip is invalid",
    )]);

    let err = PaymentStep::new(&commerce, &gateway)
        .submit(&mut cart, &session(), payment_form())
        .await
        .unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected field errors, got {err:?}");
    };
    assert_eq!(errors.get("billing_zip"), Some("Zip is invalid"));
    assert!(commerce.charges().is_empty());
    assert!(cart.completed_checkout_id.is_none());
}

#[tokio::test]
async fn declined_card_is_a_card_field_error() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::declining("Your card was declined.");
    let mut cart = cart_at_payment(&commerce).await;

    let err = PaymentStep::new(&commerce, &gateway)
        .submit(&mut cart, &session(), payment_form())
        .await
        .unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected field errors, got {err:?}");
    };
    assert_eq!(errors.get("card"), Some("Your card was declined."));
    assert!(commerce.charges().is_empty());
}

#[tokio::test]
async fn blank_card_token_sends_nothing() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();
    let mut cart = cart_at_payment(&commerce).await;
    let mutations = commerce.mutation_count();

    let mut form = payment_form();
    form.card_token = "  ".to_string();
    let err = PaymentStep::new(&commerce, &gateway)
        .submit(&mut cart, &session(), form)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Validation(_)));
    assert!(gateway.payment_methods().is_empty());
    assert_eq!(commerce.mutation_count(), mutations);
}

/// Submit the payment form and expect the charge to ask for step-up.
async fn submit_to_challenge(
    commerce: &FakeCommerce,
    gateway: &FakeGateway,
    cart: &mut Cart,
) -> String {
    let outcome = PaymentStep::new(commerce, gateway)
        .submit(cart, &session(), payment_form())
        .await
        .unwrap();
    let PaymentOutcome::RequiresAction { client_secret } = outcome else {
        panic!("expected a card challenge, got {outcome:?}");
    };
    client_secret
}

#[tokio::test]
async fn step_up_is_finished_by_the_continuation() {
    let commerce = FakeCommerce::new();
    commerce.script_charges([
        ChargeStep::RequireAction("pi_1_secret_a".to_string()),
        ChargeStep::Complete,
    ]);
    let gateway = FakeGateway::new();
    let session = session();
    let mut cart = cart_at_payment(&commerce).await;
    let id = cart.custom_checkout_id().cloned().unwrap();

    let client_secret = submit_to_challenge(&commerce, &gateway, &mut cart).await;

    // Nothing is checked until the browser has run the challenge.
    assert_eq!(client_secret, "pi_1_secret_a");
    assert!(gateway.card_actions().is_empty());
    assert!(cart.completed_checkout_id.is_none());
    assert_eq!(
        cart.pending_authentication.as_ref().map(|p| &p.payment_intent_id),
        Some(&PaymentIntentId::new("pi_1"))
    );

    let outcome = PaymentStep::new(&commerce, &gateway)
        .authenticate(&mut cart, &session, &PaymentIntentId::new("pi_1"))
        .await
        .unwrap();

    let PaymentOutcome::Paid { checkout, redirect } = outcome else {
        panic!("expected a paid checkout, got {outcome:?}");
    };
    assert!(checkout.is_completed());
    assert_eq!(redirect, thank_you_url(&id));
    assert_eq!(gateway.card_actions(), vec![PaymentIntentId::new("pi_1")]);
    assert_eq!(
        commerce.charges(),
        vec![
            ChargeInput::PaymentMethodId(PaymentMethodId::new("pm_1")),
            ChargeInput::PaymentIntentId(PaymentIntentId::new("pi_1")),
        ]
    );
    assert!(cart.pending_authentication.is_none());
    assert_eq!(cart.completed_checkout_id, Some(id.clone()));

    let confirmed = thank_you(&commerce, &mut cart, &session, &id).await.unwrap();
    assert!(confirmed.first_time_accessed);
}

#[tokio::test]
async fn second_step_up_is_a_contract_violation() {
    let commerce = FakeCommerce::new();
    commerce.script_charges([
        ChargeStep::RequireAction("pi_1_secret_a".to_string()),
        ChargeStep::RequireAction("pi_1_secret_b".to_string()),
    ]);
    let gateway = FakeGateway::new();
    let mut cart = cart_at_payment(&commerce).await;
    submit_to_challenge(&commerce, &gateway, &mut cart).await;

    let err = PaymentStep::new(&commerce, &gateway)
        .authenticate(&mut cart, &session(), &PaymentIntentId::new("pi_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::ContractViolation(_)), "got: {err:?}");
    assert_eq!(gateway.card_actions().len(), 1);
    assert_eq!(commerce.charges().len(), 2);
    assert!(cart.completed_checkout_id.is_none());
}

#[tokio::test]
async fn continuation_for_another_intent_is_rejected() {
    let commerce = FakeCommerce::new();
    commerce.script_charges([
        ChargeStep::RequireAction("pi_1_secret_a".to_string()),
        ChargeStep::Complete,
    ]);
    let gateway = FakeGateway::new();
    let mut cart = cart_at_payment(&commerce).await;
    submit_to_challenge(&commerce, &gateway, &mut cart).await;
    let step = PaymentStep::new(&commerce, &gateway);

    let err = step
        .authenticate(&mut cart, &session(), &PaymentIntentId::new("pi_other"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Rejected { .. }), "got: {err:?}");
    assert!(gateway.card_actions().is_empty());
    assert_eq!(commerce.charges().len(), 1);
    // The real intent can still finish.
    assert!(cart.pending_authentication.is_some());
    step.authenticate(&mut cart, &session(), &PaymentIntentId::new("pi_1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn continuation_without_a_challenge_is_rejected() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();
    let mut cart = cart_at_payment(&commerce).await;

    let err = PaymentStep::new(&commerce, &gateway)
        .authenticate(&mut cart, &session(), &PaymentIntentId::new("pi_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Rejected { .. }), "got: {err:?}");
    assert!(commerce.charges().is_empty());
}

#[tokio::test]
async fn failed_challenge_is_a_card_field_error() {
    let commerce = FakeCommerce::new();
    commerce.script_charges([ChargeStep::RequireAction("pi_1_secret_a".to_string())]);
    let gateway = FakeGateway::failing_challenges("Authentication failed.");
    let mut cart = cart_at_payment(&commerce).await;
    submit_to_challenge(&commerce, &gateway, &mut cart).await;

    let err = PaymentStep::new(&commerce, &gateway)
        .authenticate(&mut cart, &session(), &PaymentIntentId::new("pi_1"))
        .await
        .unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected field errors, got {err:?}");
    };
    assert_eq!(errors.get("card"), Some("Authentication failed."));
    assert_eq!(commerce.charges().len(), 1);
    assert!(cart.pending_authentication.is_none());
}

#[tokio::test]
async fn charge_user_errors_are_shown_on_the_form() {
    let commerce = FakeCommerce::new();
    commerce.script_charges([ChargeStep::UserError("Insufficient funds".to_string())]);
    let gateway = FakeGateway::new();
    let mut cart = cart_at_payment(&commerce).await;

    let err = PaymentStep::new(&commerce, &gateway)
        .submit(&mut cart, &session(), payment_form())
        .await
        .unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected field errors, got {err:?}");
    };
    assert_eq!(errors.form, vec!["Insufficient funds".to_string()]);
}

#[tokio::test]
async fn paid_checkout_is_not_charged_again() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();
    let session = session();
    let mut cart = cart_at_payment(&commerce).await;
    let step = PaymentStep::new(&commerce, &gateway);

    step.submit(&mut cart, &session, payment_form()).await.unwrap();
    let err = step
        .submit(&mut cart, &session, payment_form())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Rejected { .. }), "got: {err:?}");
    assert_eq!(commerce.charges().len(), 1);
}

#[tokio::test]
async fn thank_you_reports_first_access_once() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();
    let session = session();
    let mut cart = cart_at_payment(&commerce).await;
    let id = cart.custom_checkout_id().cloned().unwrap();

    PaymentStep::new(&commerce, &gateway)
        .submit(&mut cart, &session, payment_form())
        .await
        .unwrap();

    let first = thank_you(&commerce, &mut cart, &session, &id).await.unwrap();
    assert!(first.first_time_accessed);
    assert_eq!(first.checkout.order_name.as_deref(), Some("#1001"));
    assert!(cart.is_empty());
    assert!(cart.checkout.is_none());

    let again = thank_you(&commerce, &mut cart, &session, &id).await.unwrap();
    assert!(!again.first_time_accessed);
}

#[tokio::test]
async fn thank_you_for_unpaid_checkout_is_rejected() {
    let commerce = FakeCommerce::new();
    let mut cart = cart_at_payment(&commerce).await;
    let id = cart.custom_checkout_id().cloned().unwrap();

    let err = thank_you(&commerce, &mut cart, &session(), &id)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Rejected { .. }));
    assert_eq!(cart.lines.len(), 1);
}

#[tokio::test]
async fn thank_you_for_another_cart_checkout_is_rejected() {
    let commerce = FakeCommerce::new();
    let gateway = FakeGateway::new();

    // Someone else's paid checkout.
    let mut other = cart_at_payment(&commerce).await;
    let foreign = other.custom_checkout_id().cloned().unwrap();
    PaymentStep::new(&commerce, &gateway)
        .submit(&mut other, &session(), payment_form())
        .await
        .unwrap();

    let mut cart = cart_at_payment(&commerce).await;
    let own = cart.checkout.clone();
    let calls = commerce.calls().len();

    let err = thank_you(&commerce, &mut cart, &session(), &foreign)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Rejected { .. }), "got: {err:?}");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.checkout, own);
    assert_eq!(commerce.calls().len(), calls);
}
