use chrono::{Duration, Utc};

use codedrop_download::domain::types::{GRACE_WINDOW_SECS, MAX_ATTEMPTS};
use codedrop_download::usecase::redeem::{
    RedeemCodeInput, RedeemCodeUseCase, Redeemed, RefusalReason,
};

use crate::helpers::{MockCodeRepo, fresh_code, test_signer};

fn usecase(repo: MockCodeRepo) -> RedeemCodeUseCase<MockCodeRepo> {
    RedeemCodeUseCase {
        codes: repo,
        signer: test_signer(),
        link_ttl: Duration::seconds(1),
    }
}

fn input(code: &str, ip: &str) -> RedeemCodeInput {
    RedeemCodeInput {
        code: code.to_owned(),
        requester_ip: ip.to_owned(),
    }
}

#[tokio::test]
async fn should_grant_first_redemption_and_bind_address() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let codes_handle = repo.codes_handle();
    let uc = usecase(repo);

    let redeemed = uc.execute(input("ABC234", "1.2.3.4"), Utc::now()).await.unwrap();
    assert!(
        matches!(redeemed, Redeemed::Granted(_)),
        "expected Granted, got {redeemed:?}"
    );

    let codes = codes_handle.lock().unwrap();
    let record = &codes[0];
    assert!(record.is_used);
    assert_eq!(record.used_ip.as_deref(), Some("1.2.3.4"));
    assert!(record.used_at.is_some());
    assert_eq!(record.attempts, 1);
}

#[tokio::test]
async fn should_issue_verifiable_link_on_grant() {
    let uc = usecase(MockCodeRepo::new(vec![fresh_code("ABC234")]));
    let now = Utc::now();

    let redeemed = uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap();
    let Redeemed::Granted(link) = redeemed else {
        panic!("expected Granted");
    };

    assert!(test_signer().verify("ABC234", link.expires, &link.token, &link.signature));
    assert_eq!(link.expires, (now + Duration::seconds(1)).timestamp());
}

#[tokio::test]
async fn should_refuse_unknown_code_as_invalid() {
    let uc = usecase(MockCodeRepo::empty());

    let redeemed = uc.execute(input("NOPE42", "1.2.3.4"), Utc::now()).await.unwrap();
    assert!(
        matches!(redeemed, Redeemed::Refused(RefusalReason::Invalid)),
        "expected Invalid, got {redeemed:?}"
    );
}

#[tokio::test]
async fn should_refuse_blank_submission_as_invalid() {
    let uc = usecase(MockCodeRepo::new(vec![fresh_code("ABC234")]));

    let redeemed = uc.execute(input("   ", "1.2.3.4"), Utc::now()).await.unwrap();
    assert!(matches!(redeemed, Redeemed::Refused(RefusalReason::Invalid)));
}

#[tokio::test]
async fn should_trim_surrounding_whitespace_before_lookup() {
    let uc = usecase(MockCodeRepo::new(vec![fresh_code("ABC234")]));

    let redeemed = uc
        .execute(input("  ABC234  ", "1.2.3.4"), Utc::now())
        .await
        .unwrap();
    assert!(matches!(redeemed, Redeemed::Granted(_)));
}

#[tokio::test]
async fn should_grant_same_address_retry_within_grace_window() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let codes_handle = repo.codes_handle();
    let uc = usecase(repo);
    let now = Utc::now();

    uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap();
    let redeemed = uc
        .execute(input("ABC234", "1.2.3.4"), now + Duration::minutes(5))
        .await
        .unwrap();

    assert!(matches!(redeemed, Redeemed::Granted(_)));
    assert_eq!(codes_handle.lock().unwrap()[0].attempts, 2);
}

#[tokio::test]
async fn should_cap_rapid_retries_at_max_attempts() {
    // 4 rapid submissions from one address: 3 grants, then the cap.
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let codes_handle = repo.codes_handle();
    let uc = usecase(repo);
    let now = Utc::now();

    for attempt in 1..=MAX_ATTEMPTS {
        let redeemed = uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap();
        assert!(
            matches!(redeemed, Redeemed::Granted(_)),
            "attempt {attempt} should be granted"
        );
    }

    let redeemed = uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap();
    assert!(
        matches!(redeemed, Redeemed::Refused(RefusalReason::MaxAttempts)),
        "expected MaxAttempts, got {redeemed:?}"
    );
    // The refused attempt must not mutate the record.
    assert_eq!(codes_handle.lock().unwrap()[0].attempts, MAX_ATTEMPTS);
}

#[tokio::test]
async fn should_refuse_other_address_as_already_used() {
    // Scenario: redeemed from 1.2.3.4, replayed from 9.9.9.9.
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let codes_handle = repo.codes_handle();
    let uc = usecase(repo);
    let now = Utc::now();

    uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap();
    let redeemed = uc.execute(input("ABC234", "9.9.9.9"), now).await.unwrap();

    assert!(
        matches!(redeemed, Redeemed::Refused(RefusalReason::AlreadyUsed)),
        "expected AlreadyUsed, got {redeemed:?}"
    );

    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes[0].attempts, 1, "replay must not mutate the record");
    assert_eq!(codes[0].used_ip.as_deref(), Some("1.2.3.4"));
}

#[tokio::test]
async fn should_refuse_same_address_after_grace_window() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let codes_handle = repo.codes_handle();
    let uc = usecase(repo);
    let now = Utc::now();

    uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap();
    let later = now + Duration::seconds(GRACE_WINDOW_SECS + 1);
    let redeemed = uc.execute(input("ABC234", "1.2.3.4"), later).await.unwrap();

    assert!(
        matches!(redeemed, Redeemed::Refused(RefusalReason::AlreadyUsed)),
        "expected AlreadyUsed, got {redeemed:?}"
    );
    assert_eq!(codes_handle.lock().unwrap()[0].attempts, 1);
}

#[tokio::test]
async fn should_serialize_concurrent_first_redemptions() {
    // Two tasks race the same fresh code; exactly one may take first use,
    // the other lands in the grace path (same address) with attempts = 2.
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let codes_handle = repo.codes_handle();
    let now = Utc::now();

    let a = {
        let uc = usecase(repo.clone());
        tokio::spawn(async move { uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap() })
    };
    let b = {
        let uc = usecase(repo);
        tokio::spawn(async move { uc.execute(input("ABC234", "1.2.3.4"), now).await.unwrap() })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(matches!(a, Redeemed::Granted(_)));
    assert!(matches!(b, Redeemed::Granted(_)));
    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes[0].attempts, 2, "exactly one first use, one retry");
    assert_eq!(codes[0].used_ip.as_deref(), Some("1.2.3.4"));
}
