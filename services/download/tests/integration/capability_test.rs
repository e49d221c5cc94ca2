use chrono::{Duration, Utc};

use codedrop_download::error::DownloadServiceError;
use codedrop_download::usecase::link::{FetchDownloadInput, FetchDownloadUseCase, IssuedLink};
use codedrop_download::usecase::redeem::{RedeemCodeInput, RedeemCodeUseCase, Redeemed};

use crate::helpers::{MockCodeRepo, fresh_code, test_signer};

async fn redeem(repo: &MockCodeRepo, code: &str, ip: &str, now: chrono::DateTime<Utc>) -> IssuedLink {
    let uc = RedeemCodeUseCase {
        codes: repo.clone(),
        signer: test_signer(),
        link_ttl: Duration::seconds(1),
    };
    let redeemed = uc
        .execute(
            RedeemCodeInput {
                code: code.to_owned(),
                requester_ip: ip.to_owned(),
            },
            now,
        )
        .await
        .unwrap();
    match redeemed {
        Redeemed::Granted(link) => link,
        other => panic!("expected Granted, got {other:?}"),
    }
}

fn fetch_usecase(repo: &MockCodeRepo) -> FetchDownloadUseCase<MockCodeRepo> {
    FetchDownloadUseCase {
        codes: repo.clone(),
        signer: test_signer(),
    }
}

fn fetch_input(link: &IssuedLink, ip: &str) -> FetchDownloadInput {
    FetchDownloadInput {
        token: link.token.clone(),
        expires: link.expires,
        signature: link.signature.clone(),
        requester_ip: ip.to_owned(),
    }
}

#[tokio::test]
async fn should_grant_immediate_fetch_from_redeeming_address() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let now = Utc::now();
    let link = redeem(&repo, "ABC234", "1.2.3.4", now).await;

    fetch_usecase(&repo)
        .execute(fetch_input(&link, "1.2.3.4"), now)
        .await
        .unwrap();
}

#[tokio::test]
async fn should_reject_fetch_after_ttl_even_with_valid_signature() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let now = Utc::now();
    let link = redeem(&repo, "ABC234", "1.2.3.4", now).await;

    // 1-second TTL, fetched 2 seconds later. Signature is untouched.
    let result = fetch_usecase(&repo)
        .execute(fetch_input(&link, "1.2.3.4"), now + Duration::seconds(2))
        .await;
    assert!(
        matches!(result, Err(DownloadServiceError::LinkExpired)),
        "expected LinkExpired, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_fetch_from_address_with_no_recent_redemption() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let now = Utc::now();
    let link = redeem(&repo, "ABC234", "1.2.3.4", now).await;

    // The link leaked to another address; that address never redeemed.
    let result = fetch_usecase(&repo)
        .execute(fetch_input(&link, "9.9.9.9"), now)
        .await;
    assert!(
        matches!(result, Err(DownloadServiceError::AccessDenied)),
        "expected AccessDenied, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_tampered_signature() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let now = Utc::now();
    let link = redeem(&repo, "ABC234", "1.2.3.4", now).await;

    let mut input = fetch_input(&link, "1.2.3.4");
    // Flip one nibble of the hex signature.
    let mut sig = input.signature.into_bytes();
    sig[0] = if sig[0] == b'0' { b'1' } else { b'0' };
    input.signature = String::from_utf8(sig).unwrap();

    let result = fetch_usecase(&repo).execute(input, now).await;
    assert!(
        matches!(result, Err(DownloadServiceError::AccessDenied)),
        "expected AccessDenied, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_stale_link_after_newer_redemption_from_same_address() {
    // The capability binds to the most recent redemption by the address:
    // redeeming a second code invalidates the first link's signature check.
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234"), fresh_code("XYZ789")]);
    let now = Utc::now();
    let first_link = redeem(&repo, "ABC234", "1.2.3.4", now).await;
    let _second_link = redeem(&repo, "XYZ789", "1.2.3.4", now + Duration::seconds(1)).await;

    let result = fetch_usecase(&repo)
        .execute(fetch_input(&first_link, "1.2.3.4"), now)
        .await;
    assert!(
        matches!(result, Err(DownloadServiceError::AccessDenied)),
        "expected AccessDenied, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_fetch_when_redemption_is_outside_grace_window() {
    let repo = MockCodeRepo::new(vec![fresh_code("ABC234")]);
    let now = Utc::now();
    let link = redeem(&repo, "ABC234", "1.2.3.4", now).await;

    // A forged far-future expiry does not help once the redemption record
    // has aged out of the capability window.
    let later = now + Duration::minutes(16);
    let mut input = fetch_input(&link, "1.2.3.4");
    input.expires = later.timestamp() + 60;

    let result = fetch_usecase(&repo).execute(input, later).await;
    assert!(
        matches!(result, Err(DownloadServiceError::AccessDenied)),
        "expected AccessDenied, got {result:?}"
    );
}
