//! Decision engine against the `SQLite` allow-list and real header blocks.

use aliasguard_core::{
    AliasCodec, AllowListRepository, Classification, DecisionEngine, Error, SharedKey,
};
use aliasguard_mime::HeaderExtractor;

const KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ALIAS: &str = "other-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@test.com";
const FORGED: &str = "otger-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@test.com";

fn raw_message(to: &str, from: &str, verdict: &str, protocol: &str) -> String {
    format!(
        "Received: from mx.other.com by mx.test.com with {protocol} id 9 for <{to}>;\n \
         Tue, 27 Sep 2022 10:00:00 +0000\n\
         Authentication-Results: mx.test.com;\n \
         dkim={verdict} header.d=other.com; spf={verdict} smtp.mailfrom=other.com;\n \
         dmarc={verdict} header.from=other.com\n\
         From: <{from}>\n\
         To: Someone <someone@elsewhere.example>, <{to}>\n\
         \n"
    )
}

async fn engine() -> DecisionEngine<AllowListRepository> {
    let codec = AliasCodec::new(SharedKey::from_secret(KEY).unwrap(), "test.com");
    DecisionEngine::new(codec, AllowListRepository::in_memory().await.unwrap())
}

async fn classify(engine: &DecisionEngine<AllowListRepository>, raw: &str) -> Classification {
    let headers = HeaderExtractor::new(["test.com"]).extract(raw);
    engine.decide(&headers).await
}

#[tokio::test]
async fn authenticated_mail_to_genuine_alias_is_verified() {
    let engine = engine().await;
    let raw = raw_message(ALIAS, "news@other.com", "pass", "ESMTPS");
    assert_eq!(classify(&engine, &raw).await, Classification::Verified);
}

#[tokio::test]
async fn forged_alias_fails_even_when_authenticated() {
    let engine = engine().await;
    let raw = raw_message(FORGED, "news@other.com", "pass", "ESMTPS");
    assert_eq!(classify(&engine, &raw).await, Classification::FailedValidation);
}

#[tokio::test]
async fn plaintext_hop_only_fails() {
    let engine = engine().await;
    let raw = raw_message(ALIAS, "news@other.com", "pass", "ESMTP");
    assert_eq!(classify(&engine, &raw).await, Classification::FailedValidation);
}

#[tokio::test]
async fn allowed_subdomain_overrides_failed_checks() {
    let engine = engine().await;
    let repo = AllowListRepository::in_memory().await.unwrap();
    repo.register(FORGED, "other.com").await.unwrap();
    let codec = AliasCodec::new(SharedKey::from_secret(KEY).unwrap(), "test.com");
    let allowed = DecisionEngine::new(codec, repo);

    let raw = raw_message(FORGED, "news@mail.other.com", "fail", "SMTP");
    assert_eq!(classify(&allowed, &raw).await, Classification::Verified);
    assert_eq!(classify(&engine, &raw).await, Classification::FailedValidation);

    let too_deep = raw_message(FORGED, "news@a.b.c.d.other.com", "fail", "SMTP");
    assert_eq!(
        classify(&allowed, &too_deep).await,
        Classification::FailedValidation
    );
}

#[tokio::test]
async fn allow_list_matches_alias_domain_in_any_case() {
    let repo = AllowListRepository::in_memory().await.unwrap();
    repo.register(FORGED, "other.com").await.unwrap();
    let codec = AliasCodec::new(SharedKey::from_secret(KEY).unwrap(), "test.com");
    let engine = DecisionEngine::new(codec, repo);

    let shouted = FORGED.replace("@test.com", "@TEST.com");
    let raw = raw_message(&shouted, "news@other.com", "fail", "SMTP");
    assert_eq!(classify(&engine, &raw).await, Classification::Verified);

    let lowered_local = FORGED.to_lowercase();
    let raw = raw_message(&lowered_local, "news@other.com", "fail", "SMTP");
    assert_eq!(classify(&engine, &raw).await, Classification::FailedValidation);
}

#[tokio::test]
async fn domain_can_only_be_allowed_once() {
    let repo = AllowListRepository::in_memory().await.unwrap();
    repo.register(ALIAS, "other.com").await.unwrap();

    let err = repo.register(FORGED, "Other.com").await.unwrap_err();
    assert!(matches!(
        err,
        Error::DomainAlreadyRegistered { ref owner, .. } if owner == ALIAS
    ));
    assert_eq!(err.to_string(), format!("Domain other.com is already allowed for {ALIAS}"));
}

#[tokio::test]
async fn allow_list_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allow.db");
    let path = path.to_str().unwrap();

    {
        let repo = AllowListRepository::new(path).await.unwrap();
        repo.register(ALIAS, "other.com").await.unwrap();
    }

    let reopened = AllowListRepository::new(path).await.unwrap();
    assert_eq!(
        reopened.owner_of("other.com").await.unwrap().as_deref(),
        Some(ALIAS)
    );
}
