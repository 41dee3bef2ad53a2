// security/src/identity.rs
// Staff accounts and patient records. Staff authenticate with email and
// password; patients are records managed by staff.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::task::{self, JoinHandle};
use tracing::{info, warn};

use lib::config::AuthConfig;
use lib::errors::{LabError, Result};
use lib::notifications::{dispatch_detached, Notification, Notifier};
use lib::storage_engine::{IdentityStorageEngine, LabStorageEngine};
use models::identifiers::RecordId;
use models::medical::{Identity, IdentityView, Role};

use crate::jwt::TokenIssuer;
use crate::password::{check_strength, hash_password, verify_password};
use crate::reset_token::{self, ResetToken};
use crate::roles::Access;
use crate::AuthError;

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub mobile: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: IdentityView,
}

#[derive(Clone)]
pub struct IdentityService {
    storage: Arc<dyn LabStorageEngine>,
    notifier: Arc<dyn Notifier>,
    tokens: TokenIssuer,
    reset_ttl: Duration,
    frontend_url: String,
}

impl IdentityService {
    pub fn new(
        storage: Arc<dyn LabStorageEngine>,
        notifier: Arc<dyn Notifier>,
        auth: &AuthConfig,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            notifier,
            tokens: TokenIssuer::new(&auth.jwt_secret, auth.token_ttl_hours),
            reset_ttl: Duration::minutes(auth.reset_token_ttl_minutes),
            frontend_url: frontend_url.into(),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    async fn hash(password: String) -> Result<String> {
        Ok(task::spawn_blocking(move || hash_password(&password)).await??)
    }

    pub async fn register(&self, input: Registration) -> Result<IdentityView> {
        if !input.role.is_staff() {
            return Err(LabError::InvalidInput("Role must be doctor or assistant".to_string()));
        }
        check_strength(&input.password)?;
        let password_hash = Self::hash(input.password).await?;
        let identity = Identity::new_staff(input.role, input.name, input.mobile, &input.email, password_hash)?;
        self.storage.add_identity(&identity).await?;
        info!(id = %identity.id(), role = %identity.role(), "Staff registered");
        Ok(identity.view())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let identity = self
            .storage
            .get_staff_by_email(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;
        let stored_hash = identity
            .staff()
            .map(|profile| profile.password_hash.clone())
            .ok_or(AuthError::InvalidCredentials)?;
        let candidate = password.to_string();
        let matches = task::spawn_blocking(move || verify_password(&candidate, &stored_hash)).await??;
        if !matches {
            warn!(id = %identity.id(), "Login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }
        let token = self.tokens.issue(&identity)?;
        info!(id = %identity.id(), "Login succeeded");
        Ok(Session { token, user: identity.view() })
    }

    /// Stores the digest of a fresh reset token and emails the raw token as a
    /// link. The email goes out on a detached task whose handle is returned; a
    /// failed send is logged and the stored token stays valid.
    pub async fn forgot_password(&self, email: &str) -> Result<JoinHandle<()>> {
        let identity = self
            .storage
            .get_staff_by_email(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;
        let token = ResetToken::generate();
        let expires_at = Utc::now() + self.reset_ttl;
        let updated = self
            .storage
            .update_identity(&identity.id(), &|record: &mut Identity| -> Result<()> {
                let profile = record.staff_mut().ok_or(AuthError::UnknownEmail)?;
                profile.reset_token_hash = Some(token.digest.clone());
                profile.reset_token_expires_at = Some(expires_at);
                record.touch();
                Ok(())
            })
            .await?;

        let link = format!(
            "{}/reset-password/{}",
            self.frontend_url.trim_end_matches('/'),
            token.raw
        );
        let body = format!(
            "Use the link below to reset your password:\n{}\nThe link expires in {} minutes.",
            link,
            self.reset_ttl.num_minutes()
        );
        let to = updated.email().unwrap_or(email).to_string();
        let sending = dispatch_detached(
            self.notifier.clone(),
            Notification::email(to, "Reset your password", body),
        );
        info!(id = %updated.id(), "Password reset requested");
        Ok(sending)
    }

    /// Consumes a reset token. The token is cleared on success, so it works once.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        check_strength(new_password)?;
        let digest = reset_token::digest(token.trim());
        let identity = self
            .storage
            .get_staff_by_reset_token(&digest)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;
        let password_hash = Self::hash(new_password.to_string()).await?;

        self.storage
            .update_identity(&identity.id(), &|record: &mut Identity| -> Result<()> {
                let profile = record.staff_mut().ok_or(AuthError::InvalidResetToken)?;
                let live = profile.reset_token_hash.as_deref() == Some(digest.as_str())
                    && profile.reset_token_expires_at.map_or(false, |at| at > Utc::now());
                if !live {
                    return Err(AuthError::InvalidResetToken.into());
                }
                profile.password_hash = password_hash.clone();
                profile.reset_token_hash = None;
                profile.reset_token_expires_at = None;
                record.touch();
                Ok(())
            })
            .await?;
        info!(id = %identity.id(), "Password reset");
        Ok(())
    }

    /// Resolves a bearer token to the identity it was issued for.
    pub async fn authenticate(&self, token: &str, access: Access) -> Result<Identity> {
        let claims = self.tokens.validate(token)?;
        let id = claims.subject()?;
        let identity = self
            .storage
            .get_identity(&id)
            .await?
            .ok_or_else(|| LabError::Unauthorized("Account no longer exists".to_string()))?;
        if !access.admits(identity.role()) {
            return Err(LabError::Unauthorized(access.denial().to_string()));
        }
        Ok(identity)
    }

    pub async fn me(&self, id: &RecordId) -> Result<IdentityView> {
        self.storage
            .get_identity(id)
            .await?
            .map(|identity| identity.view())
            .ok_or_else(|| LabError::NotFound(format!("Identity {} not found", id)))
    }

    pub async fn list_doctors(&self) -> Result<Vec<IdentityView>> {
        self.list_views(&[Role::Doctor]).await
    }

    pub async fn create_patient(&self, input: NewPatient) -> Result<IdentityView> {
        let patient = Identity::new_patient(input.name, input.mobile, input.email.as_deref());
        self.storage.add_identity(&patient).await?;
        info!(id = %patient.id(), "Patient created");
        Ok(patient.view())
    }

    pub async fn list_patients(&self) -> Result<Vec<IdentityView>> {
        self.list_views(&[Role::Patient]).await
    }

    async fn list_views(&self, roles: &[Role]) -> Result<Vec<IdentityView>> {
        Ok(self
            .storage
            .list_identities(roles)
            .await?
            .iter()
            .map(Identity::view)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::notifications::OutboxNotifier;
    use lib::storage_engine::InMemoryStorage;

    const EMAIL: &str = "mona@lab.example";
    const PASSWORD: &str = "Secret1!";

    struct Fixture {
        service: IdentityService,
        storage: Arc<dyn LabStorageEngine>,
        outbox: OutboxNotifier,
    }

    fn fixture() -> Fixture {
        let storage: Arc<dyn LabStorageEngine> = Arc::new(InMemoryStorage::new());
        let outbox = OutboxNotifier::new();
        let auth = AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..AuthConfig::default()
        };
        let service = IdentityService::new(storage.clone(), Arc::new(outbox.clone()), &auth, "http://front.example/");
        Fixture { service, storage, outbox }
    }

    fn registration(role: Role) -> Registration {
        Registration {
            name: "Dr. Mona".to_string(),
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
            mobile: "+201000000000".to_string(),
            role,
        }
    }

    async fn reset_token_from(outbox: &OutboxNotifier) -> String {
        let mail = outbox.last_to(EMAIL).await.unwrap();
        let (_, token) = mail.body.split_once("/reset-password/").unwrap();
        token.chars().take(64).collect()
    }

    #[tokio::test]
    async fn duplicate_email_keeps_one_record() {
        let f = fixture();
        f.service.register(registration(Role::Doctor)).await.unwrap();
        let mut second = registration(Role::Assistant);
        second.email = "MONA@lab.example".to_string();
        assert!(f.service.register(second).await.unwrap_err().is_conflict());
        assert_eq!(f.storage.list_identities(&Role::STAFF).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn patients_cannot_register() {
        let f = fixture();
        let err = f.service.register(registration(Role::Patient)).await.unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_email_and_bad_password() {
        let f = fixture();
        f.service.register(registration(Role::Doctor)).await.unwrap();

        let session = f.service.login(EMAIL, PASSWORD).await.unwrap();
        let claims = f.service.tokens().validate(&session.token).unwrap();
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(session.user.email.as_deref(), Some(EMAIL));

        assert!(f.service.login("nobody@lab.example", PASSWORD).await.unwrap_err().is_not_found());
        assert!(matches!(
            f.service.login(EMAIL, "Wrong1!x").await.unwrap_err(),
            LabError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn reset_token_works_once() {
        let f = fixture();
        f.service.register(registration(Role::Assistant)).await.unwrap();
        f.service.forgot_password(EMAIL).await.unwrap().await.unwrap();
        let token = reset_token_from(&f.outbox).await;

        let stored = f.storage.get_staff_by_email(EMAIL).await.unwrap().unwrap();
        let profile = stored.staff().unwrap();
        assert_ne!(profile.reset_token_hash.as_deref(), Some(token.as_str()));

        f.service.reset_password(&token, "Changed2@").await.unwrap();
        f.service.login(EMAIL, "Changed2@").await.unwrap();

        let err = f.service.reset_password(&token, "Again3$x").await.unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let f = fixture();
        let view = f.service.register(registration(Role::Doctor)).await.unwrap();
        f.service.forgot_password(EMAIL).await.unwrap().await.unwrap();
        let token = reset_token_from(&f.outbox).await;

        f.storage
            .update_identity(&view.id, &|record: &mut Identity| -> Result<()> {
                if let Some(profile) = record.staff_mut() {
                    profile.reset_token_expires_at = Some(Utc::now() - Duration::minutes(1));
                }
                Ok(())
            })
            .await
            .unwrap();

        let err = f.service.reset_password(&token, "Changed2@").await.unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
        f.service.login(EMAIL, PASSWORD).await.unwrap();
    }

    struct StalledGateway;

    #[async_trait::async_trait]
    impl Notifier for StalledGateway {
        async fn send(&self, _notification: Notification) -> Result<()> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn forgot_password_does_not_wait_for_the_email() {
        let f = fixture();
        f.service.register(registration(Role::Doctor)).await.unwrap();
        let auth = AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..AuthConfig::default()
        };
        let service = IdentityService::new(f.storage.clone(), Arc::new(StalledGateway), &auth, "http://front.example/");

        let sending = tokio::time::timeout(std::time::Duration::from_secs(2), service.forgot_password(EMAIL))
            .await
            .expect("forgot_password returned while the email was still in flight")
            .unwrap();
        assert!(!sending.is_finished());
        sending.abort();

        let stored = f.storage.get_staff_by_email(EMAIL).await.unwrap().unwrap();
        assert!(stored.staff().unwrap().reset_token_hash.is_some());
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_not_found() {
        let f = fixture();
        assert!(f.service.forgot_password("ghost@lab.example").await.unwrap_err().is_not_found());
        assert!(f.outbox.sent().await.is_empty());
    }

    #[tokio::test]
    async fn authenticate_enforces_access() {
        let f = fixture();
        f.service.register(registration(Role::Assistant)).await.unwrap();
        let session = f.service.login(EMAIL, PASSWORD).await.unwrap();

        let identity = f.service.authenticate(&session.token, Access::Staff).await.unwrap();
        assert_eq!(identity.role(), Role::Assistant);
        let err = f.service.authenticate(&session.token, Access::DoctorOnly).await.unwrap_err();
        assert!(matches!(err, LabError::Unauthorized(_)));
        let err = f.service.authenticate("garbage", Access::Staff).await.unwrap_err();
        assert!(matches!(err, LabError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn patients_and_doctors_are_listed_separately() {
        let f = fixture();
        f.service.register(registration(Role::Doctor)).await.unwrap();
        f.service
            .create_patient(NewPatient { name: "Ali".into(), mobile: "0100".into(), email: None })
            .await
            .unwrap();
        assert_eq!(f.service.list_doctors().await.unwrap().len(), 1);
        let patients = f.service.list_patients().await.unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].role, Role::Patient);
    }
}
