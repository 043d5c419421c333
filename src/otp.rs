//! Phone verification by one-time password.
//!
//! A verified phone gets a short-lived token; checkout requires a token
//! whose phone matches the shipping address.

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::OtpConfig;
use crate::domain::value_objects::Phone;
use crate::error::{Result, ShopError};

const CODE_DIGITS: u32 = 6;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_otp(&self, phone: &Phone, code: &str) -> Result<()>;
}

/// Writes codes to the log instead of sending them.
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send_otp(&self, phone: &Phone, code: &str) -> Result<()> {
        tracing::info!(%phone, code, "otp generated (log-only sms sender)");
        Ok(())
    }
}

struct Challenge {
    code_hash: [u8; 32],
    issued_at: Instant,
    expires_at: Instant,
    attempts: u32,
}

struct Verification {
    phone: Phone,
    expires_at: Instant,
}

#[derive(Default)]
struct OtpState {
    challenges: HashMap<Phone, Challenge>,
    tokens: HashMap<Uuid, Verification>,
}

impl OtpState {
    /// Drops expired codes and tokens.
    fn sweep(&mut self, now: Instant) {
        self.challenges.retain(|_, c| c.expires_at > now);
        self.tokens.retain(|_, v| v.expires_at > now);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpIssued {
    pub phone: Phone,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationToken {
    pub token: Uuid,
    pub phone: Phone,
    pub expires_in_secs: u64,
}

pub struct OtpService {
    config: OtpConfig,
    sender: Arc<dyn SmsSender>,
    state: Mutex<OtpState>,
}

impl OtpService {
    pub fn new(config: OtpConfig, sender: Arc<dyn SmsSender>) -> Self {
        Self { config, sender, state: Mutex::new(OtpState::default()) }
    }

    pub async fn send(&self, phone: Phone) -> Result<OtpIssued> {
        let now = Instant::now();
        let code = generate_code();
        {
            let mut state = self.state.lock().await;
            state.sweep(now);
            if let Some(existing) = state.challenges.get(&phone) {
                let since = now.duration_since(existing.issued_at);
                if since < self.config.resend_cooldown {
                    let wait = (self.config.resend_cooldown - since).as_secs().max(1);
                    return Err(ShopError::TooManyRequests(format!("wait {wait}s before requesting another code")));
                }
            }
            state.challenges.insert(
                phone.clone(),
                Challenge { code_hash: hash_code(&phone, &code), issued_at: now, expires_at: now + self.config.code_ttl, attempts: 0 },
            );
        }
        if let Err(e) = self.sender.send_otp(&phone, &code).await {
            self.state.lock().await.challenges.remove(&phone);
            return Err(e);
        }
        tracing::info!(%phone, "otp sent");
        Ok(OtpIssued { phone, expires_in_secs: self.config.code_ttl.as_secs() })
    }

    pub async fn verify(&self, phone: Phone, code: &str) -> Result<VerificationToken> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.sweep(now);

        let challenge = state
            .challenges
            .get_mut(&phone)
            .ok_or_else(|| ShopError::Validation("no active code for this number; request a new one".into()))?;
        if challenge.expires_at <= now {
            state.challenges.remove(&phone);
            return Err(ShopError::Validation("code expired; request a new one".into()));
        }
        if challenge.code_hash != hash_code(&phone, code.trim()) {
            challenge.attempts += 1;
            if challenge.attempts >= self.config.max_attempts {
                state.challenges.remove(&phone);
                tracing::warn!(%phone, "otp attempts exhausted");
                return Err(ShopError::TooManyRequests("too many incorrect attempts; request a new code".into()));
            }
            return Err(ShopError::Validation("incorrect code".into()));
        }

        state.challenges.remove(&phone);
        let token = Uuid::new_v4();
        state.tokens.insert(token, Verification { phone: phone.clone(), expires_at: now + self.config.verification_ttl });
        tracing::info!(%phone, "phone verified");
        Ok(VerificationToken { token, phone, expires_in_secs: self.config.verification_ttl.as_secs() })
    }

    /// The phone a live token was issued for.
    pub async fn phone_for_token(&self, token: Uuid) -> Option<Phone> {
        let state = self.state.lock().await;
        state.tokens.get(&token).filter(|v| v.expires_at > Instant::now()).map(|v| v.phone.clone())
    }
}

fn generate_code() -> String {
    let n = rand::random::<u32>() % 10u32.pow(CODE_DIGITS);
    format!("{n:06}")
}

fn hash_code(phone: &Phone, code: &str) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(phone.as_str().as_bytes());
    h.update(b":");
    h.update(code.as_bytes());
    h.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Capture(std::sync::Mutex<Option<String>>);

    #[async_trait]
    impl SmsSender for Capture {
        async fn send_otp(&self, _phone: &Phone, code: &str) -> Result<()> {
            *self.0.lock().unwrap() = Some(code.to_string());
            Ok(())
        }
    }

    fn service() -> (OtpService, Arc<Capture>) {
        let capture = Arc::new(Capture::default());
        (OtpService::new(OtpConfig::default(), capture.clone()), capture)
    }

    fn phone() -> Phone {
        Phone::parse("9876543210").unwrap()
    }

    #[tokio::test]
    async fn test_send_and_verify() {
        let (svc, capture) = service();
        svc.send(phone()).await.unwrap();
        let code = capture.0.lock().unwrap().clone().unwrap();
        assert_eq!(code.len(), 6);
        let token = svc.verify(phone(), &code).await.unwrap();
        assert_eq!(svc.phone_for_token(token.token).await, Some(phone()));
        // consumed
        assert!(svc.verify(phone(), &code).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_cooldown() {
        let (svc, _) = service();
        svc.send(phone()).await.unwrap();
        assert!(matches!(svc.send(phone()).await, Err(ShopError::TooManyRequests(_))));
        tokio::time::advance(Duration::from_secs(31)).await;
        svc.send(phone()).await.unwrap();
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let (svc, capture) = service();
        svc.send(phone()).await.unwrap();
        let code = capture.0.lock().unwrap().clone().unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };
        for _ in 0..4 {
            assert!(matches!(svc.verify(phone(), wrong).await, Err(ShopError::Validation(_))));
        }
        assert!(matches!(svc.verify(phone(), wrong).await, Err(ShopError::TooManyRequests(_))));
        assert!(svc.verify(phone(), &code).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_dropped() {
        let (svc, capture) = service();
        for i in 0..200u32 {
            svc.send(Phone::parse(&format!("98{i:08}")).unwrap()).await.unwrap();
        }
        svc.send(phone()).await.unwrap();
        let code = capture.0.lock().unwrap().clone().unwrap();
        svc.verify(phone(), &code).await.unwrap();
        assert_eq!(svc.state.lock().await.challenges.len(), 200);

        tokio::time::advance(Duration::from_secs(3600)).await;
        let other = Phone::parse("9123456780").unwrap();
        svc.send(other.clone()).await.unwrap();
        let state = svc.state.lock().await;
        assert_eq!(state.challenges.len(), 1);
        assert!(state.challenges.contains_key(&other));
        assert!(state.tokens.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let (svc, capture) = service();
        svc.send(phone()).await.unwrap();
        let code = capture.0.lock().unwrap().clone().unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(svc.verify(phone(), &code).await.is_err());

        tokio::time::advance(Duration::from_secs(31)).await;
        svc.send(phone()).await.unwrap();
        let code = capture.0.lock().unwrap().clone().unwrap();
        let token = svc.verify(phone(), &code).await.unwrap().token;
        tokio::time::advance(Duration::from_secs(1801)).await;
        assert_eq!(svc.phone_for_token(token).await, None);
    }
}
