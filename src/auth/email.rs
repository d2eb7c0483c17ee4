//! Email sending for verification and password reset

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::{Arc, Mutex};

use crate::error::{AuthError, Result};

/// Email configuration
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub app_url: String,
}

impl EmailConfig {
    /// SMTP settings from the environment; links in the mails point at `app_url`
    pub fn from_env(app_url: &str) -> Option<Self> {
        Some(Self {
            smtp_host: std::env::var("SMTP_HOST").ok()?,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").ok()?,
            smtp_password: std::env::var("SMTP_PASSWORD").ok()?,
            from_email: std::env::var("FROM_EMAIL").ok()?,
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "User Auth".to_string()),
            app_url: app_url.to_string(),
        })
    }
}

fn email_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::Email(e.to_string())
}

fn reset_url(app_url: &str, token: &str) -> String {
    format!("{}/auth/reset-password?token={}", app_url, token)
}

fn verify_url(app_url: &str, token: &str) -> String {
    format!("{}/auth/verify?token={}", app_url, token)
}

/// SMTP email service
pub struct EmailService {
    config: EmailConfig,
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(email_error)?;

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(email_error)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            from,
            mailer,
        })
    }

    async fn send_html(&self, to_email: &str, subject: &str, html_body: String) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to_email.parse().map_err(email_error)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(email_error)?;

        self.mailer.send(email).await.map_err(email_error)?;
        Ok(())
    }

    pub async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<()> {
        let url = verify_url(&self.config.app_url, token);

        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Verify your email</title>
</head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #333;">Verify your email address</h1>
    <p>Please confirm your email address by opening the link below:</p>
    <p style="word-break: break-all; color: #666;"><a href="{url}">{url}</a></p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">
        This link will expire in 1 hour. If you didn't create an account, you can safely ignore this email.
    </p>
</body>
</html>"#
        );

        self.send_html(to_email, "Verify your email", html_body).await
    }

    pub async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<()> {
        let url = reset_url(&self.config.app_url, token);

        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Reset your password</title>
</head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #333;">Password Reset Request</h1>
    <p>We received a request to reset your password. Open the link below to choose a new one:</p>
    <p style="word-break: break-all; color: #666;"><a href="{url}">{url}</a></p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">
        This link will expire in 1 hour. If you didn't request a password reset, you can safely ignore this email.
    </p>
</body>
</html>"#
        );

        self.send_html(to_email, "Reset your password", html_body).await
    }
}

/// What kind of message a [`SentEmail`] was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// A message captured by the mock sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub to: String,
    pub token: String,
    pub url: String,
}

/// Mock email service for development/testing
#[derive(Clone)]
pub struct MockEmailService {
    pub app_url: String,
    outbox: Arc<Mutex<Vec<SentEmail>>>,
    fail: bool,
}

impl MockEmailService {
    pub fn new(app_url: String) -> Self {
        Self {
            app_url,
            outbox: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A mock whose every delivery fails, nothing is recorded
    pub fn failing(app_url: String) -> Self {
        Self {
            fail: true,
            ..Self::new(app_url)
        }
    }

    /// Messages "sent" so far, oldest first
    pub fn sent(&self) -> Vec<SentEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    fn record(&self, kind: EmailKind, to_email: &str, token: &str, url: String) -> Result<()> {
        if self.fail {
            return Err(email_error(format!("{:?} email to {} rejected", kind, to_email)));
        }

        log::info!("[MOCK EMAIL] {:?} email to {}: {}", kind, to_email, url);
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(SentEmail {
                kind,
                to: to_email.to_string(),
                token: token.to_string(),
                url,
            });
        }
        Ok(())
    }

    pub async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<()> {
        self.record(
            EmailKind::Verification,
            to_email,
            token,
            verify_url(&self.app_url, token),
        )
    }

    pub async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<()> {
        self.record(
            EmailKind::PasswordReset,
            to_email,
            token,
            reset_url(&self.app_url, token),
        )
    }
}

/// SMTP when configured, log-only otherwise
pub enum EmailSender {
    Real(EmailService),
    Mock(MockEmailService),
}

impl EmailSender {
    pub fn from_env(app_url: &str) -> Self {
        match EmailConfig::from_env(app_url) {
            Some(config) => match EmailService::new(config) {
                Ok(service) => EmailSender::Real(service),
                Err(e) => {
                    log::warn!("Failed to initialize email service: {}. Using mock.", e);
                    EmailSender::Mock(MockEmailService::new(app_url.to_string()))
                }
            },
            None => {
                log::info!("Email not configured. Using mock email service.");
                EmailSender::Mock(MockEmailService::new(app_url.to_string()))
            }
        }
    }

    /// Mock sender, for tests
    pub fn mock(app_url: impl Into<String>) -> Self {
        EmailSender::Mock(MockEmailService::new(app_url.into()))
    }

    /// Mock sender that fails every delivery, for tests
    pub fn failing_mock(app_url: impl Into<String>) -> Self {
        EmailSender::Mock(MockEmailService::failing(app_url.into()))
    }

    /// Messages captured by the mock sender; empty for SMTP
    pub fn sent(&self) -> Vec<SentEmail> {
        match self {
            EmailSender::Real(_) => Vec::new(),
            EmailSender::Mock(mock) => mock.sent(),
        }
    }

    pub async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<()> {
        match self {
            EmailSender::Real(service) => service.send_verification_email(to_email, token).await,
            EmailSender::Mock(mock) => mock.send_verification_email(to_email, token).await,
        }
    }

    pub async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<()> {
        match self {
            EmailSender::Real(service) => service.send_password_reset_email(to_email, token).await,
            EmailSender::Mock(mock) => mock.send_password_reset_email(to_email, token).await,
        }
    }
}
