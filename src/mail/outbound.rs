use anyhow::{Context, Result};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use log::info;
use std::time::Duration;

use crate::domain::credential::{CredentialRecord, TransportSecurity};

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn build_message(cred: &CredentialRecord, msg: &OutboundMessage) -> Result<Message> {
    let from: Mailbox = cred
        .address
        .parse()
        .with_context(|| format!("invalid sender address {}", cred.address))?;
    let to: Mailbox = msg
        .to
        .parse()
        .with_context(|| format!("invalid recipient address {}", msg.to))?;

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(msg.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(msg.body.clone())?)
}

/// Send one plain-text message through the account's own SMTP server.
pub fn send_message(cred: &CredentialRecord, msg: &OutboundMessage) -> Result<()> {
    let email = build_message(cred, msg)?;

    let params = TlsParameters::new(cred.server_host.clone())?;
    let tls = match cred.transport_security {
        TransportSecurity::Ssl => Tls::Wrapper(params),
        TransportSecurity::Tls => Tls::Opportunistic(params),
    };

    let transport = SmtpTransport::builder_dangerous(cred.server_host.as_str())
        .port(cred.server_port)
        .tls(tls)
        .credentials(Credentials::new(cred.address.clone(), cred.secret.clone()))
        .timeout(Some(Duration::from_secs(30)))
        .build();

    transport
        .send(&email)
        .with_context(|| format!("sending via {}:{}", cred.server_host, cred.server_port))?;
    info!("sent \"{}\" from {} to {}", msg.subject, cred.address, msg.to);
    Ok(())
}
