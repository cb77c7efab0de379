pub mod availability;
pub mod certificate;
pub mod mail;
pub mod mnemonic;

pub use availability::{Availability, AvailabilityService};
pub use certificate::{Certificate, CertificateData, CertificateError, CertificateRenderer, CommandRenderer};
pub use mail::{certificate_mail, reservation_mail, MailError, Mailer, OutgoingMail, SmtpMailer};
pub use mnemonic::{MidValidator, Mnemonic, MnemonicError};
