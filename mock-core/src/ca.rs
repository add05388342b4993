use crate::error::MockError;
use crate::Result;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256,
};
use std::fs;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tracing::info;

const CERT_FILE: &str = "mock-ca.pem";
const KEY_FILE: &str = "mock-ca.key";

/// Root CA used to sign the per-host certificates of intercepted HTTPS traffic.
///
/// Browsers must trust `mock-ca.pem` for HTTPS requests to be mocked.
pub struct CertificateAuthority {
    ca_cert: Certificate,
}

fn ca_params(key_pair: KeyPair) -> CertificateParams {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "Mock Response CA");
    dn.push(DnType::OrganizationName, "mock-agent");

    let mut params = CertificateParams::default();
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    params.key_pair = Some(key_pair);
    params
}

fn cert_error(what: &str, e: impl std::fmt::Display) -> MockError {
    MockError::Certificate(format!("{}: {}", what, e))
}

impl CertificateAuthority {
    /// Load `mock-ca.pem`/`mock-ca.key` from `ca_dir`, generating them on first use.
    pub fn load_or_generate(ca_dir: &Path) -> Result<Self> {
        let (cert_path, key_path) = Self::paths(ca_dir);

        if cert_path.exists() && key_path.exists() {
            let cert_pem = fs::read_to_string(&cert_path)?;
            let key_pem = fs::read_to_string(&key_path)?;
            info!("Loaded mock CA from {}", cert_path.display());
            return Self::from_pem(&cert_pem, &key_pem);
        }

        fs::create_dir_all(ca_dir)?;
        let ca = Self::generate()?;
        fs::write(&cert_path, ca.cert_pem()?)?;
        fs::write(&key_path, ca.key_pem())?;
        info!("Generated mock CA at {}", cert_path.display());
        Ok(ca)
    }

    pub fn paths(ca_dir: &Path) -> (PathBuf, PathBuf) {
        (ca_dir.join(CERT_FILE), ca_dir.join(KEY_FILE))
    }

    /// Rebuild the CA around an existing key.
    ///
    /// rcgen cannot sign with a parsed certificate, so the certificate is
    /// re-issued with the same subject and key; leaf certificates still chain
    /// to the trusted file on disk.
    pub fn from_pem(_cert_pem: &str, key_pem: &str) -> Result<Self> {
        let key_pair = KeyPair::from_pem(key_pem).map_err(|e| cert_error("Failed to parse CA key", e))?;
        let ca_cert = Certificate::from_params(ca_params(key_pair))
            .map_err(|e| cert_error("Failed to rebuild CA certificate", e))?;
        Ok(Self { ca_cert })
    }

    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| cert_error("Failed to generate CA key", e))?;

        let mut params = ca_params(key_pair);
        params.not_before = OffsetDateTime::now_utc();
        params.not_after = params.not_before + Duration::days(365 * 10);

        let ca_cert =
            Certificate::from_params(params).map_err(|e| cert_error("Failed to generate CA certificate", e))?;
        Ok(Self { ca_cert })
    }

    pub fn cert_pem(&self) -> Result<String> {
        self.ca_cert
            .serialize_pem()
            .map_err(|e| cert_error("Failed to serialize CA certificate", e))
    }

    pub fn key_pem(&self) -> String {
        self.ca_cert.serialize_private_key_pem()
    }

    /// DER forms of the certificate and private key, as hudsucker expects them.
    pub fn der(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let cert = self
            .ca_cert
            .serialize_der()
            .map_err(|e| cert_error("Failed to serialize CA certificate", e))?;
        Ok((cert, self.ca_cert.serialize_private_key_der()))
    }
}
