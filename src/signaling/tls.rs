use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
    sync::Arc,
};

use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer},
};
use rustls_pemfile::{Item, certs, read_one};
use tokio_rustls::TlsAcceptor;

use crate::signaling::relay_config::TlsSettings;

/// Loads a certificate chain from a PEM file.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be opened, the PEM content is
/// invalid, or it holds no certificate.
pub fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening cert {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid certs: {e}")))?;

    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "cert file did not contain any certificates",
        ));
    }

    Ok(certs)
}

/// Loads the first private key of a PEM file (PKCS1, PKCS8 or SEC1).
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be opened, is malformed, or
/// holds no private key.
pub fn load_private_key(path: &Path) -> io::Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening key {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    loop {
        match read_one(&mut reader) {
            Ok(Some(Item::Pkcs1Key(key))) => return Ok(key.into()),
            Ok(Some(Item::Pkcs8Key(key))) => return Ok(key.into()),
            Ok(Some(Item::Sec1Key(key))) => return Ok(key.into()),
            Ok(None) => break,
            Ok(Some(_)) => {} // certificates and other items
            Err(e) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("key parse error: {e}"),
                ));
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("no private key found in {}", path.display()),
    ))
}

/// ServerConfig for `wss://`, no client auth.
///
/// Built once at startup; every accepted TCP stream is wrapped through the
/// same acceptor.
pub fn build_server_config(settings: &TlsSettings) -> io::Result<Arc<ServerConfig>> {
    let certs = load_certs(&settings.cert_path)?;
    let key = load_private_key(&settings.key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("TLS config error: {e}"))
        })?;

    Ok(Arc::new(config))
}

pub fn build_acceptor(settings: &TlsSettings) -> io::Result<TlsAcceptor> {
    build_server_config(settings).map(TlsAcceptor::from)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("callrelay-tls-{}-{name}", std::process::id()));
        std::fs::write(&path, content).expect("write temp file");
        path
    }

    #[test]
    fn missing_files_are_reported_with_their_path() {
        let err = load_certs(Path::new("/nonexistent/relay.pem")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("/nonexistent/relay.pem"));
    }

    #[test]
    fn pem_without_certificates_is_invalid_data() {
        let path = temp_file("empty.pem", "# nothing here\n");
        let err = load_certs(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = load_private_key(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let _ = std::fs::remove_file(path);
    }
}
