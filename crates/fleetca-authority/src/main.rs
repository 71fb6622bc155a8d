//! Authority server binary
//!
//! Runs the fleetca HTTP server. Configuration comes from the
//! environment:
//!
//! - `FLEETCA_PORT` - listen port (default 8080)
//! - `FLEETCA_LOG_LEVEL` - tracing level (default info)
//! - `FLEETCA_KEY_DIR` - directory holding `ssh_user_ca`, `ssh_host_ca`
//!   (OpenSSH private keys) and `x509_ca` (PKCS#8 PEM); ephemeral keys
//!   are generated when unset
//! - `FLEETCA_AUDIENCE` - audience expected in one-time tokens
//! - `FLEETCA_OTT_SECRET` - HS256 secret one-time tokens are signed with
//! - `FLEETCA_ROOT_BUNDLE` - optional PEM bundle of X.509 roots
//! - `FLEETCA_SSH_HOSTS` - optional comma-separated seed list of
//!   SSH-enabled host principals

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use fleetca_authority::{
    create_router, AppState, AuthDb, Authority, CaError, HostCheck, HostEnumeration, KeyManager,
    MemoryDb, SoftKeyManager,
};
use fleetca_core::{CertificateDer, Host, SshSigner, X509Signer};
use fleetca_provisioner::Provisioner;
use jsonwebtoken::{Algorithm, DecodingKey};
use ssh_key::rand_core::OsRng;
use ssh_key::PrivateKey;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Host check backed by the authority database
struct DbHostCheck {
    db: Arc<dyn AuthDb>,
}

#[async_trait]
impl HostCheck for DbHostCheck {
    async fn check(
        &self,
        principal: &str,
        _token: &str,
        _roots: &[CertificateDer],
    ) -> Result<bool, CaError> {
        Ok(self.db.is_ssh_host(principal).await?)
    }
}

/// Host enumeration backed by the authority database
struct DbHostEnumeration {
    db: Arc<dyn AuthDb>,
}

#[async_trait]
impl HostEnumeration for DbHostEnumeration {
    async fn hosts(&self, _peer_certificate: Option<&[u8]>) -> Result<Vec<Host>, CaError> {
        let hosts = self.db.list_ssh_hosts().await?;
        Ok(hosts.into_iter().map(Host::new).collect())
    }
}

fn load_ssh_signer(kms: &Option<SoftKeyManager>, name: &str) -> SshSigner {
    match kms {
        Some(kms) if kms.has_key(name) => kms.ssh_signer(name).expect("ssh signing key"),
        _ => {
            info!(key = name, "generating ephemeral ssh CA key");
            SshSigner::new(
                PrivateKey::random(&mut OsRng, ssh_key::Algorithm::Ed25519)
                    .expect("generated ssh key"),
            )
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("FLEETCA_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    // Configuration
    let port: u16 = env::var("FLEETCA_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()
        .expect("FLEETCA_PORT must be a valid port number");
    let audience =
        env::var("FLEETCA_AUDIENCE").unwrap_or_else(|_| "https://ca.fleet.internal".into());

    // Signing keys, file-backed when a key directory is configured
    let kms = env::var("FLEETCA_KEY_DIR").ok().map(SoftKeyManager::new);
    let user_signer = load_ssh_signer(&kms, "ssh_user_ca");
    let host_signer = load_ssh_signer(&kms, "ssh_host_ca");
    let x509_key = match &kms {
        Some(kms) if kms.has_key("x509_ca") => kms.x509_key_pair("x509_ca").expect("x509 key"),
        _ => {
            info!(key = "x509_ca", "generating ephemeral x509 CA key");
            rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).expect("generated key")
        }
    };
    let x509_signer = X509Signer::self_signed("Fleetca Identity CA", x509_key).expect("x509 CA");

    // One-time-token provisioner
    let ott_secret = env::var("FLEETCA_OTT_SECRET").unwrap_or_else(|_| {
        info!("FLEETCA_OTT_SECRET not set; minting a random one (tokens from other processes will not verify)");
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().gen();
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    });
    let provisioner = Provisioner::new(
        "fleetca",
        &audience,
        DecodingKey::from_secret(ott_secret.as_bytes()),
        Algorithm::HS256,
    );

    // Database, seeded from the environment
    let db: Arc<dyn AuthDb> = Arc::new(MemoryDb::new());
    if let Ok(seed) = env::var("FLEETCA_SSH_HOSTS") {
        for principal in seed.split(',').filter(|s| !s.is_empty()) {
            db.add_ssh_host(principal.trim()).await.expect("seed host");
        }
    }

    // Assemble the authority
    let mut builder = Authority::builder()
        .with_database(db.clone())
        .with_provisioner(provisioner)
        .with_ssh_user_signer(user_signer)
        .with_ssh_host_signer(host_signer)
        .with_x509_signer(x509_signer)
        .with_ssh_check_host_func(Arc::new(DbHostCheck { db: db.clone() }))
        .with_ssh_get_hosts_func(Arc::new(DbHostEnumeration { db: db.clone() }));
    if let Some(kms) = kms {
        builder = builder.with_key_manager(Arc::new(kms));
    }
    if let Ok(path) = env::var("FLEETCA_ROOT_BUNDLE") {
        let bundle = std::fs::read(&path).expect("root bundle");
        builder = builder.with_x509_root_bundle(bundle);
    }
    let authority = builder.build().expect("authority");

    let roots = authority.get_ssh_roots();
    info!(
        user_ca_keys = roots.user_keys.len(),
        host_ca_keys = roots.host_keys.len(),
        audience = %audience,
        port = port,
        "starting fleetca authority"
    );

    // Serve
    let state = Arc::new(AppState { authority });
    let app = create_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    info!(addr = %addr, "fleetca listening");

    axum::serve(listener, app).await.expect("server error");
}
