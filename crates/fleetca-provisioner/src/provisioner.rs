//! Token authorization and policy derivation
//!
//! `Provisioner::authorize` is the capability the authority consumes: it
//! takes an [`AuthorizeRequest`] and returns the ordered sign-time
//! policies the token grants. The request record carries the signing
//! method and the token-reuse skip as typed fields; there is no ambient
//! request state.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use fleetca_core::options::TimeDuration;
use fleetca_core::policy::{SshPolicy, X509Policy};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::claims::OttClaims;
use crate::error::{OttError, Result};
use crate::replay::ReplayGuard;

/// The signing operation a token is being presented for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMethod {
    /// SSH certificate signing
    SshSign,
    /// SSH certificate renewal
    SshRenew,
    /// SSH certificate rekey
    SshRekey,
    /// X.509 certificate signing (identity co-issuance)
    X509Sign,
}

impl fmt::Display for SignMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignMethod::SshSign => write!(f, "ssh-sign"),
            SignMethod::SshRenew => write!(f, "ssh-renew"),
            SignMethod::SshRekey => write!(f, "ssh-rekey"),
            SignMethod::X509Sign => write!(f, "x509-sign"),
        }
    }
}

/// An authorization request: the token plus the typed context it is
/// presented under
#[derive(Debug, Clone, Copy)]
pub struct AuthorizeRequest<'a> {
    /// The one-time token
    pub ott: &'a str,
    /// The signing method being authorized
    pub method: SignMethod,
    /// Bypass the replay check for this presentation.
    ///
    /// Set exactly once per sign request, for the identity-certificate
    /// re-authorization that deliberately reuses the token.
    pub skip_token_reuse: bool,
}

/// Validity policy applied when a token does not override it
#[derive(Debug, Clone, Copy)]
pub struct PolicyDefaults {
    /// Default lifetime of user certificates
    pub user_validity: Duration,
    /// Default lifetime of host certificates
    pub host_validity: Duration,
    /// Hard upper bound on any certificate lifetime
    pub max_validity: Duration,
    /// Default lifetime of co-issued identity certificates
    pub identity_validity: Duration,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            user_validity: Duration::hours(16),
            host_validity: Duration::hours(720),
            max_validity: Duration::hours(720),
            identity_validity: Duration::hours(24),
        }
    }
}

/// The result of a successful authorization
#[derive(Debug)]
pub struct Authorization {
    /// Name of the provisioner that validated the token
    pub provisioner: String,
    /// The validated claims
    pub claims: OttClaims,
    /// Ordered policies constraining the SSH certificate
    pub ssh_policies: Vec<SshPolicy>,
    /// Ordered policies constraining a co-issued identity certificate
    pub x509_policies: Vec<X509Policy>,
}

/// Validates one-time tokens and derives sign-time policies from them
pub struct Provisioner {
    name: String,
    audience: String,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    replay: Arc<ReplayGuard>,
    defaults: PolicyDefaults,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("name", &self.name)
            .field("audience", &self.audience)
            .finish()
    }
}

impl Provisioner {
    /// Create a provisioner validating tokens signed with the given key
    pub fn new(
        name: impl Into<String>,
        audience: impl Into<String>,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            name: name.into(),
            audience: audience.into(),
            decoding_key,
            algorithm,
            replay: Arc::new(ReplayGuard::default()),
            defaults: PolicyDefaults::default(),
        }
    }

    /// Replace the replay guard, e.g. to share one across provisioners
    pub fn with_replay_guard(mut self, guard: Arc<ReplayGuard>) -> Self {
        self.replay = guard;
        self
    }

    /// Replace the validity defaults
    pub fn with_defaults(mut self, defaults: PolicyDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The provisioner's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate a token and derive the policies it grants.
    ///
    /// Consumes the token's `jti` in the replay guard unless the request
    /// carries `skip_token_reuse`.
    pub async fn authorize(&self, req: AuthorizeRequest<'_>) -> Result<Authorization> {
        match req.method {
            SignMethod::SshSign | SignMethod::X509Sign => {}
            // Renewal and rekey ride on transport authentication; a
            // one-time token never authorizes them.
            other => return Err(OttError::MethodNotAllowed(other.to_string())),
        }

        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.leeway = 60;

        let data = decode::<OttClaims>(req.ott, &self.decoding_key, &validation)?;
        let claims = data.claims;
        if claims.jti.is_empty() {
            return Err(OttError::MissingClaim("jti".into()));
        }

        if !req.skip_token_reuse {
            self.replay
                .mark_used(&claims.jti, claims.remaining_lifetime())
                .await?;
        }

        let ssh_policies = self.ssh_policies(&claims)?;
        let x509_policies = self.x509_policies(&claims);

        debug!(
            provisioner = %self.name,
            sub = %claims.sub,
            jti = %claims.jti,
            method = %req.method,
            skip_token_reuse = req.skip_token_reuse,
            "authorized one-time token"
        );

        Ok(Authorization {
            provisioner: self.name.clone(),
            claims,
            ssh_policies,
            x509_policies,
        })
    }

    fn ssh_policies(&self, claims: &OttClaims) -> Result<Vec<SshPolicy>> {
        let mut policies = Vec::new();

        if let Some(cert_type) = claims.pinned_cert_type()? {
            policies.push(SshPolicy::CertType(cert_type));
        }
        if !claims.principals.is_empty() {
            policies.push(SshPolicy::Principals(claims.principals.clone()));
        }
        if let Some(key_id) = &claims.key_id {
            policies.push(SshPolicy::KeyId(key_id.clone()));
        }

        let mut user = self.defaults.user_validity;
        let mut host = self.defaults.host_validity;
        if let Some(validity) = &claims.validity {
            match validity.parse::<TimeDuration>() {
                Ok(TimeDuration::Duration(d)) if d > Duration::zero() => {
                    user = d;
                    host = d;
                }
                _ => {
                    return Err(OttError::ValidationFailed(format!(
                        "invalid validity claim {validity:?}"
                    )))
                }
            }
        }
        policies.push(SshPolicy::ValidityDefaults { user, host });
        policies.push(SshPolicy::ValidityCap(self.defaults.max_validity));

        Ok(policies)
    }

    fn x509_policies(&self, _claims: &OttClaims) -> Vec<X509Policy> {
        vec![X509Policy::Validity(self.defaults.identity_validity)]
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fleetca_core::options::SshCertType;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &[u8] = b"test-provisioner-secret";
    const AUDIENCE: &str = "https://ca.fleet.internal";

    fn provisioner() -> Provisioner {
        Provisioner::new(
            "enrolld",
            AUDIENCE,
            DecodingKey::from_secret(SECRET),
            Algorithm::HS256,
        )
    }

    fn claims(jti: &str) -> OttClaims {
        OttClaims {
            iss: "enrolld".into(),
            sub: "alice".into(),
            aud: AUDIENCE.into(),
            exp: Utc::now().timestamp() + 300,
            iat: Utc::now().timestamp(),
            nbf: None,
            jti: jti.into(),
            principals: vec!["alice".into()],
            cert_type: Some("user".into()),
            key_id: Some("alice@example".into()),
            email: Some("alice@example.com".into()),
            validity: None,
        }
    }

    fn mint(claims: &OttClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn request(ott: &str) -> AuthorizeRequest<'_> {
        AuthorizeRequest {
            ott,
            method: SignMethod::SshSign,
            skip_token_reuse: false,
        }
    }

    #[tokio::test]
    async fn test_authorize_valid_token() {
        let p = provisioner();
        let token = mint(&claims("tok-1"));

        let authz = p.authorize(request(&token)).await.unwrap();
        assert_eq!(authz.provisioner, "enrolld");
        assert_eq!(authz.claims.sub, "alice");
        assert!(authz
            .ssh_policies
            .iter()
            .any(|p| matches!(p, SshPolicy::CertType(SshCertType::User))));
        assert!(authz
            .ssh_policies
            .iter()
            .any(|p| matches!(p, SshPolicy::Principals(ps) if ps == &vec!["alice".to_string()])));
        assert!(matches!(
            authz.x509_policies.as_slice(),
            [X509Policy::Validity(_)]
        ));
    }

    #[tokio::test]
    async fn test_replayed_token_rejected() {
        let p = provisioner();
        let token = mint(&claims("tok-replay"));

        p.authorize(request(&token)).await.unwrap();
        let err = p.authorize(request(&token)).await.unwrap_err();
        assert!(matches!(err, OttError::TokenReplayed(_)));
    }

    #[tokio::test]
    async fn test_skip_token_reuse_bypasses_replay_once() {
        let p = provisioner();
        let token = mint(&claims("tok-skip"));

        p.authorize(request(&token)).await.unwrap();
        // Identity co-issuance re-presents the token with the skip flag.
        p.authorize(AuthorizeRequest {
            ott: &token,
            method: SignMethod::X509Sign,
            skip_token_reuse: true,
        })
        .await
        .unwrap();

        // A third, unskipped presentation is still a replay.
        let err = p.authorize(request(&token)).await.unwrap_err();
        assert!(matches!(err, OttError::TokenReplayed(_)));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let p = provisioner();
        let mut c = claims("tok-old");
        c.exp = Utc::now().timestamp() - 600;
        c.iat = c.exp - 300;

        let err = p.authorize(request(&mint(&c))).await.unwrap_err();
        assert!(matches!(err, OttError::Expired));
    }

    #[tokio::test]
    async fn test_wrong_audience_rejected() {
        let p = provisioner();
        let mut c = claims("tok-aud");
        c.aud = "https://other-ca.example".into();

        let err = p.authorize(request(&mint(&c))).await.unwrap_err();
        assert!(matches!(err, OttError::InvalidAudience));
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let p = provisioner();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims("tok-forged"),
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();

        let err = p.authorize(request(&token)).await.unwrap_err();
        assert!(matches!(err, OttError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_missing_jti_rejected() {
        let p = provisioner();
        let err = p
            .authorize(request(&mint(&claims(""))))
            .await
            .unwrap_err();
        assert!(matches!(err, OttError::MissingClaim(claim) if claim == "jti"));
    }

    #[tokio::test]
    async fn test_renew_never_token_authorized() {
        let p = provisioner();
        let token = mint(&claims("tok-renew"));
        let err = p
            .authorize(AuthorizeRequest {
                ott: &token,
                method: SignMethod::SshRenew,
                skip_token_reuse: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OttError::MethodNotAllowed(_)));
    }

    #[tokio::test]
    async fn test_validity_claim_overrides_defaults() {
        let p = provisioner();
        let mut c = claims("tok-validity");
        c.validity = Some("8h".into());

        let authz = p.authorize(request(&mint(&c))).await.unwrap();
        let defaults = authz.ssh_policies.iter().find_map(|p| match p {
            SshPolicy::ValidityDefaults { user, .. } => Some(*user),
            _ => None,
        });
        assert_eq!(defaults, Some(Duration::hours(8)));

        let mut bad = claims("tok-validity-bad");
        bad.validity = Some("whenever".into());
        assert!(p.authorize(request(&mint(&bad))).await.is_err());
    }
}
