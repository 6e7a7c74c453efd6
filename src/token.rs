use anyhow::{anyhow, Context};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

// Refresh a little early so a token never expires mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
struct CachedToken {
    token: BasicTokenResponse,
    /// Seconds since the Unix epoch.
    expires_at: u64,
}

/// Google account access for the Drive API, cached on disk.
pub struct Client {
    client: BasicClient,
    port: u16,
    path: PathBuf,
    cached: Option<CachedToken>,
}

impl Client {
    pub fn new(
        client_id: String,
        client_secret: Option<String>,
        path: PathBuf,
        port: u16,
    ) -> anyhow::Result<Self> {
        let auth_url = AuthUrl::new(AUTH_URL.to_string())?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string())?;
        let redirect_url = RedirectUrl::new(format!("http://localhost:{port}"))?;

        let client = BasicClient::new(
            ClientId::new(client_id),
            client_secret.map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        let cached = std::fs::read_to_string(&path)
            .ok()
            .and_then(|cached| serde_json::from_str(&cached).ok());

        Ok(Self {
            client,
            port,
            path,
            cached,
        })
    }

    pub fn is_signed_in(&self) -> bool {
        self.cached.is_some()
    }

    /// Runs the browser sign-in flow, replacing any cached token.
    pub fn login(&mut self) -> anyhow::Result<()> {
        let token = authorize(&self.client, self.port)?;
        self.store(token)
    }

    /// Forgets the cached token.
    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.cached = None;
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn refresh(&mut self) -> anyhow::Result<()> {
        let Some(cached) = &self.cached else {
            return self.login();
        };

        if cached.expires_at > now() {
            return Ok(());
        }

        match cached.token.refresh_token().cloned() {
            Some(refresh_token) => {
                tracing::debug!("refreshing the access token");
                let mut token = self
                    .client
                    .exchange_refresh_token(&refresh_token)
                    .request(http_client)
                    .context("Failed to refresh the token")?;

                // Google only issues a refresh token with the first grant.
                if token.refresh_token().is_none() {
                    token.set_refresh_token(Some(refresh_token));
                }

                self.store(token)
            }
            None => self.login(),
        }
    }

    fn store(&mut self, token: BasicTokenResponse) -> anyhow::Result<()> {
        let lifetime = token
            .expires_in()
            .unwrap_or_default()
            .saturating_sub(EXPIRY_MARGIN);
        let cached = CachedToken {
            token,
            expires_at: now() + lifetime.as_secs(),
        };

        save(&self.path, &cached)?;
        self.cached = Some(cached);

        Ok(())
    }

    /// The `Authorization` header value, refreshing the token first if needed.
    pub fn authorization(&mut self) -> anyhow::Result<String> {
        self.refresh()?;

        let token = &self
            .cached
            .as_ref()
            .ok_or_else(|| anyhow!("Not signed in"))?
            .token;
        let secret = token.access_token().secret();

        match token.token_type().as_ref() {
            "bearer" => Ok(format!("Bearer {secret}")),
            token_type => Ok(format!("{token_type} {secret}")),
        }
    }
}

fn authorize(client: &BasicClient, port: u16) -> anyhow::Result<BasicTokenResponse> {
    // Create a PKCE code verifier and SHA-256 encode it as a code challenge.
    let (pkce_code_challenge, pkce_code_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(DRIVE_SCOPE.to_string()))
        .add_extra_param("access_type", "offline")
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    println!("Open this URL in your browser:\n{authorize_url}\n");

    let code = {
        // The server terminates itself after collecting the first code.
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let (mut stream, _) = listener.accept()?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        let redirect_url = request_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| anyhow!("Malformed redirect request"))?;
        let url = Url::parse(&format!("http://localhost{redirect_url}"))?;

        let parameter = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        let message = "Signed in. Go back to your terminal :)";
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
            message.len(),
            message
        );
        stream.write_all(response.as_bytes())?;

        if parameter("state").as_deref() != Some(csrf_state.secret().as_str()) {
            anyhow::bail!("Authorization state mismatch");
        }

        match (parameter("code"), parameter("error")) {
            (Some(code), _) => AuthorizationCode::new(code),
            (None, Some(error)) => anyhow::bail!("Authorization denied: {error}"),
            (None, None) => anyhow::bail!("Redirect carried no authorization code"),
        }
    };

    let token = client
        .exchange_code(code)
        .set_pkce_verifier(pkce_code_verifier)
        .request(http_client)
        .context("Failed to exchange the authorization code")?;

    tracing::info!("signed in");

    Ok(token)
}

fn save(path: impl AsRef<Path>, token: &CachedToken) -> anyhow::Result<()> {
    let token = serde_json::to_string(token)?;
    std::fs::write(path, token)?;
    Ok(())
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
