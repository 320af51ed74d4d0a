//! `MediaWikiClient`: [`WikiApi`] over the MediaWiki action API (`api.php`).
//!
//! All requests use `format=json&formatversion=2`. The session's cookie header
//! is attached to every request after login, and writes carry its edit token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{multipart, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::{ClientConfig, Credentials, TeamWikiConfig};
use crate::contract::{ListQuery, PageListing, PageRecord, RemoteRevision, Session, WikiApi};
use crate::error::WikiError;

/// Token MediaWiki hands out to anonymous users.
const ANONYMOUS_TOKEN: &str = "+\\";

pub struct MediaWikiClient {
    http: Client,
    api_url: Url,
}

impl MediaWikiClient {
    pub fn new(api_url: &str, config: &ClientConfig) -> Result<Self, WikiError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| WikiError::Malformed(format!("invalid API URL {api_url}: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        info!(api_url = %api_url, timeout_secs = config.timeout_secs, "Initialised MediaWiki client");
        Ok(Self { http, api_url })
    }

    /// Client for the team's yearly wiki, honouring `config.api_url` when set.
    pub fn for_team(team: &TeamWikiConfig, config: &ClientConfig) -> Result<Self, WikiError> {
        Self::new(&config.api_url_for(team), config)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn get(&self, params: &[(&str, &str)]) -> RequestBuilder {
        self.http
            .get(self.api_url.clone())
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
    }

    fn post(&self) -> RequestBuilder {
        self.http
            .post(self.api_url.clone())
            .query(&[("format", "json"), ("formatversion", "2")])
    }

    /// Sends a request, stores any cookies it sets into `jar`, and decodes the JSON body.
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        jar: Option<&Jar>,
    ) -> Result<T, WikiError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        if let Some(jar) = jar {
            let mut cookies = response.headers().get_all(SET_COOKIE).iter();
            jar.set_cookies(&mut cookies, &self.api_url);
        }
        if !status.is_success() {
            error!(status = %status, url = %url, "Wiki API returned error status");
            return Err(WikiError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body: Value = response.json().await?;
        if let Some(err) = body.get("error") {
            let err: ApiErrorBody = serde_json::from_value(err.clone())?;
            debug!(code = %err.code, info = %err.info, "Wiki API returned error object");
            return Err(WikiError::Api {
                code: err.code,
                info: err.info,
            });
        }
        Ok(serde_json::from_value(body)?)
    }

    fn with_session(request: RequestBuilder, session: &Session) -> RequestBuilder {
        if session.cookie_header().is_empty() {
            request
        } else {
            request.header(COOKIE, session.cookie_header())
        }
    }

    fn with_jar(&self, request: RequestBuilder, jar: &Jar) -> RequestBuilder {
        match jar.cookies(&self.api_url) {
            Some(value) => request.header(COOKIE, value),
            None => request,
        }
    }

    async fn fetch_token(&self, kind: &str, jar: &Jar) -> Result<String, WikiError> {
        let request = self.with_jar(self.get(&[("action", "query"), ("meta", "tokens"), ("type", kind)]), jar);
        let body: TokensResponse = self.call(request, Some(jar)).await?;
        let tokens = body.query.tokens;
        let token = match kind {
            "login" => tokens.logintoken,
            _ => tokens.csrftoken,
        };
        token.ok_or_else(|| WikiError::Malformed(format!("no {kind} token in response")))
    }
}

#[async_trait]
impl WikiApi for MediaWikiClient {
    async fn authenticate(
        &self,
        config: &TeamWikiConfig,
        credentials: &Credentials,
    ) -> Result<Session, WikiError> {
        let jar = Jar::default();
        let login_token = self.fetch_token("login", &jar).await?;

        let form = [
            ("action", "login"),
            ("lgname", credentials.username.as_str()),
            ("lgpassword", credentials.password.as_str()),
            ("lgtoken", login_token.as_str()),
        ];
        let request = self.with_jar(self.post().form(&form), &jar);
        let body: LoginResponse = self.call(request, Some(&jar)).await?;
        if body.login.result != "Success" {
            let reason = body.login.reason.unwrap_or(body.login.result);
            return Err(WikiError::Rejected(reason));
        }

        let edit_token = self.fetch_token("csrf", &jar).await?;
        if edit_token == ANONYMOUS_TOKEN {
            return Err(WikiError::Rejected("session is not logged in".to_string()));
        }

        let cookie_header = jar
            .cookies(&self.api_url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .unwrap_or_default();
        let username = body.login.lgusername.unwrap_or_else(|| credentials.username.clone());
        Ok(Session::new(config.clone(), username, cookie_header, edit_token))
    }

    async fn read_page(
        &self,
        session: &Session,
        title: &str,
    ) -> Result<Option<RemoteRevision>, WikiError> {
        let request = self.get(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("titles", title),
            ("rvprop", "content|timestamp"),
            ("rvslots", "main"),
        ]);
        let body: QueryResponse<RevisionPage> =
            self.call(Self::with_session(request, session), None).await?;
        let Some(page) = body.query.and_then(|q| q.pages.into_iter().next()) else {
            return Ok(None);
        };
        if page.invalid {
            return Err(WikiError::Api {
                code: "invalidtitle".to_string(),
                info: format!("{title} is not a valid title"),
            });
        }
        if page.missing {
            return Ok(None);
        }
        let revision = page
            .revisions
            .into_iter()
            .next()
            .ok_or_else(|| WikiError::Malformed(format!("{title} has no revisions")))?;
        Ok(Some(RemoteRevision {
            title: page.title,
            content: revision.slots.main.content,
            timestamp: revision.timestamp,
        }))
    }

    async fn read_file(
        &self,
        session: &Session,
        title: &str,
    ) -> Result<Option<Vec<u8>>, WikiError> {
        let request = self.get(&[
            ("action", "query"),
            ("prop", "imageinfo"),
            ("titles", title),
            ("iiprop", "url"),
        ]);
        let body: QueryResponse<ImagePage> =
            self.call(Self::with_session(request, session), None).await?;
        let Some(info) = body
            .query
            .and_then(|q| q.pages.into_iter().next())
            .and_then(|page| page.imageinfo.into_iter().next())
        else {
            return Ok(None);
        };

        let file_url = self
            .api_url
            .join(&info.url)
            .map_err(|e| WikiError::Malformed(format!("invalid file URL {}: {e}", info.url)))?;
        let response = Self::with_session(self.http.get(file_url.clone()), session)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WikiError::Status {
                status: response.status().as_u16(),
                url: file_url.to_string(),
            });
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn write_page(&self, session: &Session, title: &str, text: &str) -> Result<(), WikiError> {
        let form = [
            ("action", "edit"),
            ("title", title),
            ("text", text),
            ("token", session.edit_token()),
        ];
        let request = Self::with_session(self.post().form(&form), session);
        let body: EditResponse = self.call(request, None).await?;
        if body.edit.result != "Success" {
            return Err(WikiError::Api {
                code: "editfailed".to_string(),
                info: format!("edit of {title} returned {}", body.edit.result),
            });
        }
        debug!(title, nochange = body.edit.nochange, "Page edit accepted");
        Ok(())
    }

    async fn upload_file(
        &self,
        session: &Session,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), WikiError> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("action", "upload")
            .text("filename", file_name.to_string())
            .text("ignorewarnings", "1")
            .text("token", session.edit_token().to_string())
            .part("file", part);
        let request = Self::with_session(self.post().multipart(form), session);
        let body: UploadResponse = self.call(request, None).await?;
        if body.upload.result != "Success" {
            return Err(WikiError::Api {
                code: "uploadfailed".to_string(),
                info: format!("upload of {file_name} returned {}", body.upload.result),
            });
        }
        Ok(())
    }

    async fn list_pages(
        &self,
        session: &Session,
        query: &ListQuery,
        continue_from: Option<String>,
    ) -> Result<PageListing, WikiError> {
        let namespace = query.namespace.to_string();
        let mut params = vec![
            ("action", "query"),
            ("generator", "allpages"),
            ("gapnamespace", namespace.as_str()),
            ("gapprefix", query.prefix.as_str()),
            ("gaplimit", "max"),
            ("prop", "info"),
        ];
        if let Some(from) = continue_from.as_deref() {
            params.push(("gapcontinue", from));
            params.push(("continue", "gapcontinue||"));
        }
        let request = self.get(&params);
        let body: QueryResponse<InfoPage> =
            self.call(Self::with_session(request, session), None).await?;

        let pages = body
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_iter()
            .map(|page| PageRecord {
                title: page.title,
                last_modified: page.touched,
            })
            .collect();
        let next = body.continuation.and_then(|c| c.gapcontinue);
        Ok(PageListing { pages, next })
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize)]
struct TokensResponse {
    query: TokensQuery,
}

#[derive(Deserialize)]
struct TokensQuery {
    tokens: Tokens,
}

#[derive(Deserialize)]
struct Tokens {
    logintoken: Option<String>,
    csrftoken: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    login: LoginResult,
}

#[derive(Deserialize)]
struct LoginResult {
    result: String,
    reason: Option<String>,
    lgusername: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse<P> {
    #[serde(rename = "continue")]
    continuation: Option<Continuation>,
    query: Option<PagesQuery<P>>,
}

#[derive(Deserialize)]
struct Continuation {
    gapcontinue: Option<String>,
}

#[derive(Deserialize)]
struct PagesQuery<P> {
    #[serde(default = "Vec::new")]
    pages: Vec<P>,
}

#[derive(Deserialize)]
struct RevisionPage {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Deserialize)]
struct Revision {
    timestamp: Option<DateTime<Utc>>,
    slots: Slots,
}

#[derive(Deserialize)]
struct Slots {
    main: Slot,
}

#[derive(Deserialize)]
struct Slot {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ImagePage {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Deserialize)]
struct ImageInfo {
    url: String,
}

#[derive(Deserialize)]
struct InfoPage {
    title: String,
    touched: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct EditResponse {
    edit: EditResult,
}

#[derive(Deserialize)]
struct EditResult {
    result: String,
    #[serde(default)]
    nochange: bool,
}

#[derive(Deserialize)]
struct UploadResponse {
    upload: UploadResult,
}

#[derive(Deserialize)]
struct UploadResult {
    result: String,
}
