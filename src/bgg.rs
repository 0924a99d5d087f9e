use std::env;
use std::thread;
use std::time::Duration;

use failure::{bail, Error, Fail, ResultExt};
use log::{info, warn};
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Client, StatusCode};
use select::document::Document;
use select::predicate::Name;
use serde_json::{json, Value};

use crate::parse;
use crate::{CollectionItem, GameRecord, MarketplaceListing, PlayLogEntry};

pub const BASE_URL: &str = "https://boardgamegeek.com/xmlapi2";
pub const LOGIN_URL: &str = "https://boardgamegeek.com/login/api/v1";
pub const MARKET_URL: &str = "https://api.geekdo.com/api/market/products";

/// Cookie names that mark a usable authenticated session.
const SESSION_COOKIES: [&str; 2] = ["bggusername", "SessionID"];

pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Fail)]
pub enum BggError {
    /// Transient failures outlived the retry budget.
    #[fail(display = "gave up after {} attempts: {}", attempts, cause)]
    ConnectionExhausted { attempts: u32, cause: String },
    /// The service answered and said no such thing exists. Never retried.
    #[fail(display = "{}", _0)]
    ItemNotFound(String),
    #[fail(display = "response is missing the <{}> element", _0)]
    MalformedResponse(String),
}

/// Authentication state, resolved once before any data fetch and immutable
/// afterwards, so it can be shared freely across fetch workers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    bearer_token: Option<String>,
    cookies: Vec<String>, // "name=value" pairs from the login response
    pub authenticated: bool,
}

impl AuthContext {
    pub fn anonymous() -> AuthContext {
        AuthContext {
            bearer_token: None,
            cookies: Vec::new(),
            authenticated: false,
        }
    }

    /// Reads BGG_API_KEY / BGG_USERNAME / BGG_PASSWORD and performs the login
    /// call. Missing variables or a failed login only downgrade the context;
    /// they never abort client construction.
    pub fn from_env(client: &Client) -> AuthContext {
        let mut ctx = AuthContext::anonymous();
        ctx.bearer_token = env::var("BGG_API_KEY").ok().filter(|t| !t.is_empty());
        if ctx.bearer_token.is_none() {
            warn!("no BGG_API_KEY in environment, proceeding without a token");
        }
        let (username, password) = match (env::var("BGG_USERNAME"), env::var("BGG_PASSWORD")) {
            (Ok(u), Ok(p)) if !u.is_empty() && !p.is_empty() => (u, p),
            _ => {
                info!("BGG_USERNAME or BGG_PASSWORD not set, private collection fields will stay empty");
                return ctx;
            }
        };
        match login(client, &username, &password) {
            Ok(cookies) => {
                let has_session = SESSION_COOKIES
                    .iter()
                    .any(|name| cookies.iter().any(|c| c.starts_with(&format!("{}=", name))));
                if has_session {
                    info!("logged in as {}, private collection fields enabled", username);
                    ctx.cookies = cookies;
                    ctx.authenticated = true;
                } else {
                    // soft failure: the service accepted the call but handed
                    // out no session, so private fields stay unavailable
                    warn!(
                        "login as {} returned no session cookies, private collection fields will stay empty",
                        username
                    );
                }
            }
            Err(e) => warn!("could not log in as {}: {}", username, e),
        }
        ctx
    }
}

fn login(client: &Client, username: &str, password: &str) -> Result<Vec<String>, Error> {
    let payload = json!({ "credentials": { "username": username, "password": password } });
    let resp = client
        .post(LOGIN_URL)
        .json(&payload)
        .send()
        .with_context(|_| format!("could not reach `{}`", LOGIN_URL))?;
    let status = resp.status();
    if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
        bail!("login rejected with status {}", status);
    }
    let mut cookies = Vec::new();
    for value in resp.headers().get_all(SET_COOKIE).iter() {
        if let Ok(raw) = value.to_str() {
            if let Some(pair) = raw.split(';').next() {
                cookies.push(pair.trim().to_string());
            }
        }
    }
    Ok(cookies)
}

/// One plain HTTP GET. Implementations attach whatever auth state they hold;
/// retrying lives a layer above.
pub trait Transport {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<RawResponse, Error>;
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    auth: AuthContext,
}

impl HttpTransport {
    /// Builds the shared session and resolves authentication from the
    /// environment before any data call goes out.
    pub fn from_env(timeout: Duration) -> Result<HttpTransport, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let auth = AuthContext::from_env(&client);
        Ok(HttpTransport { client, auth })
    }

    pub fn authenticated(&self) -> bool {
        self.auth.authenticated
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<RawResponse, Error> {
        let mut request = self.client.get(url).query(params);
        if let Some(token) = &self.auth.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if !self.auth.cookies.is_empty() {
            request = request.header(COOKIE, self.auth.cookies.join("; "));
        }
        let mut resp = request
            .send()
            .with_context(|_| format!("could not reach `{}`", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("request to `{}` failed with status {}", url, status);
        }
        let body = resp.text()?;
        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Bounded retry schedule. The default is the flat three-attempt schedule;
/// `batch` is the patient one used for per-game and marketplace sweeps.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
    pub backoff: f64, // 1.0 keeps the delay flat
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        RetryPolicy {
            retries: 3,
            delay: Duration::from_secs(5),
            backoff: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn batch() -> RetryPolicy {
        RetryPolicy {
            retries: 10,
            delay: Duration::from_secs(3),
            backoff: 2.0,
        }
    }

    fn delay_for(&self, prior_sleeps: u32) -> Duration {
        let factor = self.backoff.powi(prior_sleeps as i32);
        Duration::from_millis((self.delay.as_millis() as f64 * factor) as u64)
    }
}

enum Outcome<D> {
    Done(D),
    Fatal(Error),
    Again(String),
}

/// Runs one endpoint call under the policy. Transport errors and "try again"
/// classifications burn an attempt each; a fatal classification surfaces
/// immediately with the budget untouched.
fn run_retries<D>(
    transport: &impl Transport,
    policy: &RetryPolicy,
    url: &str,
    params: &[(&str, String)],
    classify: impl Fn(RawResponse) -> Outcome<D>,
) -> Result<D, Error> {
    let mut last_cause = String::from("no attempts were made");
    for attempt in 1..=policy.retries {
        if attempt > 1 {
            thread::sleep(policy.delay_for(attempt - 2));
        }
        match transport.get(url, params) {
            Err(e) => {
                warn!(
                    "request to `{}` failed (attempt {}/{}): {}",
                    url, attempt, policy.retries, e
                );
                last_cause = e.to_string();
            }
            Ok(resp) => match classify(resp) {
                Outcome::Done(value) => return Ok(value),
                Outcome::Fatal(e) => return Err(e),
                Outcome::Again(cause) => {
                    warn!(
                        "retrying `{}` (attempt {}/{}): {}",
                        url, attempt, policy.retries, cause
                    );
                    last_cause = cause;
                }
            },
        }
    }
    Err(BggError::ConnectionExhausted {
        attempts: policy.retries,
        cause: last_cause,
    }
    .into())
}

fn classify_document(resp: RawResponse, expected_root: &str) -> Outcome<Document> {
    if resp.status == StatusCode::ACCEPTED.as_u16() {
        return Outcome::Again(String::from("result is still being generated"));
    }
    let doc = Document::from(resp.body.as_str());
    if let Some(error) = doc.find(Name("error")).next() {
        let message = error
            .find(Name("message"))
            .next()
            .map(|m| m.text().trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| String::from("item not found"));
        return Outcome::Fatal(BggError::ItemNotFound(message).into());
    }
    if doc.find(Name(expected_root)).next().is_none() {
        return Outcome::Again(
            BggError::MalformedResponse(expected_root.to_string()).to_string(),
        );
    }
    Outcome::Done(doc)
}

fn classify_json(resp: RawResponse) -> Outcome<Value> {
    if resp.status == StatusCode::ACCEPTED.as_u16() {
        return Outcome::Again(String::from("result is still being generated"));
    }
    match serde_json::from_str(&resp.body) {
        Ok(value) => Outcome::Done(value),
        Err(e) => Outcome::Again(format!("body is not valid json: {}", e)),
    }
}

pub fn request_document<T: Transport>(
    transport: &T,
    policy: &RetryPolicy,
    url: &str,
    params: &[(&str, String)],
    expected_root: &str,
) -> Result<Document, Error> {
    run_retries(transport, policy, url, params, |resp| {
        classify_document(resp, expected_root)
    })
}

pub fn request_json<T: Transport>(
    transport: &T,
    policy: &RetryPolicy,
    url: &str,
    params: &[(&str, String)],
) -> Result<Value, Error> {
    run_retries(transport, policy, url, params, classify_json)
}

#[derive(Debug, Clone)]
pub enum GameQuery {
    Id(u32),
    Name(String),
}

impl GameQuery {
    pub fn parse(raw: &str) -> GameQuery {
        match raw.parse() {
            Ok(id) => GameQuery::Id(id),
            Err(_) => GameQuery::Name(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    pub owned_only: bool,
    pub exclude_subtype: Option<String>,
    pub wishlist: bool,
    pub preordered: bool,
    pub include_private: bool,
}

impl CollectionFilter {
    /// Owned base games only, private fields included when available.
    pub fn owned() -> CollectionFilter {
        CollectionFilter {
            owned_only: true,
            exclude_subtype: Some(String::from("boardgameexpansion")),
            wishlist: false,
            preordered: false,
            include_private: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BggClient<T: Transport = HttpTransport> {
    transport: T,
    policy: RetryPolicy,
    batch_size: usize,
}

impl BggClient<HttpTransport> {
    pub fn from_env(
        timeout: Duration,
        policy: RetryPolicy,
        batch_size: usize,
    ) -> Result<BggClient<HttpTransport>, Error> {
        Ok(BggClient {
            transport: HttpTransport::from_env(timeout)?,
            policy,
            batch_size,
        })
    }
}

impl<T: Transport> BggClient<T> {
    pub fn with_transport(transport: T, policy: RetryPolicy) -> BggClient<T> {
        BggClient {
            transport,
            policy,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One game by id, or by name via the search endpoint (exact match first,
    /// then fuzzy).
    pub fn game(&self, query: &GameQuery, versions: bool) -> Result<GameRecord, Error> {
        let id = match query {
            GameQuery::Id(id) => *id,
            GameQuery::Name(name) => self.search(name)?,
        };
        let mut params = vec![
            ("id", id.to_string()),
            ("stats", String::from("1")),
            ("type", String::from("boardgame")),
        ];
        if versions {
            params.push(("versions", String::from("1")));
        }
        let url = format!("{}/thing", BASE_URL);
        let doc = request_document(&self.transport, &self.policy, &url, &params, "items")?;
        match doc.find(Name("item")).next() {
            Some(item) => Ok(parse::game(item, versions)),
            None => Err(BggError::ItemNotFound(format!("no game with id {}", id)).into()),
        }
    }

    /// Fetches many games, `batch_size` ids per request to stay under the
    /// service's request limits. One failed chunk fails the whole call; ids
    /// the service leaves out of an answered chunk are simply absent.
    pub fn game_list(&self, ids: &[u32]) -> Result<Vec<GameRecord>, Error> {
        let url = format!("{}/thing", BASE_URL);
        let mut games = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.batch_size.max(1)) {
            let joined = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let params = vec![
                ("id", joined),
                ("stats", String::from("1")),
                ("type", String::from("boardgame")),
            ];
            let doc = request_document(&self.transport, &self.policy, &url, &params, "items")?;
            for item in doc.find(Name("item")) {
                games.push(parse::game(item, false));
            }
        }
        Ok(games)
    }

    pub fn collection(
        &self,
        user: &str,
        filter: &CollectionFilter,
    ) -> Result<Vec<CollectionItem>, Error> {
        let mut params = vec![("username", user.to_string()), ("stats", String::from("1"))];
        if filter.owned_only {
            params.push(("own", String::from("1")));
        }
        if filter.wishlist {
            params.push(("wishlist", String::from("1")));
        }
        if filter.preordered {
            params.push(("preordered", String::from("1")));
        }
        if let Some(subtype) = &filter.exclude_subtype {
            params.push(("excludesubtype", subtype.clone()));
        }
        if filter.include_private {
            params.push(("showprivate", String::from("1")));
        }
        let url = format!("{}/collection", BASE_URL);
        let doc = request_document(&self.transport, &self.policy, &url, &params, "items")?;
        Ok(doc
            .find(Name("item"))
            .map(|item| parse::collection_item(item, filter.wishlist))
            .collect())
    }

    /// Pages through the play log starting at page 1 until a page comes back
    /// empty.
    pub fn plays(&self, user: &str) -> Result<Vec<PlayLogEntry>, Error> {
        let url = format!("{}/plays", BASE_URL);
        let mut entries = Vec::new();
        let mut page = 1u32;
        loop {
            let params = vec![("username", user.to_string()), ("page", page.to_string())];
            let doc = request_document(&self.transport, &self.policy, &url, &params, "plays")?;
            let mut batch = parse::plays(&doc);
            if batch.is_empty() {
                break;
            }
            entries.append(&mut batch);
            page += 1;
        }
        Ok(entries)
    }

    pub fn user_id(&self, user: &str) -> Result<u32, Error> {
        let url = format!("{}/user", BASE_URL);
        let params = vec![("name", user.to_string()), ("type", String::from("user"))];
        let doc = request_document(&self.transport, &self.policy, &url, &params, "user")?;
        doc.find(Name("user"))
            .next()
            .and_then(|node| node.attr("id"))
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| BggError::ItemNotFound(format!("no user named `{}`", user)).into())
    }

    /// Active in-stock marketplace inventory of one user. Listings without an
    /// id or a price are dropped.
    pub fn marketplace_listings(&self, user: &str) -> Result<Vec<MarketplaceListing>, Error> {
        let user_id = self.user_id(user)?;
        info!("resolved user `{}` to id {}", user, user_id);
        let params = vec![
            ("ajax", String::from("1")),
            ("browsetype", String::from("inventory")),
            ("userid", user_id.to_string()),
            ("productstate", String::from("active")),
            ("stock", String::from("instock")),
            ("sort", String::from("title")),
            ("pageid", String::from("1")),
        ];
        let data = request_json(&self.transport, &self.policy, MARKET_URL, &params)?;
        let listings = parse::marketplace(&data);
        info!("found {} marketplace listings for `{}`", listings.len(), user);
        Ok(listings)
    }

    fn search(&self, name: &str) -> Result<u32, Error> {
        let url = format!("{}/search", BASE_URL);
        for exact in &["1", "0"] {
            let params = vec![
                ("query", name.to_string()),
                ("type", String::from("boardgame")),
                ("exact", String::from(*exact)),
            ];
            let doc = request_document(&self.transport, &self.policy, &url, &params, "items")?;
            let id = doc
                .find(Name("item"))
                .next()
                .and_then(|item| item.attr("id"))
                .and_then(|id| id.parse().ok());
            if let Some(id) = id {
                return Ok(id);
            }
        }
        Err(BggError::ItemNotFound(format!("no games found matching `{}`", name)).into())
    }
}

impl<T: Transport + Clone> BggClient<T> {
    /// Same transport (and therefore the same session) under another retry
    /// schedule.
    pub fn with_policy(&self, policy: RetryPolicy) -> BggClient<T> {
        BggClient {
            transport: self.transport.clone(),
            policy,
            batch_size: self.batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct ScriptedTransport {
        responses: RefCell<VecDeque<Result<RawResponse, String>>>,
        calls: Cell<u32>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<RawResponse, String>>) -> ScriptedTransport {
            ScriptedTransport {
                responses: RefCell::new(responses.into_iter().collect()),
                calls: Cell::new(0),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, _url: &str, _params: &[(&str, String)]) -> Result<RawResponse, Error> {
            self.calls.set(self.calls.get() + 1);
            match self.responses.borrow_mut().pop_front() {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(msg)) => Err(failure::err_msg(msg)),
                None => Err(failure::err_msg("script ran out of responses")),
            }
        }
    }

    fn ok(body: &str) -> Result<RawResponse, String> {
        Ok(RawResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn accepted() -> Result<RawResponse, String> {
        Ok(RawResponse {
            status: 202,
            body: String::from("<message>Your request has been accepted</message>"),
        })
    }

    fn broken() -> Result<RawResponse, String> {
        Err(String::from("connection reset"))
    }

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay: Duration::from_millis(0),
            backoff: 1.0,
        }
    }

    const GLOOMHAVEN: &str = r#"<items>
        <item type="boardgame" id="174430">
            <name type="primary" value="Gloomhaven"/>
            <minplayers value="1"/>
            <maxplayers value="4"/>
            <playingtime value="120"/>
        </item>
    </items>"#;

    fn client(transport: ScriptedTransport, retries: u32) -> BggClient<ScriptedTransport> {
        BggClient::with_transport(transport, fast_policy(retries))
    }

    #[test]
    fn transient_failures_within_budget_recover() {
        let bgg = client(
            ScriptedTransport::new(vec![broken(), broken(), ok(GLOOMHAVEN)]),
            3,
        );
        let game = bgg.game(&GameQuery::Id(174430), false).unwrap();
        assert_eq!(game.id, 174430);
        assert_eq!(game.name, "Gloomhaven");
        assert_eq!(bgg.transport().calls.get(), 3);
    }

    #[test]
    fn exhausted_budget_surfaces_connection_exhausted() {
        let bgg = client(
            ScriptedTransport::new(vec![broken(), broken(), broken(), ok(GLOOMHAVEN)]),
            3,
        );
        let err = bgg.game(&GameQuery::Id(174430), false).unwrap_err();
        match err.downcast_ref::<BggError>() {
            Some(BggError::ConnectionExhausted { attempts, .. }) => assert_eq!(*attempts, 3),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(bgg.transport().calls.get(), 3);
    }

    #[test]
    fn error_document_fails_immediately_without_retry() {
        let bgg = client(
            ScriptedTransport::new(vec![ok(
                "<error><message>Invalid item id specified</message></error>",
            )]),
            3,
        );
        let err = bgg.game(&GameQuery::Id(999999999), false).unwrap_err();
        match err.downcast_ref::<BggError>() {
            Some(BggError::ItemNotFound(msg)) => {
                assert_eq!(msg, "Invalid item id specified")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(bgg.transport().calls.get(), 1);
    }

    #[test]
    fn accepted_status_is_retried() {
        let bgg = client(ScriptedTransport::new(vec![accepted(), ok(GLOOMHAVEN)]), 3);
        let game = bgg.game(&GameQuery::Id(174430), false).unwrap();
        assert_eq!(game.id, 174430);
        assert_eq!(bgg.transport().calls.get(), 2);
    }

    #[test]
    fn malformed_bodies_are_retried_until_the_budget_runs_out() {
        let bgg = client(
            ScriptedTransport::new(vec![
                ok("definitely not xml"),
                ok("definitely not xml"),
                ok("definitely not xml"),
            ]),
            3,
        );
        let err = bgg.game(&GameQuery::Id(174430), false).unwrap_err();
        match err.downcast_ref::<BggError>() {
            Some(BggError::ConnectionExhausted { attempts, cause }) => {
                assert_eq!(*attempts, 3);
                assert!(cause.contains("missing the <items> element"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(bgg.transport().calls.get(), 3);
    }

    #[test]
    fn empty_items_is_item_not_found() {
        let bgg = client(ScriptedTransport::new(vec![ok("<items></items>")]), 3);
        let err = bgg.game(&GameQuery::Id(42), false).unwrap_err();
        match err.downcast_ref::<BggError>() {
            Some(BggError::ItemNotFound(_)) => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn search_falls_back_to_fuzzy_match() {
        let bgg = client(
            ScriptedTransport::new(vec![
                ok("<items total=\"0\"></items>"),
                ok("<items total=\"1\"><item type=\"boardgame\" id=\"174430\"/></items>"),
                ok(GLOOMHAVEN),
            ]),
            3,
        );
        let game = bgg
            .game(&GameQuery::Name(String::from("Gloomhaven")), false)
            .unwrap();
        assert_eq!(game.id, 174430);
        assert_eq!(bgg.transport().calls.get(), 3);
    }

    #[test]
    fn name_without_matches_is_item_not_found() {
        let bgg = client(
            ScriptedTransport::new(vec![
                ok("<items total=\"0\"></items>"),
                ok("<items total=\"0\"></items>"),
            ]),
            3,
        );
        let err = bgg
            .game(&GameQuery::Name(String::from("No Such Game")), false)
            .unwrap_err();
        match err.downcast_ref::<BggError>() {
            Some(BggError::ItemNotFound(msg)) => assert!(msg.contains("No Such Game")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(bgg.transport().calls.get(), 2);
    }

    /// Answers every `/thing` request with one item per requested id and
    /// records the chunk sizes it saw.
    struct EchoTransport {
        chunks: RefCell<Vec<usize>>,
    }

    impl Transport for EchoTransport {
        fn get(&self, _url: &str, params: &[(&str, String)]) -> Result<RawResponse, Error> {
            let ids = params
                .iter()
                .find(|(key, _)| *key == "id")
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            let requested: Vec<&str> = ids.split(',').collect();
            self.chunks.borrow_mut().push(requested.len());
            let items: String = requested
                .iter()
                .map(|id| {
                    format!(
                        "<item type=\"boardgame\" id=\"{}\"><name type=\"primary\" value=\"Game {}\"/></item>",
                        id, id
                    )
                })
                .collect();
            Ok(RawResponse {
                status: 200,
                body: format!("<items>{}</items>", items),
            })
        }
    }

    #[test]
    fn game_list_chunks_requests_and_concatenates() {
        let bgg = BggClient::with_transport(
            EchoTransport {
                chunks: RefCell::new(Vec::new()),
            },
            fast_policy(3),
        );
        let ids: Vec<u32> = (1..=45).collect();
        let games = bgg.game_list(&ids).unwrap();
        assert_eq!(games.len(), 45);
        assert_eq!(*bgg.transport().chunks.borrow(), vec![20, 20, 5]);
        let got: Vec<u32> = games.iter().map(|g| g.id).collect();
        assert_eq!(got, ids);
    }

    #[test]
    fn empty_collection_is_not_an_error() {
        let bgg = client(
            ScriptedTransport::new(vec![ok(
                "<items totalitems=\"0\" termsofuse=\"https://boardgamegeek.com/xmlapi/termsofuse\"></items>",
            )]),
            3,
        );
        let items = bgg.collection("somebody", &CollectionFilter::owned()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn plays_pages_until_an_empty_page() {
        let page = |plays: &str| {
            ok(&format!(
                "<plays username=\"bob\" userid=\"99\">{}</plays>",
                plays
            ))
        };
        let bgg = client(
            ScriptedTransport::new(vec![
                page(
                    "<play id=\"1\" date=\"2023-01-10\" quantity=\"1\"><item name=\"Catan\" objectid=\"13\"/></play>\
                     <play id=\"2\" date=\"2023-01-12\" quantity=\"2\"><item name=\"Azul\" objectid=\"230802\"/></play>",
                ),
                page("<play id=\"3\" date=\"2023-02-01\" quantity=\"1\"><item name=\"Catan\" objectid=\"13\"/></play>"),
                page(""),
            ]),
            3,
        );
        let plays = bgg.plays("bob").unwrap();
        assert_eq!(plays.len(), 3);
        assert_eq!(bgg.transport().calls.get(), 3);
        assert_eq!(plays[0].game_name, "Catan");
        assert_eq!(plays[1].quantity, 2);
    }

    #[test]
    fn unresolvable_user_is_item_not_found() {
        let bgg = client(
            ScriptedTransport::new(vec![ok("<user id=\"\" name=\"nobody\"></user>")]),
            3,
        );
        let err = bgg.user_id("nobody").unwrap_err();
        match err.downcast_ref::<BggError>() {
            Some(BggError::ItemNotFound(msg)) => assert!(msg.contains("nobody")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn marketplace_resolves_user_then_filters_incomplete_listings() {
        let bgg = client(
            ScriptedTransport::new(vec![
                ok("<user id=\"99\" name=\"bob\"></user>"),
                ok(r#"{"products": [
                    {"objectid": 13, "price": "25.00", "currency": "EUR", "condition": "likenew", "productid": 777},
                    {"objectid": 14, "currency": "EUR", "productid": 778},
                    {"price": "10.00", "currency": "EUR", "productid": 779}
                ]}"#),
            ]),
            3,
        );
        let listings = bgg.marketplace_listings("bob").unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].item_id, 13);
        assert_eq!(listings[0].price, 25.0);
        assert_eq!(
            listings[0].link,
            "https://boardgamegeek.com/market/product/777"
        );
        assert_eq!(bgg.transport().calls.get(), 2);
    }
}
