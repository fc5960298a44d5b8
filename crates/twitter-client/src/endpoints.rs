//! REST endpoint methods
//!
//! Thin call sites over `Client::get`/`post` and the pagination iterators.
//! Rate limits, server errors and transient faults never reach these
//! methods; they only decide the URL, the parameters and what a 404 means.

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use transport::ApiRequest;

use crate::client::Client;
use crate::error::Result;
use crate::options::RequestOptions;
use crate::paginate::{
    MaxIdPages, array_items, cursor_ids, max_id_items, next_chunk, search_statuses, sort_by_id,
};

/// Which subset of search results to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Mixed,
    #[default]
    Recent,
    Popular,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Mixed => "mixed",
            ResultType::Recent => "recent",
            ResultType::Popular => "popular",
        }
    }
}

/// Fixed parameters of a search, held across pages.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub max_id: Option<String>,
    pub since_id: Option<String>,
    pub lang: Option<String>,
    pub result_type: ResultType,
    /// `latitude,longitude,radius`
    pub geocode: Option<String>,
}

/// A user named by id or by screen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(String),
    ScreenName(String),
}

impl UserRef {
    /// All digits is an id; anything else a screen name with any leading
    /// `@` removed.
    pub fn parse(user: &str) -> Self {
        let user = user.trim().trim_start_matches('@');
        if !user.is_empty() && user.bytes().all(|b| b.is_ascii_digit()) {
            UserRef::Id(user.to_string())
        } else {
            UserRef::ScreenName(user.to_string())
        }
    }

    fn param(&self) -> (&'static str, &str) {
        match self {
            UserRef::Id(id) => ("user_id", id),
            UserRef::ScreenName(name) => ("screen_name", name.trim_start_matches('@')),
        }
    }
}

/// Users to look up.
#[derive(Debug, Clone)]
pub enum UserLookup {
    Ids(Vec<String>),
    ScreenNames(Vec<String>),
}

impl Client {
    /// Tweets matching `query`, newest first, across all available pages.
    pub fn search(
        &mut self,
        query: &str,
        options: SearchOptions,
    ) -> impl Stream<Item = Result<Value>> + '_ {
        info!(query, "starting search");
        let mut request = ApiRequest::get(self.config().api_url("search/tweets.json"))
            .query("q", query)
            .query("count", 100)
            .query("result_type", options.result_type.as_str());
        if let Some(lang) = &options.lang {
            request.set_query("lang", lang);
        }
        if let Some(geocode) = &options.geocode {
            request.set_query("geocode", geocode);
        }
        max_id_items(
            self,
            MaxIdPages {
                request,
                options: RequestOptions::default(),
                items: search_statuses,
                max_id: options.max_id,
                since_id: options.since_id,
                end_on_not_found: false,
                only_user: None,
            },
        )
    }

    /// A user's most recent tweets. A 404 ends the sequence.
    pub fn timeline(
        &mut self,
        user: UserRef,
        max_id: Option<String>,
        since_id: Option<String>,
    ) -> impl Stream<Item = Result<Value>> + '_ {
        let (id_type, id) = user.param();
        info!(user = id, "starting user timeline");
        let request = ApiRequest::get(self.config().api_url("statuses/user_timeline.json"))
            .query("count", 200)
            .query(id_type, id);
        // Unknown ids have been seen to return other users' tweets.
        let only_user = match &user {
            UserRef::Id(id) => Some(id.clone()),
            UserRef::ScreenName(_) => None,
        };
        max_id_items(
            self,
            MaxIdPages {
                request,
                options: RequestOptions::allow_not_found(),
                items: array_items,
                max_id,
                since_id,
                end_on_not_found: true,
                only_user,
            },
        )
    }

    /// Ids of the accounts following `user` (id or screen name).
    pub fn follower_ids(&mut self, user: &str) -> impl Stream<Item = Result<String>> + '_ {
        self.user_ids("followers/ids.json", UserRef::parse(user))
    }

    /// Ids of the accounts `user` follows (id or screen name).
    pub fn friend_ids(&mut self, user: &str) -> impl Stream<Item = Result<String>> + '_ {
        self.user_ids("friends/ids.json", UserRef::parse(user))
    }

    fn user_ids(&mut self, path: &str, user: UserRef) -> impl Stream<Item = Result<String>> + '_ {
        let (id_type, id) = user.param();
        let request = ApiRequest::get(self.config().api_url(path)).query(id_type, id);
        let label = id.to_string();
        cursor_ids(self, request, RequestOptions::allow_not_found()).inspect(move |item| {
            if let Err(err) = item
                && err.status() == Some(404)
            {
                info!(user = %label, "no users matching");
            }
        })
    }

    /// Full user objects, looked up 100 at a time.
    pub fn user_lookup(&mut self, lookup: UserLookup) -> impl Stream<Item = Result<Value>> + '_ {
        let (id_type, ids) = match lookup {
            UserLookup::Ids(ids) => ("user_id", ids),
            UserLookup::ScreenNames(names) => (
                "screen_name",
                names
                    .into_iter()
                    .map(|n| n.trim().trim_start_matches('@').to_string())
                    .collect(),
            ),
        };
        let url = self.config().api_url("users/lookup.json");
        let client = self;

        stream! {
            let mut ids = ids.into_iter().map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
            loop {
                let chunk = next_chunk(&mut ids);
                if chunk.is_empty() {
                    return;
                }
                let joined = chunk.join(",");
                info!(count = chunk.len(), "looking up users");
                let request = ApiRequest::get(url.as_str()).query(id_type, &joined);
                let users = match client.get_json(request, RequestOptions::allow_not_found()).await {
                    Ok(users) => users,
                    Err(err) => {
                        if err.status() == Some(404) {
                            warn!(ids = %joined, "no users matching");
                        }
                        yield Err(err);
                        return;
                    }
                };
                match array_items(users) {
                    Ok(users) => {
                        for user in users {
                            yield Ok(user);
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }
    }

    /// Tweets for the given ids, looked up 100 at a time and sorted by id
    /// within each lookup. Ids the API does not return are skipped.
    pub fn hydrate<'a, I>(&'a mut self, ids: I) -> impl Stream<Item = Result<Value>> + 'a
    where
        I: IntoIterator<Item = String> + 'a,
        I::IntoIter: 'a,
    {
        let url = self.config().api_url("statuses/lookup.json");
        let client = self;

        stream! {
            let mut ids = ids.into_iter().map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
            loop {
                let chunk = next_chunk(&mut ids);
                if chunk.is_empty() {
                    return;
                }
                info!(count = chunk.len(), "hydrating ids");
                let request = ApiRequest::post(url.as_str()).form("id", chunk.join(","));
                let tweets = match client.post_json(request, RequestOptions::default()).await {
                    Ok(tweets) => array_items(tweets),
                    Err(err) => Err(err),
                };
                match tweets {
                    Ok(mut tweets) => {
                        sort_by_id(&mut tweets);
                        for tweet in tweets {
                            yield Ok(tweet);
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }
    }

    /// A single tweet, if the API returns it.
    pub async fn tweet(&mut self, id: &str) -> Result<Option<Value>> {
        let request = ApiRequest::post(self.config().api_url("statuses/lookup.json")).form("id", id.trim());
        let tweets = array_items(self.post_json(request, RequestOptions::default()).await?)?;
        Ok(tweets.into_iter().next())
    }

    /// Up to the last 100 retweets of a tweet.
    pub async fn retweets(&mut self, id: &str) -> Result<Vec<Value>> {
        info!(id, "retrieving retweets");
        let path = format!("statuses/retweets/{}.json", id.trim());
        let request = ApiRequest::get(self.config().api_url(&path)).query("count", 100);
        array_items(self.get_json(request, RequestOptions::default()).await?)
    }

    /// Regions with trend data.
    pub async fn trends_available(&mut self) -> Result<Value> {
        let request = ApiRequest::get(self.config().api_url("trends/available.json"));
        self.get_json(request, RequestOptions::default()).await
    }

    /// Current trends for a WOEID. `exclude = Some("hashtags")` drops
    /// hashtag trends.
    pub async fn trends_place(&mut self, woeid: u64, exclude: Option<&str>) -> Result<Value> {
        let mut request =
            ApiRequest::get(self.config().api_url("trends/place.json")).query("id", woeid);
        if let Some(exclude) = exclude {
            request.set_query("exclude", exclude);
        }
        self.get_json(request, RequestOptions::allow_not_found())
            .await
            .inspect_err(|err| {
                if err.status() == Some(404) {
                    info!(woeid, "no region matching woeid");
                }
            })
    }

    /// Trend regions closest to a location.
    pub async fn trends_closest(&mut self, lat: f64, lon: f64) -> Result<Value> {
        let request = ApiRequest::get(self.config().api_url("trends/closest.json"))
            .query("lat", lat)
            .query("long", lon);
        self.get_json(request, RequestOptions::default()).await
    }
}

/// Tweet ids from JSON lines. Lines that do not parse or carry no `id_str`
/// are logged and skipped.
pub fn dehydrate<I, S>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines.into_iter().filter_map(|line| {
        let line = line.as_ref();
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(tweet) => match tweet.get("id_str").and_then(Value::as_str) {
                Some(id) => Some(id.to_string()),
                None => {
                    error!(line, "cannot dehydrate line without id_str");
                    None
                }
            },
            Err(err) => {
                error!(error = %err, "cannot dehydrate line");
                None
            }
        }
    })
}
