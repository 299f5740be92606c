//! CLI command implementations
//!
//! Each command loads the stored config, builds a client from it, runs, and
//! writes the token back if a refresh replaced it.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use catalog_client::api::{albums, artists, playlists, tracks};
use catalog_client::models::{Playable, SimpleArtist};
use catalog_client::{CatalogClient, Config, GrantKind};

/// Scopes requested by `login`; enough for every command below.
const LOGIN_SCOPES: &[&str] = &[
    "user-library-read",
    "user-follow-read",
    "playlist-read-private",
];

fn build_client(config: &Config) -> Result<CatalogClient> {
    if config.credentials.client_id.is_empty() {
        bail!(
            "No client id configured; set [credentials] client_id in {}",
            Config::config_path()?.display()
        );
    }

    let mut builder = CatalogClient::builder(config.credentials.clone())
        .options(config.options.clone())
        .grant(config.grant)
        .maybe_token(config.token.clone());
    if let Some(endpoints) = &config.endpoints {
        builder = builder.endpoints(endpoints.clone());
    }
    if let Some(api_base) = &config.api_base {
        builder = builder.api_base(api_base.clone());
    }
    builder.build().context("Failed to build API client")
}

/// Load config and client together.
fn open() -> Result<(Config, CatalogClient)> {
    let config = Config::load()?;
    let client = build_client(&config)?;
    Ok((config, client))
}

/// Persist the client's token if it differs from the stored one.
fn persist_token(mut config: Config, client: &CatalogClient) -> Result<()> {
    let token = client.token();
    if token != config.token {
        tracing::debug!("Saving refreshed token");
        config.token = token;
        config.save()?;
    }
    Ok(())
}

pub async fn login(force: bool) -> Result<()> {
    let (config, client) = open()?;

    if !force && client.token().is_some() {
        match client.refresh_token().await {
            Ok(_) => {
                println!("Token refreshed successfully.");
                return persist_token(config, &client);
            }
            Err(e) => {
                tracing::warn!("Refresh failed ({}), starting a new login", e);
            }
        }
    }

    if config.grant == GrantKind::ClientCredentials {
        client
            .request_app_token()
            .await
            .context("Client credentials grant failed")?;
        println!("Login successful (app token).");
        return persist_token(config, &client);
    }

    let pkce = config.credentials.client_secret.is_none();
    let request = client.authorization_url(LOGIN_SCOPES, pkce)?;

    println!();
    println!("To sign in, visit: {}", request.url);
    println!();
    println!("Then paste the URL you were redirected to:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read redirect URL")?;

    let redirect = url::Url::parse(line.trim()).context("Not a valid URL")?;
    let param = |name: &str| {
        redirect
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(error) = param("error") {
        bail!("Authorization denied: {}", error);
    }
    if param("state").as_deref() != Some(request.state.as_str()) {
        bail!("State mismatch in redirect; aborting");
    }
    let code = param("code").context("Redirect URL has no code parameter")?;

    client
        .exchange_code(&code, request.code_verifier.as_deref())
        .await
        .context("Code exchange failed")?;
    println!("Login successful.");
    persist_token(config, &client)
}

pub fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_token();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

pub fn status() -> Result<()> {
    let config = Config::load()?;

    println!("Client id:   {}", or_none(&config.credentials.client_id));
    println!("Grant:       {:?}", config.grant);
    match &config.token {
        Some(token) => {
            let state = if token.is_expired() { "expired" } else { "valid" };
            println!("Token:       {}", state);
            println!("  expires_at: {}", token.expires_at());
            match &token.refresh_token {
                Some(_) => println!("Refresh tok: present"),
                None => println!("Refresh tok: none"),
            }
        }
        None => println!("Token:       none"),
    }

    Ok(())
}

pub async fn show_track(id: &str, market: Option<&str>) -> Result<()> {
    let (config, client) = open()?;

    match tracks::get_track(&client, id, market).await? {
        Some(track) => {
            println!();
            println!("Name:     {}", track.name);
            println!("Artists:  {}", artist_names(&track.artists));
            if let Some(album) = &track.album {
                println!("Album:    {}", album.name);
            }
            println!("Duration: {}", format_duration(track.duration_ms));
            println!("URI:      {}", track.uri);
        }
        None => println!("No track with id {}", id),
    }

    persist_token(config, &client)
}

pub async fn show_tracks(ids: &[String]) -> Result<()> {
    let (config, client) = open()?;
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

    let found = tracks::get_tracks(&client, &ids, None).await?;
    for (id, track) in ids.iter().zip(&found) {
        match track {
            Some(t) => println!("{:<24} {} - {}", id, artist_names(&t.artists), t.name),
            None => println!("{:<24} (not found)", id),
        }
    }

    persist_token(config, &client)
}

pub async fn album_tracks(id: &str, limit: Option<u32>) -> Result<()> {
    let (config, client) = open()?;

    let first = albums::album_tracks(&client, id, limit, None).await?;
    let items = first.all_items().await?;

    println!("\n{} tracks:", items.len());
    println!("{:-<60}", "");
    for (i, track) in items.iter().enumerate() {
        let number = track.track_number.unwrap_or(i as u32 + 1);
        println!(
            "{:>3}. {:<40} {}",
            number,
            track.name,
            format_duration(track.duration_ms)
        );
    }

    persist_token(config, &client)
}

pub async fn followed(pages: usize) -> Result<()> {
    let (config, client) = open()?;

    let first = artists::followed_artists(&client, None, None).await?;
    let pages = first.take_pages(pages.max(1)).await?;

    println!("\nFollowed artists:");
    println!("{:-<60}", "");
    let mut shown = 0;
    for page in &pages {
        for artist in page.items() {
            println!("  {:<40} {}", artist.name, artist.id);
            shown += 1;
        }
    }
    if shown == 0 {
        println!("  (none)");
    }
    if pages.last().is_some_and(|p| p.has_next()) {
        println!("  ... more available (use --pages)");
    }

    persist_token(config, &client)
}

pub async fn show_playlist(id: &str, all: bool) -> Result<()> {
    let (config, client) = open()?;

    let Some(playlist) = playlists::get_playlist(&client, id).await? else {
        println!("No playlist with id {}", id);
        return persist_token(config, &client);
    };

    println!("\n{} ({} items)", playlist.name, playlist.tracks.total);
    println!("{:-<60}", "");

    let handle = client.page(playlist.tracks);
    let items = if all {
        handle.all_items().await?
    } else {
        handle.items().to_vec()
    };

    for item in &items {
        match &item.track {
            Some(Playable::Track(t)) => {
                println!("  {} - {}", artist_names(&t.artists), t.name)
            }
            Some(Playable::Episode(e)) => println!("  [episode] {}", e.name),
            None => println!("  (unavailable)"),
        }
    }

    persist_token(config, &client)
}

fn artist_names(artists: &[SimpleArtist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn or_none(s: &str) -> &str {
    if s.is_empty() {
        "(none)"
    } else {
        s
    }
}
