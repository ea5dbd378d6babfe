//! Fetch a movie or a page of popular movies through the proxy's TMDB client
//! and print the mapped fields.
//! Usage:
//!   cargo run --bin tmdb_props -- movie <tmdb_id>
//!   cargo run --bin tmdb_props -- popular [page]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use reelview::config::Config;
use reelview::images::{ImageResolver, ImageSize};
use reelview::models::{MovieDetail, MovieSummary};
use reelview::tmdb::{parse_movie_id, parse_page, TmdbApi, TmdbClient};
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Movie,
    Popular,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(Command::Movie),
            "popular" => Ok(Command::Popular),
            _ => Err(anyhow!("command must be 'movie' or 'popular'")),
        }
    }
}

fn summary_props(movie: &MovieSummary, images: &ImageResolver) -> Value {
    json!({
        "ID": movie.id,
        "Title": movie.title,
        "Year": movie.release_year(),
        "Rating": format!("{:.1}", movie.vote_average),
        "Votes": movie.vote_count,
        "Poster": movie.poster_url(images, ImageSize::W300),
    })
}

fn detail_props(movie: &MovieDetail, images: &ImageResolver) -> Value {
    let genres: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
    json!({
        "ID": movie.id,
        "Title": movie.title,
        "Tagline": movie.tagline,
        "Overview": movie.overview,
        "Release Date": movie.released_on().map(|d| d.to_string()),
        "Runtime": movie.runtime.map(|r| format!("{r} min")),
        "Rating": format!("{:.1}", movie.vote_average),
        "Votes": movie.vote_count,
        "Genres": genres,
        "Budget": movie.budget,
        "Revenue": movie.revenue,
        "Status": movie.status,
        "Language": movie.original_language.as_deref().map(str::to_uppercase),
        "Poster": movie.poster_url(images, ImageSize::W500),
        "Backdrop": movie.backdrop_url(images, ImageSize::Original),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let mut args = env::args().skip(1);
    let command: Command = args
        .next()
        .context("usage: tmdb_props <movie|popular> [id|page]")?
        .parse()?;
    let arg = args.next();

    let config = Config::from_env()?;
    let images = ImageResolver::new(config.image_base_url.clone());
    let client = TmdbClient::from_config(&config)?;

    let props = match command {
        Command::Movie => {
            let raw = arg.context("movie needs a TMDB id")?;
            let id = parse_movie_id(&raw).ok_or_else(|| anyhow!("invalid movie id '{}'", raw))?;
            let movie = client.fetch_detail(id).await?;
            detail_props(&movie, &images)
        }
        Command::Popular => {
            let page = parse_page(arg.as_deref());
            let listing = client.fetch_popular(page).await?;
            let movies: Vec<Value> = listing
                .results
                .iter()
                .map(|m| summary_props(m, &images))
                .collect();
            json!({
                "Page": listing.page,
                "Total Pages": listing.total_pages,
                "Total Results": listing.total_results,
                "Movies": movies,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&props)?);
    Ok(())
}
