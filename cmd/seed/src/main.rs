//! # Seed
//!
//! Migrates the database, inserts a few demo campgrounds owned by a demo user
//! and prints a development token for that user.

use anyhow::Context;
use auth_adapters::{JwtIdentityVerifier, DEFAULT_TOKEN_TTL};
use configs::AppConfig;
use domains::{
    Author, Campground, CampgroundFields, CampgroundRepository, Comment, Identity, Review, UserId,
};
use secrecy::ExposeSecret;
use storage_adapters::PgCampgroundRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLES: [(&str, &str, &str); 3] = [
    ("Salmon Creek", "18", "A quiet spot by the creek with plenty of shade."),
    ("Granite Hill", "9", "No bathrooms, no water, beautiful granite."),
    ("Mountain Goat's Rest", "25", "High altitude, cold nights, great views."),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let url = config
        .database
        .url
        .as_ref()
        .context("database.url (YELPCAMP__DATABASE__URL) is required for seeding")?;
    let repo = PgCampgroundRepository::connect(url.expose_secret(), config.database.max_connections)
        .await
        .context("connecting to PostgreSQL")?;
    repo.migrate().await.context("running migrations")?;

    let demo = Identity {
        id: UserId::generate(),
        username: "demo".into(),
    };
    let visitor = Author {
        id: UserId::generate(),
        username: "visitor".into(),
    };

    for (name, price, description) in SAMPLES {
        let campground = Campground::new(
            Author::from(&demo),
            CampgroundFields {
                name: name.into(),
                price: price.into(),
                description: description.into(),
            },
            None,
        );
        repo.insert(&campground).await?;
        repo.insert_comment(&Comment::new(campground.id, visitor.clone(), "Great place, would camp again!"))
            .await?;
        repo.insert_review(&Review::new(campground.id, visitor.clone(), 4, "Lovely, if a bit crowded."))
            .await?;
        info!(campground = %campground.id, name, "seeded");
    }

    let token = JwtIdentityVerifier::new(&config.auth.jwt_secret).issue(&demo, DEFAULT_TOKEN_TTL)?;
    println!("demo user: {} ({})", demo.username, demo.id);
    println!("set cookie `{}` to:\n{token}", config.auth.cookie_name);
    Ok(())
}
