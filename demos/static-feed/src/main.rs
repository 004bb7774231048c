//! Static feed demo.
//!
//! Serves two feeds:
//!
//! - `static`: a fixed list of posts, paginated by cursor
//! - `for-you`: the same list, with the first post pinned for signed-in callers
//!
//! Configuration is read from `skyfeed.toml` (optional), `.env`, then
//! `SKYFEED__*` environment variables.

use skyfeed::prelude::*;

const POSTS: &[&str] = &[
    "at://did:plc:z72i7hdynmk6r22z27h6tvur/app.bsky.feed.post/3k44deefqdk2g",
    "at://did:plc:z72i7hdynmk6r22z27h6tvur/app.bsky.feed.post/3k43tv4rft22g",
    "at://did:plc:ewvi7nxzyoun6zhxrhs64oiz/app.bsky.feed.post/3k3ycyfzuwk2x",
    "at://did:plc:ewvi7nxzyoun6zhxrhs64oiz/app.bsky.feed.post/3k3ybvdwbh22x",
];

const DEFAULT_LIMIT: usize = 2;

fn page(args: &FeedArgs) -> FeedResult<FeedPage> {
    let start = match args.cursor.as_deref() {
        Some(cursor) => cursor
            .parse::<usize>()
            .map_err(|_| FeedError::invalid_request_with_code("Malformed cursor", "BadCursor"))?,
        None => 0,
    };
    let limit = args.limit.map_or(DEFAULT_LIMIT, |l| l as usize).max(1);

    let mut page = FeedPage::new();
    for uri in POSTS.iter().skip(start).take(limit) {
        page = page.post(*uri);
    }
    if start + limit < POSTS.len() {
        page = page.cursor((start + limit).to_string());
    }
    Ok(page)
}

fn static_feed(args: &FeedArgs) -> FeedResult<FeedOutput> {
    page(args).map(Into::into)
}

fn for_you(args: &FeedArgs, ctx: &RequestContext) -> FeedResult<FeedOutput> {
    let page = page(args)?;
    match ctx.issuer_did()? {
        Some(did) if args.cursor.is_none() => {
            tracing::info!(viewer = %did, "Serving personalized page");
            Ok(FeedPage::new().pinned(POSTS[0]).entry(PostEntry::new(POSTS[1])).into())
        }
        _ => Ok(page.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_optional_file("skyfeed.toml")?
        .with_dotenv()?
        .with_env_prefix("SKYFEED")
        .load()?;

    let _telemetry = init_telemetry(TelemetryConfig::from_config(&config))?;

    let server = Server::from_config(&config)
        .feed("static", FeedHandle::from_fn(static_feed))
        .feed("for-you", FeedHandle::from_context_fn(for_you))
        .on_interactions(|interactions: &[Interaction], _ctx: &RequestContext| {
            for interaction in interactions {
                tracing::info!(
                    item = %interaction.item_uri,
                    event = %interaction.event,
                    "Interaction"
                );
            }
            Ok(())
        })
        .build()?;

    for uri in server.service().resolver().feed_uris() {
        tracing::info!(feed = %uri, "Serving feed");
    }

    server.run().await?;
    Ok(())
}
