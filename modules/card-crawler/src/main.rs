use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use card_crawler::card::location;
use card_crawler::classifier::{ClassificationPipeline, ClassifierClient};
use card_crawler::emitter::CardEmitter;
use card_crawler::images::HttpImageResolver;
use card_crawler::notify::{NoopNotifier, Notifier, PipelineWebhook};
use card_crawler::scheduler::{PollScheduler, PollSettings};
use card_crawler::tracker::KnownIdTracker;
use card_crawler::Config;
use vk_client::VkClient;

#[derive(Parser, Debug)]
#[command(name = "card-crawler", version, about = "Turns community wall posts into pet cards")]
struct Args {
    /// Run a single fetch cycle and exit instead of polling forever.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("card_crawler=info".parse()?))
        .init();

    info!("Card crawler starting...");

    // Load config
    let config = Config::from_env()?;
    config.log_redacted();

    let timeout = config.http_timeout();

    let wall = VkClient::with_base_url(config.vk_token.clone(), &config.vk_api_url)
        .with_timeout(timeout)?;

    let classifier = ClassificationPipeline::new(
        Box::new(ClassifierClient::with_timeout(&config.cat_dog_classifier_endpoint, timeout)?),
        Box::new(ClassifierClient::with_timeout(&config.lost_found_classifier_endpoint, timeout)?),
        Box::new(ClassifierClient::with_timeout(&config.male_female_classifier_endpoint, timeout)?),
    );

    // Pipeline notifications if configured, otherwise Noop
    let notifier: Box<dyn Notifier> = match &config.pipeline_notification_url {
        Some(url) => {
            info!("Pipeline notifications enabled");
            Box::new(PipelineWebhook::with_timeout(url.clone(), timeout)?)
        }
        None => {
            info!("No PIPELINE_NOTIFICATION_URL set, notifications disabled");
            Box::new(NoopNotifier)
        }
    };

    let tracker = KnownIdTracker::rebuild(&config.cards_dir)?;
    info!(known = tracker.len(), "Found already downloaded cards");

    let settings = PollSettings {
        group_name: config.vk_group_name.clone(),
        fetch_count: config.wall_fetch_count,
        tracking_capacity: config.known_cards_tracking_count,
        interval: config.poll_interval(),
        location: location(&config.location_address, config.location_lat, config.location_lon),
    };

    let mut scheduler = PollScheduler::new(
        settings,
        Box::new(wall),
        tracker,
        classifier,
        Box::new(HttpImageResolver::with_timeout(timeout)?),
        CardEmitter::new(&config.cards_dir, notifier),
    );

    if args.once {
        let stats = scheduler.run_cycle().await;
        info!("{stats}");
        return Ok(());
    }

    scheduler.run().await;
    Ok(())
}
