use std::sync::Arc;

use amen_bible::models::{ReadingPlan, ScriptureRange};
use amen_bible::{PlanRegistry, Playback, ReferenceData, VideoTable, next_chapter_label, share_text};
use amen_config::Config;
use amen_progress::{
    CacheKey, Clock, CompletionCache, IdentityProvider, JsonFileSnapshots, MonthRepository, SnapshotStore,
    StaticIdentity, StatsWatcher, SystemClock, UserRepository,
};
use amen_store::{ReadOnlyStore, SqliteStore, StoreHandle};
use exn::ResultExt;
use time::Date;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::cli::{Command, Mark};
use crate::error::{ErrorKind, Result};

/// Everything a command needs, opened once per run.
pub struct App {
    dry_run: bool,
    registry: PlanRegistry,
    table: VideoTable,
    database: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
    months: MonthRepository,
    cache: CompletionCache,
    snapshots: JsonFileSnapshots,
    key: CacheKey,
}
impl App {
    #[instrument(skip(config, clock))]
    pub async fn open(config: Config, clock: SystemClock, dry_run: bool) -> Result<Self> {
        let table = load_video_table(&config).await?;
        let registry = load_plans(&config).await?;

        if let Some(parent) = config.store.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Store)?;
        }
        let database = Arc::new(SqliteStore::connect(&config.store.path).await.or_raise(|| ErrorKind::Store)?);
        let store: StoreHandle = match dry_run {
            true => Arc::new(ReadOnlyStore::new(database.clone())),
            false => database.clone(),
        };
        let clock: Arc<dyn Clock> = Arc::new(clock);

        let credential = StaticIdentity::new(config.user.credential())
            .sign_in()
            .await
            .or_raise(|| ErrorKind::SignIn)?;
        UserRepository::new(store.clone(), clock.clone())
            .upsert(&credential)
            .await
            .or_raise(|| ErrorKind::SignIn)?;

        let months = MonthRepository::new(store, clock.clone());
        let cache = CompletionCache::new(months.clone(), clock.clone(), config.cache.policy());
        let snapshots = JsonFileSnapshots::new(&config.cache.snapshot);
        match snapshots.load().await {
            Ok(Some(snapshot)) => {
                cache.restore(snapshot).await;
            },
            Ok(None) => {},
            Err(err) => tracing::warn!(error = ?err, "Ignoring unreadable cache snapshot"),
        }
        let key = CacheKey::new(credential.user_id, registry.active_id());

        Ok(Self {
            dry_run,
            registry,
            table,
            database,
            clock,
            months,
            cache,
            snapshots,
            key,
        })
    }

    /// Persist the cache and close the database.
    pub async fn close(self) {
        if !self.dry_run {
            let snapshot = self.cache.snapshot().await;
            if let Err(err) = self.snapshots.save(&snapshot).await {
                tracing::warn!(error = ?err, "Failed to save cache snapshot");
            }
        }
        self.database.close().await;
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Today { date, follow } => self.today(self.date_or_today(date), follow).await,
            Command::Segments { ranges } => {
                self.print_playback(&ranges);
                Ok(())
            },
            Command::Complete(mark) => self.complete(mark).await,
            Command::Like(mark) => self.like(mark).await,
            Command::Progress => self.progress().await,
            Command::Stats { date } => self.stats(self.date_or_today(date)).await,
        }
    }

    fn date_or_today(&self, date: Option<Date>) -> Date {
        date.unwrap_or_else(|| self.clock.today())
    }

    /// Make sure this year's records are cached before reading or writing them.
    async fn load_progress(&self) -> Result<()> {
        self.cache
            .get_monthly_plans(&self.key, &CancellationToken::new())
            .await
            .or_raise(|| ErrorKind::Progress)?;
        Ok(())
    }

    async fn today(&self, date: Date, follow: bool) -> Result<()> {
        let ranges = self.registry.reading_for(date);
        println!("{} ({date})", self.registry.active().title);
        if ranges.is_empty() {
            println!("No reading scheduled.");
            return Ok(());
        }
        println!("{}", share_text(ranges));
        self.print_playback(ranges);

        match self.load_progress().await {
            Ok(()) => {
                let completed = self.cache.get_completion(&self.key, date).await;
                let liked = self.cache.get_like(&self.key, date).await;
                println!("Completed: {}  Liked: {}", yes_no(completed), yes_no(liked));
            },
            Err(err) => {
                tracing::warn!(error = ?err, "Progress unavailable");
                println!("Progress unavailable.");
            },
        }

        let mut watcher = StatsWatcher::start(&self.months, self.registry.active_id(), date)
            .await
            .or_raise(|| ErrorKind::Progress)?;
        print_stats(watcher.current());
        if !follow {
            return Ok(());
        }

        let _refresh = self.cache.spawn_periodic_refresh(self.key.clone());
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                stats = watcher.changed() => match stats {
                    Some(stats) => print_stats(Some(stats)),
                    None => break,
                },
            }
        }
        watcher.stop();
        Ok(())
    }

    fn print_playback(&self, ranges: &[ScriptureRange]) {
        match Playback::plan(ranges, &self.table) {
            Playback::Unavailable => println!("Video not yet available."),
            Playback::Ready(segments) => {
                for (index, segment) in segments.iter().enumerate() {
                    let label = next_chapter_label(segment, &self.table).unwrap_or_default();
                    println!(
                        "{:>2}. {} {}-{}  {label}",
                        index + 1,
                        segment.video_id,
                        segment.start_time,
                        segment.end_time
                    );
                }
            },
        }
    }

    async fn complete(&self, mark: Mark) -> Result<()> {
        let date = self.date_or_today(mark.date);
        self.load_progress().await?;
        self.cache
            .set_completion(&self.key, date, !mark.undo)
            .await
            .or_raise(|| ErrorKind::Progress)?;
        let verb = if mark.undo { "Unmarked" } else { "Completed" };
        println!("{verb} {date}{}", self.dry_run_note());
        Ok(())
    }

    async fn like(&self, mark: Mark) -> Result<()> {
        let date = self.date_or_today(mark.date);
        self.load_progress().await?;
        self.cache
            .set_like(&self.key, date, !mark.undo)
            .await
            .or_raise(|| ErrorKind::Progress)?;
        let verb = if mark.undo { "Unliked" } else { "Liked" };
        println!("{verb} {date}{}", self.dry_run_note());
        Ok(())
    }

    async fn progress(&self) -> Result<()> {
        self.load_progress().await?;
        let completed: Vec<Date> = self
            .cache
            .all_completions(&self.key)
            .await
            .into_iter()
            .filter_map(|(date, completed)| completed.then_some(date))
            .collect();
        for date in &completed {
            println!("{date}");
        }
        println!("{} day(s) completed in {}", completed.len(), self.clock.today().year());
        Ok(())
    }

    async fn stats(&self, date: Date) -> Result<()> {
        let watcher = StatsWatcher::start(&self.months, self.registry.active_id(), date)
            .await
            .or_raise(|| ErrorKind::Progress)?;
        print_stats(watcher.current());
        Ok(())
    }

    fn dry_run_note(&self) -> &'static str {
        match self.dry_run {
            true => " (dry run, not saved)",
            false => "",
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn print_stats(stats: Option<amen_progress::models::PlanStats>) {
    match stats {
        Some(stats) => println!(
            "Readers: {} completed, {} liked",
            stats.total_completions, stats.total_likes
        ),
        None => println!("Readers: loading..."),
    }
}

async fn load_video_table(config: &Config) -> Result<VideoTable> {
    match &config.plan.video_table {
        Some(path) => {
            let csv = tokio::fs::read_to_string(path).await.or_raise(|| ErrorKind::ReferenceData)?;
            VideoTable::from_csv(&csv).or_raise(|| ErrorKind::ReferenceData)
        },
        None => ReferenceData::video_table().or_raise(|| ErrorKind::ReferenceData),
    }
}

async fn load_plans(config: &Config) -> Result<PlanRegistry> {
    let mut registry = PlanRegistry::load_default().or_raise(|| ErrorKind::ReferenceData)?;
    if let Some(path) = &config.plan.plan_file {
        let raw = tokio::fs::read(path).await.or_raise(|| ErrorKind::ReferenceData)?;
        let plan = ReadingPlan::from_json(raw).or_raise(|| ErrorKind::ReferenceData)?;
        tracing::debug!(plan = %plan.id, "Loaded plan file");
        registry.insert(plan);
    }
    registry
        .set_active(&config.plan.id)
        .or_raise(|| ErrorKind::InvalidArgument(format!("unknown plan '{}'", config.plan.id)))?;
    Ok(registry)
}
