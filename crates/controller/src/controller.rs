// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The experience controller: owns the currently-running experience and
//! drives transitions between experiences.
//!
//! Transitions are serialized by a non-queuing modify lock. A caller that
//! finds the lock held fails fast instead of piling up behind an in-flight
//! transition; the scheduler and operators both learn synchronously that
//! someone else got there first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;

use crate::auth::AccessCodeManager;
use crate::colors::ColorManager;
use crate::config::ControllerConfig;
use crate::current::{CurrentExperience, Lock, LockStatus};
use crate::environment::capture::CaptureApi;
use crate::environment::docker::shutdown_by_tag;
use crate::environment::EnvState;
use crate::error::ApiError;
use crate::experience::{load_experiences, EnvironmentDeps, Experience};
use crate::groupings::Groupings;
use crate::loader::LoaderManager;
use crate::messaging::protocol::DisplaySettings;
use crate::placard::{PlacardClient, PlacardExperience, PlacardLayout};
use crate::ports::PortManager;
use crate::stability::{reboot_host, StabilityManager};
use crate::state::epoch_ms;
use crate::video_devices::VideoDeviceManager;
use crate::wm::WmClient;

/// How long a failed environment may linger before the exit watch clears it.
const EXIT_WATCH_THROTTLE_S: u64 = 5;

/// Seconds the loading overlay is guaranteed on screen before the incoming
/// environment starts underneath it.
const LOADER_VISIBILITY_DELAY: Duration = Duration::from_secs(1);

/// What the placard shows when nothing is running.
fn idle_card() -> PlacardExperience {
    PlacardExperience {
        title: Some("Kiosk".to_owned()),
        description: Some("The next experience is on its way".to_owned()),
        artist: None,
    }
}

/// The loaded catalog plus grouping membership maps.
#[derive(Default)]
pub struct Catalog {
    pub experiences: HashMap<String, Arc<Experience>>,
    pub groupings: Groupings,
    pub collection_map: HashMap<String, String>,
    pub tag_map: HashMap<String, Vec<String>>,
    pub folder_map: HashMap<String, Vec<String>>,
}

/// Plain-data view of the current experience for API responses.
#[derive(Clone)]
pub struct CurrentSnapshot {
    pub experience: Arc<Experience>,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub last_interaction: Option<u64>,
    pub lock: Lock,
}

pub struct Controller {
    config: Arc<ControllerConfig>,
    docker: Option<bollard::Docker>,
    ports: Arc<PortManager>,
    video_devices: Arc<VideoDeviceManager>,
    capture_api: Arc<CaptureApi>,
    placard: Option<Arc<PlacardClient>>,
    wm: Option<Arc<WmClient>>,
    loader: Arc<LoaderManager>,
    colors: Arc<ColorManager>,
    access_codes: AccessCodeManager,
    stability: StabilityManager,
    catalog: RwLock<Catalog>,
    current: RwLock<Option<CurrentExperience>>,
    /// Non-queuing transition lock. Held across resolve → notify surfaces →
    /// stop outgoing → start incoming → assign.
    modify: Mutex<()>,
    /// When the most recent transition started, for throttle checks.
    last_set_started: StdMutex<Option<Instant>>,
    /// Catalog generation stamp; consumers rebuild their caches when it
    /// moves.
    last_update: AtomicU64,
}

impl Controller {
    pub fn new(config: Arc<ControllerConfig>, docker: Option<bollard::Docker>) -> Self {
        let placard = (!config.disable_placard)
            .then(|| Arc::new(PlacardClient::from_runtime_dir()));
        let wm = (!config.disable_wm).then(|| Arc::new(WmClient::new(config.wm_addr.clone())));
        let colors = Arc::new(ColorManager::new(
            config.palette_cmd.clone(),
            config.data_dir().join("colors.json"),
        ));

        Self {
            docker,
            ports: Arc::new(PortManager::new()),
            video_devices: Arc::new(VideoDeviceManager::from_system()),
            capture_api: Arc::new(CaptureApi::new(config.capture_api_url.clone())),
            placard,
            wm,
            loader: Arc::new(LoaderManager::new(config.loader_cmd.clone())),
            colors,
            access_codes: AccessCodeManager::new(),
            stability: StabilityManager::new(config.gpu_probe_cmd.clone()),
            catalog: RwLock::new(Catalog::default()),
            current: RwLock::new(None),
            modify: Mutex::new(()),
            last_set_started: StdMutex::new(None),
            last_update: AtomicU64::new(epoch_ms()),
            config,
        }
    }

    // -- Catalog ---------------------------------------------------------------

    /// Rescan the filesystem: experiences, groupings, palettes. Experiences
    /// whose environments can't be instantiated are excluded up front.
    pub async fn load_from_fs(&self) {
        let dir = self.config.experiences_dir();
        let loaded = load_experiences(&dir);
        let deps = self.environment_deps();

        let mut experiences = HashMap::new();
        for experience in loaded {
            let experience = Arc::new(experience);
            let probe = experience.create_environment(&deps);
            if !probe.available().await {
                tracing::warn!(experience = %experience.id, "unavailable, excluding from catalog");
                continue;
            }
            experiences.insert(experience.id.clone(), experience);
        }

        let groupings = Groupings::load(&self.config.data_dir());
        let collection_map = groupings.collection_map();
        let tag_map = groupings.tag_map();
        let folder_map = groupings.folder_map();

        let color_seed: Vec<(String, std::path::PathBuf, bool)> = experiences
            .values()
            .map(|experience| {
                (experience.id.clone(), experience.path.clone(), experience.unlisted)
            })
            .collect();
        self.colors.load(&color_seed).await;

        let count = experiences.len();
        *self.catalog.write().await =
            Catalog { experiences, groupings, collection_map, tag_map, folder_map };
        self.last_update.store(epoch_ms(), Ordering::Release);
        tracing::info!(count, "catalog loaded");
    }

    pub async fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().await
    }

    /// Catalog generation stamp, wall-clock ms of the last reload.
    pub fn last_update(&self) -> u64 {
        self.last_update.load(Ordering::Acquire)
    }

    pub async fn experience(&self, id: &str) -> Option<Arc<Experience>> {
        self.catalog.read().await.experiences.get(id).cloned()
    }

    // -- Current experience ----------------------------------------------------

    pub async fn current_snapshot(&self) -> Option<CurrentSnapshot> {
        let current = self.current.read().await;
        current.as_ref().map(|current| CurrentSnapshot {
            experience: Arc::clone(&current.experience),
            start_time: current.start_time,
            end_time: current.end_time,
            last_interaction: current.last_interaction,
            lock: current.lock,
        })
    }

    /// Replace the current experience. Returns `Ok(false)` without touching
    /// anything when a transition is in flight or the throttle window hasn't
    /// elapsed; a start failure clears the current experience and propagates.
    pub async fn set_current(
        &self,
        id: Option<&str>,
        throttle: Option<u64>,
        update_throttle: bool,
    ) -> anyhow::Result<bool> {
        if let Some(window) = throttle {
            let last = self.last_set_started.lock().ok().and_then(|last| *last);
            if let Some(last) = last {
                if last.elapsed() < Duration::from_secs(window) {
                    return Ok(false);
                }
            }
        }

        // Never queue: a transition already in flight wins.
        let Ok(_guard) = self.modify.try_lock() else {
            return Ok(false);
        };

        let from_id = {
            let current = self.current.read().await;
            // An empty→empty transition still runs: it is what pushes the
            // idle card to the placard at boot.
            let unchanged = match (current.as_ref(), id) {
                (Some(current), Some(id)) => current.id() == id,
                _ => false,
            };
            if unchanged {
                return Ok(true);
            }
            current.as_ref().map(|current| current.id().to_owned())
        };

        if update_throttle {
            if let Ok(mut last) = self.last_set_started.lock() {
                *last = Some(Instant::now());
            }
        }

        let incoming: Option<Arc<Experience>> = match id {
            Some(id) => Some(
                self.experience(id)
                    .await
                    .ok_or_else(|| anyhow::anyhow!("experience '{id}' not registered"))?,
            ),
            None => None,
        };

        tracing::info!(
            from = %from_id.unwrap_or_default(),
            to = %incoming.as_ref().map(|experience| experience.id.clone()).unwrap_or_default(),
            "transition started"
        );

        let load_time = incoming.as_ref().and_then(|experience| experience.load_time);

        if let Some(experience) = &incoming {
            if let Some(wm) = &self.wm {
                wm.set_layout(experience.layout).await;
            }
            if let Some(load_time) = load_time.filter(|load_time| *load_time > 0) {
                self.loader.start().await;
                self.loader.stop_after(Duration::from_secs(load_time));
            }
        }

        self.spawn_placard_update(incoming.clone());

        if let Some(wm) = &self.wm {
            wm.clear_viewport().await;
        }

        let incoming_env =
            incoming.as_ref().map(|experience| experience.create_environment(&self.environment_deps()));

        // Detach the outgoing stop so a slow teardown can't delay the start.
        let outgoing = self.current.write().await.take();
        let previous_env = outgoing.as_ref().map(|current| Arc::clone(&current.environment));
        if let Some(outgoing) = outgoing {
            let next_env = incoming_env.clone();
            tokio::spawn(async move {
                let outgoing_id = outgoing.id().to_owned();
                if let Err(err) = outgoing.environment.stop(next_env.as_deref()).await {
                    tracing::warn!(experience = %outgoing_id, err = %err, "outgoing stop failed");
                }
            });
        }

        if let (Some(experience), Some(environment)) = (&incoming, &incoming_env) {
            if load_time.unwrap_or(0) > 0 {
                // Give the loading screen a beat on screen before the
                // environment paints over it.
                tokio::time::sleep(LOADER_VISIBILITY_DELAY).await;
            }

            if let Err(err) = environment.start(previous_env.as_deref()).await {
                *self.current.write().await = None;
                return Err(err.into());
            }

            *self.current.write().await = Some(CurrentExperience::new(
                Arc::clone(experience),
                Arc::clone(environment),
            ));
        }

        Ok(true)
    }

    /// Apply app-driven settings to the current run. The lock setter takes
    /// the modify lock so a toggle can't interleave with a transition.
    pub async fn apply_display_settings(
        &self,
        id: &str,
        settings: DisplaySettings,
    ) -> Result<(), ApiError> {
        if let Some(end_time) = settings.end_time {
            let mut current = self.current.write().await;
            let current = current.as_mut().filter(|current| current.id() == id);
            match current {
                Some(current) => current.end_time = Some(end_time),
                None => return Err(ApiError::BadRequest),
            }
        }

        if let Some(status) = settings.lock {
            self.set_lock(id, status).await?;
        }
        Ok(())
    }

    pub async fn set_lock(&self, id: &str, status: LockStatus) -> Result<(), ApiError> {
        let _guard = self.modify.lock().await;
        let mut current = self.current.write().await;
        match current.as_mut().filter(|current| current.id() == id) {
            Some(current) => {
                current.lock.set_status(status);
                Ok(())
            }
            None => Err(ApiError::BadRequest),
        }
    }

    /// Stamp the interaction clock; called by the router when a client
    /// message arrives.
    pub async fn note_interaction(&self, id: &str) {
        let mut current = self.current.write().await;
        if let Some(current) = current.as_mut().filter(|current| current.id() == id) {
            current.last_interaction = Some(epoch_ms());
        }
    }

    pub async fn set_last_interaction(&self, id: &str, at: u64) -> Result<(), ApiError> {
        let mut current = self.current.write().await;
        match current.as_mut().filter(|current| current.id() == id) {
            Some(current) => {
                current.last_interaction = Some(at);
                Ok(())
            }
            None => Err(ApiError::BadRequest),
        }
    }

    pub async fn note_lifecycle(&self, id: &str, paused: bool) {
        tracing::info!(experience = %id, paused, "lifecycle update");
    }

    // -- Downstream surfaces ---------------------------------------------------

    pub fn placard(&self) -> Option<Arc<PlacardClient>> {
        self.placard.clone()
    }

    /// Push the incoming experience (or the idle card) to the placard,
    /// detached from the transition. One retry after a second covers
    /// transient socket failures; anything past that is logged and dropped.
    fn spawn_placard_update(&self, incoming: Option<Arc<Experience>>) {
        let Some(placard) = self.placard.clone() else {
            return;
        };
        let access_url = self.config.access_url.clone();
        let code = self.access_codes.advance();

        tokio::spawn(async move {
            let update = || async {
                match &incoming {
                    Some(experience) => {
                        placard
                            .set_experience(&PlacardExperience {
                                title: Some(experience.title.clone()),
                                description: experience.description.clone(),
                                artist: experience.artist.clone(),
                            })
                            .await?;
                        placard
                            .set_layout(PlacardLayout::from_display_layout(experience.layout))
                            .await?;
                        placard.set_action_hints(&experience.action_hints()).await?;
                    }
                    None => {
                        placard.set_experience(&idle_card()).await?;
                        placard.set_layout(PlacardLayout::Full).await?;
                        placard.set_action_hints(&[]).await?;
                    }
                }
                placard.set_url(&format!("{access_url}/{code}")).await
            };

            if let Err(first) = update().await {
                tracing::warn!(err = %first, "placard update failed, retrying in 1s");
                tokio::time::sleep(Duration::from_secs(1)).await;
                if let Err(second) = update().await {
                    tracing::warn!(err = %second, "placard update failed again, giving up");
                }
            }
        });
    }

    pub fn access_code(&self) -> String {
        self.access_codes.current()
    }

    pub fn accept_access_code(&self, presented: &str) -> bool {
        self.access_codes.accept(presented)
    }

    fn environment_deps(&self) -> EnvironmentDeps {
        EnvironmentDeps {
            docker: self.docker.clone(),
            video_devices: Arc::clone(&self.video_devices),
            ports: Arc::clone(&self.ports),
            capture_api: Arc::clone(&self.capture_api),
            data_dir: self.config.data_dir(),
            browser_cmd: self.config.browser_cmd.clone(),
            messaging_url: self.config.messaging_url.clone(),
            capture_shell_cmd: self.config.capture_shell_cmd.clone(),
            capture_failed_timeout_s: self.config.capture_failed_timeout_s,
        }
    }

    // -- Boot-time loops -------------------------------------------------------

    /// Spawn every periodic task the controller runs for its own health.
    pub fn spawn_background_loops(self: &Arc<Self>, shutdown: CancellationToken) {
        self.spawn_empty_initializer(shutdown.clone());
        self.spawn_exit_watch(shutdown.clone());
        self.spawn_stability_loop(shutdown.clone());
        self.spawn_colors_loop(shutdown);
    }

    /// After a short boot delay, transition to nothing so the placard clears.
    /// The throttle keeps this from clobbering an operator who got in first.
    fn spawn_empty_initializer(self: &Arc<Self>, shutdown: CancellationToken) {
        let controller = Arc::clone(self);
        let delay = controller.config.initial_empty_delay();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            match controller.set_current(None, Some(delay.as_secs()), false).await {
                Ok(true) => tracing::info!("cleared to empty experience after boot"),
                Ok(false) => tracing::debug!("boot-time empty transition yielded to another set"),
                Err(err) => tracing::warn!(err = %err, "boot-time empty transition failed"),
            }
        });
    }

    /// Watch the current environment; when it reports failed, clear the
    /// display rather than leaving a dead app on screen.
    fn spawn_exit_watch(self: &Arc<Self>, shutdown: CancellationToken) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let environment = {
                    let current = controller.current.read().await;
                    current.as_ref().map(|current| {
                        (current.id().to_owned(), Arc::clone(&current.environment))
                    })
                };
                let Some((id, environment)) = environment else {
                    continue;
                };

                if environment.state().await == EnvState::Failed {
                    tracing::warn!(experience = %id, "environment failed, clearing current");
                    match controller.set_current(None, Some(EXIT_WATCH_THROTTLE_S), true).await {
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(err = %err, "exit-watch empty transition failed");
                        }
                    }
                }
            }
        });
    }

    /// Sweep rogue containers and, when enabled, probe GPU stability.
    fn spawn_stability_loop(self: &Arc<Self>, shutdown: CancellationToken) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(controller.config.stability_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let sweeper = Arc::clone(&controller);
                tokio::spawn(async move {
                    sweeper.cleanup_rogue_containers().await;
                });

                if controller.config.check_stability && !controller.stability.check_stable().await {
                    reboot_host().await;
                }
            }
        });
    }

    /// Drain finished palette extractions.
    fn spawn_colors_loop(self: &Arc<Self>, shutdown: CancellationToken) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                controller.colors.drain().await;
            }
        });
    }

    /// Kill containers for every docker experience that is not the current
    /// one. Crashed transitions can strand containers on the GPU; this keeps
    /// the sweep cheap enough to run on every stability tick.
    pub async fn cleanup_rogue_containers(&self) {
        let Some(docker) = &self.docker else {
            return;
        };

        let current_id = {
            let current = self.current.read().await;
            current.as_ref().map(|current| current.id().to_owned())
        };

        let images: Vec<String> = {
            let catalog = self.catalog.read().await;
            catalog
                .experiences
                .values()
                .filter(|experience| Some(experience.id.as_str()) != current_id.as_deref())
                .filter_map(|experience| experience.docker_image().map(str::to_owned))
                .collect()
        };

        for image in images {
            shutdown_by_tag(docker, &image).await;
        }
    }

    /// Stop whatever is running; used on shutdown so containers and browsers
    /// don't outlive the daemon.
    pub async fn shutdown_current(&self) {
        let current = self.current.write().await.take();
        if let Some(current) = current {
            let id = current.id().to_owned();
            if let Err(err) = current.environment.stop(None).await {
                tracing::warn!(experience = %id, err = %err, "shutdown stop failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
