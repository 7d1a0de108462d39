use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{RadarError, RadarResult};
use crate::models::{Developer, Region, SessionParams};
use crate::services::developer_board::DeveloperBoard;
use crate::services::live_channel::{ChannelEvent, ChannelStatus, LiveChannel};
use crate::services::location_service::{self, LocationProvider};
use crate::services::search_service::DiscoveryApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Ready,
    Searching,
    Live,
    /// Location denied. Terminal for this session.
    Blocked,
}

fn lock_board(board: &Mutex<DeveloperBoard>) -> MutexGuard<'_, DeveloperBoard> {
    board.lock().unwrap_or_else(|e| e.into_inner())
}

/// Discovery state for one map screen: region, filter, developers on the
/// board and the live channel feeding them.
///
/// The channel handler is installed once, here, and only ever upserts into
/// the board. Tearing the owner down closes the channel.
pub struct DiscoverySession<A, C> {
    api: A,
    channel: C,
    phase: SessionPhase,
    region: Option<Region>,
    tech_filter: String,
    last_params: Option<SessionParams>,
    board: Arc<Mutex<DeveloperBoard>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub channel: ChannelStatus,
    pub region: Option<Region>,
    pub tech_filter: String,
    pub developers: Vec<Developer>,
}

impl<A: DiscoveryApi, C: LiveChannel> DiscoverySession<A, C> {
    pub fn new(api: A, mut channel: C) -> Self {
        let board = Arc::new(Mutex::new(DeveloperBoard::default()));
        let sink = Arc::clone(&board);
        channel.subscribe(Arc::new(move |event: ChannelEvent| {
            lock_board(&sink).apply(event)
        }));

        Self {
            api,
            channel,
            phase: SessionPhase::Idle,
            region: None,
            tech_filter: String::new(),
            last_params: None,
            board,
        }
    }

    pub async fn locate(&mut self, provider: &dyn LocationProvider) -> RadarResult<Region> {
        match self.phase {
            SessionPhase::Blocked => return Err(RadarError::PermissionDenied),
            SessionPhase::Idle => {}
            _ => {
                if let Some(region) = self.region {
                    return Ok(region);
                }
            }
        }

        match location_service::initial_region(provider).await {
            Ok(region) => {
                self.region = Some(region);
                self.phase = SessionPhase::Ready;
                Ok(region)
            }
            Err(RadarError::PermissionDenied) => {
                self.phase = SessionPhase::Blocked;
                Err(RadarError::PermissionDenied)
            }
            Err(e) => Err(e),
        }
    }

    pub fn update_region(&mut self, region: Region) -> RadarResult<()> {
        self.ensure_located()?;
        self.region = Some(region.validated()?);
        Ok(())
    }

    pub fn set_tech_filter(&mut self, techs: impl Into<String>) {
        self.tech_filter = techs.into();
    }

    /// Replaces the board with a fresh snapshot and opens a live session for
    /// it. The previous live session is closed before the query goes out.
    /// On failure the board is left untouched and no channel is opened.
    pub async fn search(&mut self) -> RadarResult<usize> {
        let region = self.ensure_located()?;

        if self.channel.is_active() {
            self.channel.disconnect().await;
        }
        lock_board(&self.board).set_channel_status(ChannelStatus::Disconnected);

        self.phase = SessionPhase::Searching;
        let params = SessionParams::new(&region, self.tech_filter.clone());

        let snapshot = match self.api.search(&params).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(techs = %params.techs, "🔎 Search failed: {}", e);
                self.phase = SessionPhase::Ready;
                return Err(e);
            }
        };

        let count = snapshot.len();
        lock_board(&self.board).replace_snapshot(snapshot);
        self.phase = SessionPhase::Live;
        info!(count, techs = %params.techs, "🔎 Snapshot loaded");

        if let Err(e) = self.channel.connect(&params).await {
            warn!("🛰️ Live updates unavailable: {}", e);
            lock_board(&self.board).set_channel_status(ChannelStatus::Paused);
        }
        self.last_params = Some(params);
        Ok(count)
    }

    /// Reopens the live session of the last search after the channel paused.
    pub async fn resume_live(&mut self) -> RadarResult<()> {
        let params = match (self.phase, self.last_params.as_ref()) {
            (SessionPhase::Live, Some(params)) => params.clone(),
            _ => return Err(RadarError::InvalidState("no search has completed")),
        };
        if self.channel.is_active() {
            return Ok(());
        }
        self.channel.connect(&params).await
    }

    pub async fn close(&mut self) {
        self.channel.disconnect().await;
        lock_board(&self.board).set_channel_status(ChannelStatus::Disconnected);
        if self.phase == SessionPhase::Live {
            self.phase = SessionPhase::Ready;
        }
    }

    fn ensure_located(&self) -> RadarResult<Region> {
        match (self.phase, self.region) {
            (SessionPhase::Blocked, _) => Err(RadarError::PermissionDenied),
            (_, Some(region)) => Ok(region),
            (_, None) => Err(RadarError::InvalidState("waiting for location")),
        }
    }
}

impl<A, C> DiscoverySession<A, C> {
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn tech_filter(&self) -> &str {
        &self.tech_filter
    }

    pub fn channel_status(&self) -> ChannelStatus {
        lock_board(&self.board).channel_status()
    }

    pub fn developers(&self) -> Vec<Developer> {
        lock_board(&self.board).developers()
    }

    pub fn view(&self) -> SessionView {
        let board = lock_board(&self.board);
        SessionView {
            phase: self.phase,
            channel: board.channel_status(),
            region: self.region,
            tech_filter: self.tech_filter.clone(),
            developers: board.developers(),
        }
    }
}
