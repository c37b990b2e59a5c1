use crate::api::ApiClient;
use crate::browser::{PlayDecision, StationBrowser};
use crate::config::AppConfig;
use crate::models::Station;
use crate::mpv::{MpvCommand, MpvEvent, MpvProcess};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Shown only while a station is active.
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub station: Station,
    /// ICY stream title reported by mpv, when the stream sends one.
    pub media_title: Option<String>,
}

/// Snapshot published to the UI after every state change.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    /// Stations passing the current filters, in load order.
    pub visible: Vec<Station>,
    pub total_count: usize,
    pub countries: Vec<String>,
    pub search_query: String,
    pub selected_country: String,
    /// True while a station-list fetch is outstanding. The country fetch
    /// does not drive this.
    pub loading: bool,
    pub error: Option<String>,
    pub now_playing: Option<NowPlaying>,
}

#[derive(Debug, Clone)]
pub enum UiCommand {
    Reload,
    Search(String),
    CountryFilter(String),
    Play(Station),
    Stop,
    Shutdown,
}

pub struct ControllerHandle {
    pub cmd_tx: mpsc::UnboundedSender<UiCommand>,
    pub state_rx: watch::Receiver<ControllerState>,
    _thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(UiCommand::Shutdown);
        if let Some(t) = self._thread.take() {
            let _ = t.join();
        }
    }
}

pub fn start_controller() -> ControllerHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ControllerState::default());

    let thread = std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        rt.block_on(async move {
            if let Err(e) = controller_main(cmd_rx, state_tx).await {
                warn!(error = ?e, "controller exited with error");
            }
        });
    });

    ControllerHandle {
        cmd_tx,
        state_rx,
        _thread: Some(thread),
    }
}

#[derive(Debug)]
enum InternalMsg {
    StationsDone(Result<crate::api::StationList>),
    CountriesDone(Result<Vec<String>>),
}

async fn controller_main(
    mut cmd_rx: mpsc::UnboundedReceiver<UiCommand>,
    state_tx: watch::Sender<ControllerState>,
) -> Result<()> {
    let config = tokio::task::spawn_blocking(AppConfig::load)
        .await
        .context("Join config load task")?
        .context("Failed to load config")?;
    let api = ApiClient::new(&config.api_base)?;

    let socket_path = mpv_socket_path()?;
    let (mpv, mut mpv_events) = MpvProcess::spawn(socket_path).await?;

    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalMsg>();
    let mut browser = StationBrowser::new();
    let mut state = state_tx.borrow().clone();
    let mut current_url: Option<String> = None;
    let mut media_title: Option<String> = None;

    // Both lists load on startup. Only the station fetch shows a loading
    // indicator.
    state.loading = true;
    publish(&state_tx, &mut state, &browser, &media_title);
    spawn_station_fetch(&api, &internal_tx);
    spawn_country_fetch(&api, &internal_tx);

    loop {
        tokio::select! {
            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    UiCommand::Reload => {
                        state.loading = true;
                        state.error = None;
                        publish(&state_tx, &mut state, &browser, &media_title);
                        spawn_station_fetch(&api, &internal_tx);
                        spawn_country_fetch(&api, &internal_tx);
                    }
                    UiCommand::Search(q) => {
                        browser.set_search_query(&q);
                        publish(&state_tx, &mut state, &browser, &media_title);
                    }
                    UiCommand::CountryFilter(c) => {
                        browser.set_country_filter(&c);
                        publish(&state_tx, &mut state, &browser, &media_title);
                    }
                    UiCommand::Play(station) => {
                        match browser.play(&station) {
                            PlayDecision::Start(url) => {
                                info!(station = %station.name, %url, "starting playback");
                                state.error = None;
                                media_title = None;
                                current_url = Some(url.clone());
                                let _ = mpv.command(MpvCommand::Load { url });
                                publish(&state_tx, &mut state, &browser, &media_title);
                            }
                            PlayDecision::AlreadyPlaying => {}
                        }
                    }
                    UiCommand::Stop => {
                        if browser.stop() {
                            let _ = mpv.command(MpvCommand::Stop);
                            current_url = None;
                            media_title = None;
                            state.error = None;
                            publish(&state_tx, &mut state, &browser, &media_title);
                        }
                    }
                    UiCommand::Shutdown => {
                        let _ = mpv.command(MpvCommand::Shutdown);
                        return Ok(());
                    }
                }
            }
            ev = mpv_events.recv() => {
                let Some(ev) = ev else {
                    state.error = Some("mpv controller stopped".to_string());
                    publish(&state_tx, &mut state, &browser, &media_title);
                    return Ok(());
                };
                match ev {
                    MpvEvent::Ready => {
                        // A respawned mpv starts idle; resume the active stream.
                        if let Some(url) = current_url.clone() {
                            let _ = mpv.command(MpvCommand::Load { url });
                            state.error = None;
                            publish(&state_tx, &mut state, &browser, &media_title);
                        }
                    }
                    MpvEvent::MediaTitle(t) => {
                        media_title = t;
                        publish(&state_tx, &mut state, &browser, &media_title);
                    }
                    MpvEvent::EndFile { reason } => {
                        // The attempted station stays active even when its
                        // stream fails; only the error message surfaces.
                        if reason == "error" && browser.current().is_some() {
                            warn!(%reason, "playback failed");
                            state.error = Some(
                                "Failed to play this station. The stream may be unavailable."
                                    .to_string(),
                            );
                            publish(&state_tx, &mut state, &browser, &media_title);
                        }
                    }
                    MpvEvent::Crashed(e) => {
                        warn!(error = %e, "mpv crashed/restarting");
                        state.error = Some(format!("mpv error: {e}"));
                        publish(&state_tx, &mut state, &browser, &media_title);
                    }
                }
            }
            Some(msg) = internal_rx.recv() => {
                match msg {
                    InternalMsg::StationsDone(res) => {
                        state.loading = false;
                        match res {
                            Ok(list) => {
                                info!(count = list.count, "station list loaded");
                                browser.set_stations(list.stations, list.count);
                                state.error = None;
                            }
                            Err(e) => {
                                // Prior stations stay as they were.
                                warn!(error = ?e, "station list load failed");
                                state.error = Some("Failed to load stations".to_string());
                            }
                        }
                        publish(&state_tx, &mut state, &browser, &media_title);
                    }
                    InternalMsg::CountriesDone(res) => {
                        match res {
                            Ok(countries) => {
                                state.countries = countries;
                                publish(&state_tx, &mut state, &browser, &media_title);
                            }
                            // Non-fatal: the filter dropdown just stays empty.
                            Err(e) => warn!(error = ?e, "country list load failed"),
                        }
                    }
                }
            }
        }
    }
}

fn spawn_station_fetch(api: &ApiClient, tx: &mpsc::UnboundedSender<InternalMsg>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let res = api.stations().await;
        let _ = tx.send(InternalMsg::StationsDone(res));
    });
}

fn spawn_country_fetch(api: &ApiClient, tx: &mpsc::UnboundedSender<InternalMsg>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let res = api.countries().await;
        let _ = tx.send(InternalMsg::CountriesDone(res));
    });
}

/// Re-derive the view fields from the browser and push a snapshot.
fn publish(
    state_tx: &watch::Sender<ControllerState>,
    state: &mut ControllerState,
    browser: &StationBrowser,
    media_title: &Option<String>,
) {
    state.visible = browser.visible_stations().into_iter().cloned().collect();
    state.total_count = browser.total_count();
    state.search_query = browser.search_query().to_string();
    state.selected_country = browser.selected_country().to_string();
    state.now_playing = browser.current().map(|station| NowPlaying {
        station: station.clone(),
        media_title: media_title.clone(),
    });
    let _ = state_tx.send(state.clone());
}

fn mpv_socket_path() -> Result<PathBuf> {
    let runtime = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .context("XDG_RUNTIME_DIR not set")?;

    let dir = runtime.join("radiodial");
    std::fs::create_dir_all(&dir).with_context(|| format!("Create runtime dir: {dir:?}"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("chmod 700 runtime dir: {dir:?}"))?;
    }
    Ok(dir.join("mpv.sock"))
}
